//! Common types for transport layer

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifying metadata for one attached HID device
///
/// Supplied by the HID layer at enumeration time. Strings the platform
/// could not read are left empty rather than `None`, so substring
/// selection treats them as non-matching.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    /// USB Vendor ID
    pub vendor_id: u16,
    /// USB Product ID
    pub product_id: u16,
    /// Serial number (exact-match key)
    pub serial_number: String,
    /// Product string, e.g. `"MSH150_RD_Direct"`
    pub product_string: String,
    /// Manufacturer string, e.g. `"Bentham Instruments Ltd."`
    pub manufacturer_string: String,
    /// OS device path (opaque, platform-specific)
    pub path: String,
}

impl DeviceDescriptor {
    /// Descriptor for a device opened by path only, with no enumeration data
    pub fn from_path(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Build a descriptor from a hidapi enumeration entry
    pub fn from_hidapi(info: &hidapi::DeviceInfo) -> Self {
        Self {
            vendor_id: info.vendor_id(),
            product_id: info.product_id(),
            serial_number: info.serial_number().unwrap_or_default().to_string(),
            product_string: info.product_string().unwrap_or_default().to_string(),
            manufacturer_string: info.manufacturer_string().unwrap_or_default().to_string(),
            path: info.path().to_string_lossy().to_string(),
        }
    }
}

impl fmt::Display for DeviceDescriptor {
    /// One-line summary: `manufacturer, product, sn=..., v=..., p=...`
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, {}, sn={}, v={}, p={}",
            self.manufacturer_string,
            self.product_string,
            self.serial_number,
            self.vendor_id,
            self.product_id
        )
    }
}

/// What a discovery backend should open
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpenTarget {
    /// An enumerated device, opened through the HID library by its path
    Descriptor(DeviceDescriptor),
    /// An explicit OS path handed to the HID library, bypassing selection
    Path(String),
    /// A raw hidraw node read and written directly, bypassing the HID library
    Hidraw(String),
}

impl fmt::Display for OpenTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpenTarget::Descriptor(d) => write!(
                f,
                "VID={:04X} PID={:04X} SN={} ({})",
                d.vendor_id, d.product_id, d.serial_number, d.path
            ),
            OpenTarget::Path(p) => write!(f, "path {p}"),
            OpenTarget::Hidraw(p) => write!(f, "hidraw {p}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_line() {
        let d = DeviceDescriptor {
            vendor_id: 1240,
            product_id: 60459,
            serial_number: "99999/9".into(),
            product_string: "MSH150_RD_Direct".into(),
            manufacturer_string: "Bentham Instruments Ltd.".into(),
            path: "/dev/hidraw2".into(),
        };
        assert_eq!(
            d.to_string(),
            "Bentham Instruments Ltd., MSH150_RD_Direct, sn=99999/9, v=1240, p=60459"
        );
    }

    #[test]
    fn test_json_field_names() {
        let d = DeviceDescriptor {
            vendor_id: 1240,
            serial_number: "42".into(),
            ..DeviceDescriptor::default()
        };
        let json = serde_json::to_value(&d).unwrap();
        assert_eq!(json["vendor_id"], 1240);
        assert_eq!(json["serial_number"], "42");
        assert_eq!(json["manufacturer_string"], "");
    }

    #[test]
    fn test_from_path_leaves_strings_empty() {
        let d = DeviceDescriptor::from_path("/dev/hidraw0");
        assert_eq!(d.path, "/dev/hidraw0");
        assert!(d.serial_number.is_empty());
        assert_eq!(d.vendor_id, 0);
    }
}
