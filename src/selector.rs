//! Device selection
//!
//! A [`DeviceSelector`] narrows the enumerated device list down to exactly
//! one descriptor. Every criterion that is set must hold (logical AND):
//!
//! - `serial_number`: exact match
//! - `product_string`: case-sensitive substring of the product string
//! - `manufacturer_string`: case-sensitive substring of the manufacturer
//! - `vendor_id` / `product_id`: exact match
//!
//! Zero matches is [`DeviceError::NotFound`]. More than one match is
//! [`DeviceError::Ambiguous`], except when a serial number was given: the
//! serial alone identifies the device, so the first match in path order wins.

use std::fmt;

use bendev_transport::{DeviceDescriptor, MANUFACTURER, VENDOR_ID};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::DeviceError;

/// Criteria for picking one device out of the enumerated set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceSelector {
    pub serial_number: Option<String>,
    pub product_string: Option<String>,
    pub manufacturer_string: Option<String>,
    pub vendor_id: Option<u16>,
    pub product_id: Option<u16>,
}

impl Default for DeviceSelector {
    /// Any Bentham device: manufacturer `"Bentham"`, vendor ID 1240
    fn default() -> Self {
        Self {
            serial_number: None,
            product_string: None,
            manufacturer_string: Some(MANUFACTURER.to_string()),
            vendor_id: Some(VENDOR_ID),
            product_id: None,
        }
    }
}

impl DeviceSelector {
    /// Select by exact serial number (other defaults kept)
    pub fn serial(serial: impl Into<String>) -> Self {
        Self {
            serial_number: Some(serial.into()),
            ..Self::default()
        }
    }

    /// Select by product string substring (other defaults kept)
    pub fn product(product: impl Into<String>) -> Self {
        Self {
            product_string: Some(product.into()),
            ..Self::default()
        }
    }

    /// Check whether a descriptor satisfies every criterion
    pub fn matches(&self, device: &DeviceDescriptor) -> bool {
        if let Some(ref serial) = self.serial_number {
            if device.serial_number != *serial {
                return false;
            }
        }
        if let Some(ref product) = self.product_string {
            if !device.product_string.contains(product.as_str()) {
                return false;
            }
        }
        if let Some(ref manufacturer) = self.manufacturer_string {
            if !device.manufacturer_string.contains(manufacturer.as_str()) {
                return false;
            }
        }
        if let Some(vid) = self.vendor_id {
            if device.vendor_id != vid {
                return false;
            }
        }
        if let Some(pid) = self.product_id {
            if device.product_id != pid {
                return false;
            }
        }
        true
    }

    /// Pick the single descriptor this selector identifies
    ///
    /// `devices` is expected in path order, as discovery returns it.
    pub fn resolve<'a>(
        &self,
        devices: &'a [DeviceDescriptor],
    ) -> Result<&'a DeviceDescriptor, DeviceError> {
        let matched: Vec<&DeviceDescriptor> = devices.iter().filter(|d| self.matches(d)).collect();
        debug!(
            "Selector [{}] matched {} of {} devices",
            self,
            matched.len(),
            devices.len()
        );

        match matched.as_slice() {
            [] => Err(DeviceError::NotFound(self.to_string())),
            [only] => Ok(*only),
            [first, ..] if self.serial_number.is_some() => {
                warn!(
                    "{} devices share serial number {:?}, using {}",
                    matched.len(),
                    first.serial_number,
                    first.path
                );
                Ok(*first)
            }
            _ => Err(DeviceError::Ambiguous {
                count: matched.len(),
                criteria: self.to_string(),
            }),
        }
    }
}

impl fmt::Display for DeviceSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if let Some(ref s) = self.serial_number {
            parts.push(format!("serial_number={s:?}"));
        }
        if let Some(ref s) = self.product_string {
            parts.push(format!("product_string={s:?}"));
        }
        if let Some(ref s) = self.manufacturer_string {
            parts.push(format!("manufacturer_string={s:?}"));
        }
        if let Some(v) = self.vendor_id {
            parts.push(format!("vendor_id={v}"));
        }
        if let Some(p) = self.product_id {
            parts.push(format!("product_id={p}"));
        }
        if parts.is_empty() {
            write!(f, "any device")
        } else {
            write!(f, "{}", parts.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dev(serial: &str, product: &str, manufacturer: &str, path: &str) -> DeviceDescriptor {
        DeviceDescriptor {
            vendor_id: VENDOR_ID,
            product_id: 0xEC2B,
            serial_number: serial.into(),
            product_string: product.into(),
            manufacturer_string: manufacturer.into(),
            path: path.into(),
        }
    }

    fn bench() -> Vec<DeviceDescriptor> {
        vec![
            dev("99999/9", "MSH150_RD_Direct", "Bentham Instruments Ltd.", "/dev/hidraw1"),
            dev("12345/1", "TLS120Xe", "Bentham Instruments Ltd.", "/dev/hidraw2"),
            dev("55555/5", "PMC", "Bentham Instruments Ltd.", "/dev/hidraw3"),
        ]
    }

    #[test]
    fn test_serial_resolves_exact_device() {
        let devices = bench();
        let found = DeviceSelector::serial("99999/9").resolve(&devices).unwrap();
        assert_eq!(found.product_string, "MSH150_RD_Direct");
    }

    #[test]
    fn test_serial_must_match_exactly() {
        let devices = bench();
        let err = DeviceSelector::serial("99999").resolve(&devices).unwrap_err();
        assert!(matches!(err, DeviceError::NotFound(_)));
    }

    #[test]
    fn test_unknown_serial_not_found() {
        let devices = bench();
        let err = DeviceSelector::serial("00000/0").resolve(&devices).unwrap_err();
        assert!(matches!(err, DeviceError::NotFound(_)));
        assert!(err.to_string().contains("00000/0"));
    }

    #[test]
    fn test_product_substring() {
        let devices = bench();
        let found = DeviceSelector::product("TLS").resolve(&devices).unwrap();
        assert_eq!(found.serial_number, "12345/1");
    }

    #[test]
    fn test_manufacturer_is_case_sensitive() {
        let d = dev("1", "X", "Bentham Instruments Ltd.", "p");
        let mut selector = DeviceSelector::default();
        assert!(selector.matches(&d));

        selector.manufacturer_string = Some("bentham".into());
        assert!(!selector.matches(&d));
    }

    #[test]
    fn test_product_is_case_sensitive() {
        let d = dev("1", "TLS120Xe", "Bentham", "p");
        assert!(DeviceSelector::product("TLS120Xe").matches(&d));
        assert!(!DeviceSelector::product("tls120xe").matches(&d));
    }

    #[test]
    fn test_default_with_several_bentham_devices_is_ambiguous() {
        let devices = bench();
        let err = DeviceSelector::default().resolve(&devices).unwrap_err();
        assert!(matches!(err, DeviceError::Ambiguous { count: 3, .. }));
    }

    #[test]
    fn test_two_matching_products_ambiguous() {
        let devices = vec![
            dev("1", "TLS120Xe", "Bentham Instruments Ltd.", "/dev/hidraw1"),
            dev("2", "TLS120Xe", "Bentham Instruments Ltd.", "/dev/hidraw2"),
        ];
        let err = DeviceSelector::product("TLS120Xe").resolve(&devices).unwrap_err();
        assert!(matches!(err, DeviceError::Ambiguous { count: 2, .. }));
    }

    #[test]
    fn test_duplicate_serial_picks_first_path() {
        let devices = vec![
            dev("7", "A", "Bentham", "/dev/hidraw1"),
            dev("7", "B", "Bentham", "/dev/hidraw2"),
        ];
        let found = DeviceSelector::serial("7").resolve(&devices).unwrap();
        assert_eq!(found.path, "/dev/hidraw1");
    }

    #[test]
    fn test_criteria_combine_with_and() {
        let devices = bench();
        let selector = DeviceSelector {
            serial_number: Some("12345/1".into()),
            product_string: Some("MSH".into()),
            ..DeviceSelector::default()
        };
        assert!(matches!(
            selector.resolve(&devices),
            Err(DeviceError::NotFound(_))
        ));
    }

    #[test]
    fn test_vendor_and_product_ids() {
        let mut other = dev("1", "Gadget", "Bentham", "/dev/hidraw9");
        other.vendor_id = 0x1234;
        let devices = vec![other];

        assert!(DeviceSelector::default().resolve(&devices).is_err());

        let selector = DeviceSelector {
            vendor_id: Some(0x1234),
            product_id: Some(0xEC2B),
            ..DeviceSelector::default()
        };
        assert!(selector.resolve(&devices).is_ok());
    }

    #[test]
    fn test_empty_device_list() {
        let err = DeviceSelector::default().resolve(&[]).unwrap_err();
        assert!(matches!(err, DeviceError::NotFound(_)));
    }

    #[test]
    fn test_display() {
        let s = DeviceSelector::serial("99999/9").to_string();
        assert!(s.starts_with("serial_number=\"99999/9\""));
        assert!(s.contains("vendor_id=1240"));
    }
}
