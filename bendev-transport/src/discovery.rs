//! Device discovery for Bentham instruments

use std::ffi::CString;

use hidapi::HidApi;
use tracing::{debug, info};

use crate::device_registry;
use crate::error::TransportError;
use crate::hid_device::HidTransport;
use crate::monitor::{MonitorConfig, MonitorTransport};
use crate::types::{DeviceDescriptor, OpenTarget};
use crate::BoxedTransport;

/// Device discovery abstraction
///
/// Sessions resolve and (re)open their device through this trait, which
/// lets tests substitute [`crate::mock::MockDiscovery`] for real hardware.
pub trait DeviceDiscovery: Send + Sync {
    /// List currently attached devices, sorted by path
    fn list_devices(&self) -> Result<Vec<DeviceDescriptor>, TransportError>;

    /// Open a transport for `target`
    fn open(&self, target: &OpenTarget) -> Result<BoxedTransport, TransportError>;
}

/// Filter applied when listing devices
///
/// String filters match as case-insensitive substrings; unset fields match
/// everything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceFilter {
    pub vendor_id: Option<u16>,
    pub manufacturer: Option<String>,
    pub product: Option<String>,
}

impl Default for DeviceFilter {
    /// Bentham's vendor ID, no string filters
    fn default() -> Self {
        Self {
            vendor_id: Some(device_registry::VENDOR_ID),
            manufacturer: None,
            product: None,
        }
    }
}

impl DeviceFilter {
    /// A filter matching every device
    pub fn any() -> Self {
        Self {
            vendor_id: None,
            manufacturer: None,
            product: None,
        }
    }

    /// Check whether a descriptor passes this filter
    pub fn matches(&self, device: &DeviceDescriptor) -> bool {
        if let Some(vid) = self.vendor_id {
            if device.vendor_id != vid {
                return false;
            }
        }
        if let Some(ref m) = self.manufacturer {
            if !contains_ignore_case(&device.manufacturer_string, m) {
                return false;
            }
        }
        if let Some(ref p) = self.product {
            if !contains_ignore_case(&device.product_string, p) {
                return false;
            }
        }
        true
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_uppercase().contains(&needle.to_uppercase())
}

/// HID device discovery through `hidapi`
#[derive(Debug, Clone, Default)]
pub struct HidDiscovery {
    /// Optional monitor config - wraps opened transports automatically
    monitor: Option<MonitorConfig>,
}

impl HidDiscovery {
    /// Create a new HID discovery instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with monitor config; every transport opened is wrapped
    pub fn with_monitor(config: MonitorConfig) -> Self {
        Self {
            monitor: Some(config),
        }
    }

    fn api() -> Result<HidApi, TransportError> {
        HidApi::new().map_err(|e| TransportError::HidError(e.to_string()))
    }

    fn open_hid_path(
        api: &HidApi,
        path: &str,
        info: DeviceDescriptor,
    ) -> Result<BoxedTransport, TransportError> {
        let c_path = CString::new(path)
            .map_err(|_| TransportError::DeviceNotFound(format!("invalid device path {path:?}")))?;
        let device = api.open_path(&c_path).map_err(TransportError::from)?;
        Ok(Box::new(HidTransport::new(device, info)))
    }

    #[cfg(unix)]
    fn open_hidraw(path: &str) -> Result<BoxedTransport, TransportError> {
        Ok(Box::new(crate::hidraw::HidrawTransport::open(path)?))
    }

    #[cfg(not(unix))]
    fn open_hidraw(path: &str) -> Result<BoxedTransport, TransportError> {
        Err(TransportError::Unsupported(format!(
            "hidraw access ({path}) is only available on unix"
        )))
    }
}

impl DeviceDiscovery for HidDiscovery {
    fn list_devices(&self) -> Result<Vec<DeviceDescriptor>, TransportError> {
        let api = Self::api()?;
        let mut devices: Vec<DeviceDescriptor> = api
            .device_list()
            .map(DeviceDescriptor::from_hidapi)
            .collect();
        devices.sort_by(|a, b| a.path.cmp(&b.path));

        for d in &devices {
            debug!(
                "Found device: VID={:04X} PID={:04X} manufacturer={:?} product={:?} sn={:?} path={}",
                d.vendor_id,
                d.product_id,
                d.manufacturer_string,
                d.product_string,
                d.serial_number,
                d.path
            );
        }
        info!(
            "Found {} HID devices ({} Bentham)",
            devices.len(),
            devices
                .iter()
                .filter(|d| device_registry::is_bentham_vid(d.vendor_id))
                .count()
        );
        Ok(devices)
    }

    fn open(&self, target: &OpenTarget) -> Result<BoxedTransport, TransportError> {
        let transport = match target {
            OpenTarget::Descriptor(d) => {
                let api = Self::api()?;
                Self::open_hid_path(&api, &d.path, d.clone())?
            }
            OpenTarget::Path(path) => {
                let api = Self::api()?;
                let info = api
                    .device_list()
                    .find(|d| d.path().to_string_lossy() == path.as_str())
                    .map(DeviceDescriptor::from_hidapi)
                    .unwrap_or_else(|| DeviceDescriptor::from_path(path.as_str()));
                Self::open_hid_path(&api, path, info)?
            }
            OpenTarget::Hidraw(path) => Self::open_hidraw(path)?,
        };

        info!("Opened {}", target);

        let transport = match &self.monitor {
            Some(config) => MonitorTransport::wrap(transport, config.clone()),
            None => transport,
        };
        Ok(transport)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(vid: u16, manufacturer: &str, product: &str) -> DeviceDescriptor {
        DeviceDescriptor {
            vendor_id: vid,
            product_id: 1,
            serial_number: "1".into(),
            product_string: product.into(),
            manufacturer_string: manufacturer.into(),
            path: "p".into(),
        }
    }

    #[test]
    fn test_default_filter_is_vendor_only() {
        let filter = DeviceFilter::default();
        assert!(filter.matches(&descriptor(1240, "Anyone", "Thing")));
        assert!(!filter.matches(&descriptor(0x3151, "Bentham Instruments Ltd.", "TLS120Xe")));
    }

    #[test]
    fn test_listing_filter_ignores_case() {
        let filter = DeviceFilter {
            vendor_id: None,
            manufacturer: Some("bentham".into()),
            product: Some("tls".into()),
        };
        assert!(filter.matches(&descriptor(1240, "Bentham Instruments Ltd.", "TLS120Xe")));
        assert!(!filter.matches(&descriptor(1240, "Bentham Instruments Ltd.", "MSH150")));
    }

    #[test]
    fn test_any_filter() {
        assert!(DeviceFilter::any().matches(&DeviceDescriptor::default()));
    }

    #[test]
    fn test_list_devices() {
        // Passes without devices connected; fails only if hidapi can't initialise
        let result = HidDiscovery::new().list_devices();
        if let Ok(devices) = result {
            assert!(devices.windows(2).all(|w| w[0].path <= w[1].path));
        }
    }
}
