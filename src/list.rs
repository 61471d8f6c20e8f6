//! Connected device listing

use bendev_transport::{DeviceDescriptor, DeviceDiscovery, DeviceFilter, HidDiscovery};
use tracing::debug;

use crate::error::DeviceError;

/// List attached devices passing `filter`, in path order
///
/// With `verbose` the summary from [`render_summary`] is printed to stdout.
/// No matching device is an empty list, not an error.
pub fn list_connected_devices(
    filter: &DeviceFilter,
    verbose: bool,
) -> Result<Vec<DeviceDescriptor>, DeviceError> {
    list_connected_devices_with(&HidDiscovery::new(), filter, verbose)
}

/// [`list_connected_devices`] through a specific discovery backend
pub fn list_connected_devices_with(
    discovery: &dyn DeviceDiscovery,
    filter: &DeviceFilter,
    verbose: bool,
) -> Result<Vec<DeviceDescriptor>, DeviceError> {
    let devices: Vec<DeviceDescriptor> = discovery
        .list_devices()
        .map_err(DeviceError::Connection)?
        .into_iter()
        .filter(|d| filter.matches(d))
        .collect();
    debug!("{} devices pass the listing filter", devices.len());

    if verbose {
        print!("{}", render_summary(&devices));
    }
    Ok(devices)
}

/// Human readable summary, one numbered line per device
pub fn render_summary(devices: &[DeviceDescriptor]) -> String {
    let mut out = String::from("Connected Devices:\n");
    for (i, device) in devices.iter().enumerate() {
        out.push_str(&format!("Device {}: {device}\n", i + 1));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use bendev_transport::mock::MockDiscovery;

    fn dev(manufacturer: &str, product: &str, vid: u16, path: &str) -> DeviceDescriptor {
        DeviceDescriptor {
            vendor_id: vid,
            product_id: 0xEC2B,
            serial_number: "99999/9".into(),
            product_string: product.into(),
            manufacturer_string: manufacturer.into(),
            path: path.into(),
        }
    }

    #[test]
    fn test_default_filter_keeps_bentham_vid() {
        let discovery = MockDiscovery::new(vec![
            dev("Bentham Instruments Ltd.", "TLS120Xe", 1240, "/dev/hidraw2"),
            dev("Logitech", "Mouse", 0x046D, "/dev/hidraw0"),
        ]);
        let devices =
            list_connected_devices_with(&discovery, &DeviceFilter::default(), false).unwrap();
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].product_string, "TLS120Xe");
    }

    #[test]
    fn test_manufacturer_filter_ignores_case() {
        let discovery = MockDiscovery::new(vec![dev(
            "Bentham Instruments Ltd.",
            "PMC",
            1240,
            "/dev/hidraw1",
        )]);
        let filter = DeviceFilter {
            manufacturer: Some("BENTHAM".into()),
            ..DeviceFilter::default()
        };
        assert_eq!(
            list_connected_devices_with(&discovery, &filter, false)
                .unwrap()
                .len(),
            1
        );
    }

    #[test]
    fn test_no_devices_is_empty_list() {
        let discovery = MockDiscovery::new(Vec::new());
        let devices = list_connected_devices_with(&discovery, &DeviceFilter::any(), true).unwrap();
        assert!(devices.is_empty());
    }

    #[test]
    fn test_results_in_path_order() {
        let discovery = MockDiscovery::new(vec![
            dev("Bentham", "B", 1240, "/dev/hidraw5"),
            dev("Bentham", "A", 1240, "/dev/hidraw1"),
        ]);
        let devices = list_connected_devices_with(&discovery, &DeviceFilter::any(), false).unwrap();
        assert_eq!(devices[0].path, "/dev/hidraw1");
        assert_eq!(devices[1].path, "/dev/hidraw5");
    }

    #[test]
    fn test_summary_lines() {
        let devices = vec![dev(
            "Bentham Instruments Ltd.",
            "MSH150_RD_Direct",
            1240,
            "/dev/hidraw1",
        )];
        let summary = render_summary(&devices);
        let mut lines = summary.lines();
        assert_eq!(lines.next(), Some("Connected Devices:"));
        let line = lines.next().unwrap();
        assert!(line.starts_with("Device 1: Bentham Instruments Ltd., MSH150_RD_Direct, sn=99999/9"));
        assert!(line.ends_with("v=1240, p=60459"));
    }
}
