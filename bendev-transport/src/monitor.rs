//! MonitorTransport middleware for watching report traffic
//!
//! Wraps any [`Transport`] and prints every report passing through it,
//! decoded as text with the padding trimmed.
//!
//! # Example
//!
//! ```ignore
//! use bendev_transport::{DeviceDiscovery, HidDiscovery, MonitorConfig};
//!
//! let discovery = HidDiscovery::with_monitor(MonitorConfig::default());
//! // every transport opened through `discovery` now prints its traffic
//! ```

use crate::protocol::PAD;
use crate::{BoxedTransport, DeviceDescriptor, Transport, TransportError};

/// Configuration for the MonitorTransport
#[derive(Debug, Clone, Default)]
pub struct MonitorConfig {
    /// Show raw hex dump alongside decoded output
    pub show_hex: bool,
}

/// Transport wrapper printing all traffic to stdout
pub struct MonitorTransport {
    inner: BoxedTransport,
    config: MonitorConfig,
}

impl MonitorTransport {
    /// Wrap a transport with monitoring
    pub fn wrap(inner: BoxedTransport, config: MonitorConfig) -> BoxedTransport {
        Box::new(Self { inner, config })
    }

    fn print(&self, direction: &str, data: &[u8]) {
        println!("{}", format_report(direction, data, self.config.show_hex));
    }
}

/// Render one report as `>>> "text"` with an optional hex dump
pub fn format_report(direction: &str, data: &[u8], show_hex: bool) -> String {
    let end = data.iter().position(|&b| b == PAD).unwrap_or(data.len());
    let text = String::from_utf8_lossy(&data[..end]);
    let mut line = format!("{direction} {text:?}");
    if show_hex {
        let hex: Vec<String> = data[..end].iter().map(|b| format!("{b:02X}")).collect();
        line.push_str(&format!(" [{}]", hex.join(" ")));
    }
    line
}

impl Transport for MonitorTransport {
    fn write_report(&mut self, payload: &[u8]) -> Result<(), TransportError> {
        self.print(">>>", payload);
        self.inner.write_report(payload)
    }

    fn read_report(&mut self, buf: &mut [u8], timeout_ms: i32) -> Result<usize, TransportError> {
        let n = self.inner.read_report(buf, timeout_ms)?;
        if n > 0 {
            self.print("<<<", &buf[..n]);
        }
        Ok(n)
    }

    fn device_info(&self) -> &DeviceDescriptor {
        self.inner.device_info()
    }

    fn report_size(&self) -> usize {
        self.inner.report_size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_trims_padding() {
        let mut report = b"*IDN?\n".to_vec();
        report.resize(64, PAD);
        assert_eq!(format_report(">>>", &report, false), ">>> \"*IDN?\\n\"");
    }

    #[test]
    fn test_format_with_hex() {
        assert_eq!(format_report("<<<", b"OK", true), "<<< \"OK\" [4F 4B]");
    }
}
