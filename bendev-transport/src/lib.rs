//! Transport layer for Bentham Instruments SCPI devices
//!
//! This crate provides the HID-facing half of `bendev`:
//!
//! - Enumeration of attached HID devices ([`HidDiscovery`])
//! - Report-level I/O through `hidapi` ([`HidTransport`])
//! - A raw hidraw bypass for platforms where `hidapi` misreads device
//!   strings (unix only)
//! - Framing of SCPI text over fixed-size reports ([`protocol`])
//! - A traffic monitor and an in-memory mock for tests

pub mod device_registry;
pub mod error;
pub mod mock;
pub mod monitor;
pub mod protocol;
pub mod types;

mod discovery;
mod hid_device;
#[cfg(unix)]
mod hidraw;

pub use device_registry::{is_bentham_vid, MANUFACTURER, VENDOR_ID};
pub use discovery::{DeviceDiscovery, DeviceFilter, HidDiscovery};
pub use error::TransportError;
pub use hid_device::HidTransport;
#[cfg(unix)]
pub use hidraw::HidrawTransport;
pub use monitor::{MonitorConfig, MonitorTransport};
pub use protocol::{frame_command, ReplyAccumulator, DEFAULT_TERMINATOR, REPORT_SIZE};
pub use types::{DeviceDescriptor, OpenTarget};

/// The core transport trait - every backend moves whole HID reports
///
/// Transports are owned by exactly one session and used from one thread at
/// a time, so all I/O takes `&mut self`. Dropping a transport releases the
/// OS handle.
pub trait Transport: Send {
    /// Send one output report
    ///
    /// # Arguments
    /// * `payload` - Report payload without the report ID; the transport
    ///   prepends [`protocol::REPORT_ID`]
    fn write_report(&mut self, payload: &[u8]) -> Result<(), TransportError>;

    /// Read one input report into `buf`
    ///
    /// # Arguments
    /// * `buf` - Destination, at least [`Transport::report_size`] bytes
    /// * `timeout_ms` - Milliseconds to wait; negative blocks indefinitely
    ///
    /// # Returns
    /// Number of bytes read, `0` if nothing arrived before the timeout
    fn read_report(&mut self, buf: &mut [u8], timeout_ms: i32) -> Result<usize, TransportError>;

    /// Descriptor of the device behind this transport
    fn device_info(&self) -> &DeviceDescriptor;

    /// Payload size of one report
    fn report_size(&self) -> usize {
        REPORT_SIZE
    }
}

/// Type alias for a boxed transport
pub type BoxedTransport = Box<dyn Transport>;
