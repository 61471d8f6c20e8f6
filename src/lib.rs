//! Client library for Bentham Instruments SCPI-over-USB-HID devices
//!
//! Instruments enumerate as USB HID devices and exchange SCPI text in
//! 64-byte reports. This crate finds them ([`list_connected_devices`]),
//! opens one by serial number, product string or path ([`Device::open`]),
//! and provides text-level `write`/`read`/`query` plus the SCPI helpers
//! `cmd`/`cmd_query`. The HID plumbing lives in `bendev-transport`.

pub mod config;
pub mod device;
pub mod error;
pub mod list;
pub mod scpi;
pub mod selector;

pub use config::{Encoding, SessionConfig};
pub use device::Device;
pub use error::DeviceError;
pub use list::{list_connected_devices, list_connected_devices_with, render_summary};
pub use scpi::{scpi_convert, ScpiReply, ScpiValue};
pub use selector::DeviceSelector;

pub use bendev_transport::{DeviceDescriptor, DeviceDiscovery, DeviceFilter, HidDiscovery};
