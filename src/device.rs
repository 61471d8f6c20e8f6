//! Device session
//!
//! A [`Device`] owns the open handle to one instrument. Opening resolves the
//! configured selector against the attached devices (or uses an explicit
//! path), dropping the session closes the handle.
//!
//! ```no_run
//! use bendev::{Device, SessionConfig};
//!
//! let mut device = Device::open(SessionConfig::serial("99999/9"))?;
//! println!("{}", device.query("*IDN?")?);
//! # Ok::<(), bendev::DeviceError>(())
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

use bendev_transport::{
    frame_command, BoxedTransport, DeviceDescriptor, DeviceDiscovery, HidDiscovery, OpenTarget,
    ReplyAccumulator,
};
use tracing::{debug, info};

use crate::config::SessionConfig;
use crate::error::DeviceError;
use crate::scpi::{self, ScpiReply};

/// Upper bound on reports dropped by one `discard_input` call
const MAX_DISCARD_REPORTS: usize = 256;

/// An open session with one instrument
pub struct Device {
    config: SessionConfig,
    discovery: Arc<dyn DeviceDiscovery>,
    transport: Option<BoxedTransport>,
    /// Descriptor of the connected device; `None` for hidraw sessions
    descriptor: Option<DeviceDescriptor>,
}

impl Device {
    /// Find and open the device described by `config` using `hidapi`
    pub fn open(config: SessionConfig) -> Result<Self, DeviceError> {
        Self::open_with(Arc::new(HidDiscovery::new()), config)
    }

    /// Find and open a device through a specific discovery backend
    pub fn open_with(
        discovery: Arc<dyn DeviceDiscovery>,
        config: SessionConfig,
    ) -> Result<Self, DeviceError> {
        let mut device = Self {
            config,
            discovery,
            transport: None,
            descriptor: None,
        };
        device.connect(None)?;
        Ok(device)
    }

    /// Resolve the target and open it
    ///
    /// `pinned_serial` narrows selection to the device a previous
    /// connection was bound to.
    fn connect(&mut self, pinned_serial: Option<String>) -> Result<(), DeviceError> {
        let target = match self.config.explicit_target() {
            Some(target) => target,
            None => {
                let mut selector = self.config.device.clone();
                if pinned_serial.is_some() {
                    selector.serial_number = pinned_serial;
                }
                let devices = self
                    .discovery
                    .list_devices()
                    .map_err(DeviceError::Connection)?;
                OpenTarget::Descriptor(selector.resolve(&devices)?.clone())
            }
        };

        info!("Connecting to {}", target);
        let transport = self
            .discovery
            .open(&target)
            .map_err(DeviceError::Connection)?;

        self.descriptor = match target {
            OpenTarget::Hidraw(_) => None,
            _ => Some(transport.device_info().clone()),
        };
        self.transport = Some(transport);
        Ok(())
    }

    /// Session configuration
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// USB information of the connected device (`None` for hidraw sessions)
    pub fn descriptor(&self) -> Option<&DeviceDescriptor> {
        self.descriptor.as_ref()
    }

    /// Whether the handle is currently open
    pub fn is_open(&self) -> bool {
        self.transport.is_some()
    }

    /// Send a command, terminator appended
    pub fn write(&mut self, command: &str) -> Result<(), DeviceError> {
        if self.transport.is_none() {
            return Err(DeviceError::Closed);
        }
        let bytes = self.config.encoding.encode(command)?;
        debug!(">>> {}", command);

        let terminator = self.config.terminator.as_bytes();
        let transport = self.transport.as_mut().ok_or(DeviceError::Closed)?;
        for report in frame_command(&bytes, terminator, transport.report_size()) {
            transport.write_report(&report).map_err(DeviceError::Io)?;
        }
        Ok(())
    }

    /// Read one reply, waiting up to the configured timeout
    pub fn read(&mut self) -> Result<String, DeviceError> {
        let timeout = self.config.timeout();
        self.read_with_timeout(timeout)
    }

    /// Read one reply, waiting up to `timeout` (`None` waits forever)
    ///
    /// Reports are collected until the terminator (or a padded short
    /// report) arrives. A full report with neither, followed by one empty
    /// read slice, also ends the reply. At least one read is attempted even
    /// with a zero timeout. On timeout nothing of the partial reply is
    /// returned.
    pub fn read_with_timeout(&mut self, timeout: Option<Duration>) -> Result<String, DeviceError> {
        let interval = self.config.read_interval();
        let mut reply = ReplyAccumulator::new(self.config.terminator.as_bytes());
        let transport = self.transport.as_mut().ok_or(DeviceError::Closed)?;
        let mut buf = vec![0u8; transport.report_size()];
        let start = Instant::now();
        let mut last_full = false;

        loop {
            let slice = match timeout {
                Some(limit) => limit.saturating_sub(start.elapsed()).min(interval),
                None => interval,
            };
            let slice_ms = if slice.is_zero() {
                0
            } else {
                slice.as_millis().clamp(1, i32::MAX as u128) as i32
            };

            let n = transport
                .read_report(&mut buf, slice_ms)
                .map_err(DeviceError::Io)?;
            if n > 0 {
                last_full = n == buf.len();
                if reply.push(&buf[..n]) {
                    break;
                }
            } else if last_full {
                debug!("Unterminated full report followed by silence, ending reply");
                break;
            }

            if let Some(limit) = timeout {
                if start.elapsed() >= limit {
                    debug!(
                        "Timed out after {} reports, {} bytes pending",
                        reply.reports(),
                        reply.pending().len()
                    );
                    return Err(DeviceError::Timeout(limit));
                }
            }
        }

        let text = self.config.encoding.decode(reply.into_bytes())?;
        debug!("<<< {}", text);
        Ok(text)
    }

    /// Drop input reports already waiting, such as a reply that arrived
    /// after its read timed out. Returns the number of reports discarded.
    pub fn discard_input(&mut self) -> Result<usize, DeviceError> {
        let transport = self.transport.as_mut().ok_or(DeviceError::Closed)?;
        let mut buf = vec![0u8; transport.report_size()];
        let mut discarded = 0;
        while discarded < MAX_DISCARD_REPORTS {
            let n = transport.read_report(&mut buf, 0).map_err(DeviceError::Io)?;
            if n == 0 {
                break;
            }
            discarded += 1;
        }
        if discarded > 0 {
            debug!("Discarded {} stale input reports", discarded);
        }
        Ok(discarded)
    }

    /// Send a command and read its reply
    pub fn query(&mut self, command: &str) -> Result<String, DeviceError> {
        let timeout = self.config.timeout();
        self.query_with_timeout(command, timeout)
    }

    /// Send a command and read its reply, waiting up to `timeout`
    ///
    /// Stale input is discarded first so the reply read belongs to `command`.
    pub fn query_with_timeout(
        &mut self,
        command: &str,
        timeout: Option<Duration>,
    ) -> Result<String, DeviceError> {
        self.discard_input()?;
        self.write(command)?;
        self.read_with_timeout(timeout)
    }

    /// Check the instrument's SCPI error queue
    ///
    /// Fails with [`DeviceError::Scpi`] carrying the oldest entry when the
    /// queue is not empty.
    pub fn check_scpi_error(&mut self) -> Result<(), DeviceError> {
        let count = self.query(scpi::ERROR_COUNT_QUERY)?;
        if count.trim() == "0" {
            return Ok(());
        }
        let entry = self.query(scpi::ERROR_QUERY)?;
        let (code, message) = scpi::parse_error_entry(&entry)?;
        Err(DeviceError::Scpi { code, message })
    }

    /// Send a (non-query) command and check the error queue
    pub fn cmd(&mut self, command: &str) -> Result<(), DeviceError> {
        self.write(command)?;
        self.check_scpi_error()
    }

    /// Send a query, check the error queue and convert the reply fields
    pub fn cmd_query(&mut self, command: &str) -> Result<ScpiReply, DeviceError> {
        let reply = self.query(command)?;
        self.check_scpi_error()?;
        Ok(scpi::parse_reply(&reply))
    }

    /// Close and reopen the connection
    ///
    /// Selection is rerun (the OS path may change across a USB reconnect)
    /// but pinned to the serial number of the device previously connected.
    pub fn reconnect(&mut self) -> Result<(), DeviceError> {
        info!("Reconnecting to device");
        self.close();
        let pinned = self
            .descriptor
            .as_ref()
            .map(|d| d.serial_number.clone())
            .filter(|s| !s.is_empty());
        self.connect(pinned)
    }

    /// Close communication with the device; calling it again is a no-op
    pub fn close(&mut self) {
        if let Some(transport) = self.transport.take() {
            info!("Closing {}", transport.device_info().path);
        }
    }
}

impl Drop for Device {
    fn drop(&mut self) {
        self.close();
    }
}
