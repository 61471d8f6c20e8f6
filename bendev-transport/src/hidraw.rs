//! Raw hidraw transport (unix only)
//!
//! Reads and writes the kernel's hidraw node directly, bypassing `hidapi`.
//! Used on systems where `hidapi` fails to read the device's strings and
//! therefore can't select it. Readiness is waited for with `poll(2)` so
//! both directions honour a timeout.

use std::fs::{File, OpenOptions};
use std::io::{Read, Write};
use std::os::fd::AsRawFd;
use std::time::{Duration, Instant};

use tracing::{debug, trace};

use crate::error::TransportError;
use crate::protocol::REPORT_ID;
use crate::types::DeviceDescriptor;
use crate::Transport;

/// How long a write waits for the node to become writable
const WRITE_TIMEOUT_MS: i32 = 500;

/// Transport over an open `/dev/hidrawN` node
pub struct HidrawTransport {
    file: File,
    info: DeviceDescriptor,
    out: Vec<u8>,
}

impl HidrawTransport {
    /// Open the hidraw node at `path` for reading and writing
    pub fn open(path: &str) -> Result<Self, TransportError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|e| TransportError::io(path, e))?;
        debug!("Opened hidraw node {}", path);
        Ok(Self {
            file,
            info: DeviceDescriptor::from_path(path),
            out: Vec::new(),
        })
    }

    /// Wait until the node is ready for `events`; `false` on timeout
    ///
    /// A `poll` interrupted by a signal is retried with the time remaining.
    fn wait(&self, events: libc::c_short, timeout_ms: i32) -> Result<bool, TransportError> {
        let deadline = (timeout_ms >= 0)
            .then(|| Instant::now() + Duration::from_millis(timeout_ms as u64));
        let mut fds = libc::pollfd {
            fd: self.file.as_raw_fd(),
            events,
            revents: 0,
        };

        let ret = loop {
            let timeout = match deadline {
                Some(deadline) => deadline
                    .saturating_duration_since(Instant::now())
                    .as_millis()
                    .min(i32::MAX as u128) as i32,
                None => -1,
            };
            fds.revents = 0;

            // SAFETY: `fds` is a single valid pollfd living for the whole call
            let ret = unsafe { libc::poll(&mut fds, 1, timeout) };
            if ret >= 0 {
                break ret;
            }
            let err = std::io::Error::last_os_error();
            if err.kind() != std::io::ErrorKind::Interrupted {
                return Err(TransportError::io(&self.info.path, err));
            }
            trace!("poll on {} interrupted, retrying", self.info.path);
        };

        if fds.revents & (libc::POLLERR | libc::POLLHUP | libc::POLLNVAL) != 0 {
            return Err(TransportError::Disconnected);
        }
        Ok(ret > 0 && fds.revents & events != 0)
    }

    /// hidraw takes exactly one report per write(2); anything less is lost
    fn check_written(&self, written: usize) -> Result<(), TransportError> {
        if written < self.out.len() {
            return Err(TransportError::io(
                &self.info.path,
                std::io::Error::new(
                    std::io::ErrorKind::WriteZero,
                    format!("short write: {} of {} bytes", written, self.out.len()),
                ),
            ));
        }
        Ok(())
    }
}

impl Transport for HidrawTransport {
    fn write_report(&mut self, payload: &[u8]) -> Result<(), TransportError> {
        if !self.wait(libc::POLLOUT, WRITE_TIMEOUT_MS)? {
            return Err(TransportError::WriteTimeout(WRITE_TIMEOUT_MS as u64));
        }
        self.out.clear();
        self.out.push(REPORT_ID);
        self.out.extend_from_slice(payload);

        let written = self
            .file
            .write(&self.out)
            .map_err(|e| TransportError::io(&self.info.path, e))?;
        trace!("Wrote {} bytes to {}", written, self.info.path);
        self.check_written(written)
    }

    fn read_report(&mut self, buf: &mut [u8], timeout_ms: i32) -> Result<usize, TransportError> {
        if !self.wait(libc::POLLIN, timeout_ms)? {
            return Ok(0);
        }
        let n = self
            .file
            .read(buf)
            .map_err(|e| TransportError::io(&self.info.path, e))?;
        trace!("Read {} bytes from {}", n, self.info.path);
        Ok(n)
    }

    fn device_info(&self) -> &DeviceDescriptor {
        &self.info
    }
}
