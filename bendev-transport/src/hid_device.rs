//! HID transport over a `hidapi` device handle

use hidapi::HidDevice;
use tracing::{debug, trace};

use crate::error::TransportError;
use crate::protocol::{REPORT_ID, REPORT_SIZE};
use crate::types::DeviceDescriptor;
use crate::Transport;

/// Transport for a device opened through `hidapi`
///
/// Reports are written with a leading report ID of 0 as `hidapi` requires
/// for devices with unnumbered reports; the ID is stripped again by the
/// platform backend before the report goes on the wire.
pub struct HidTransport {
    device: HidDevice,
    info: DeviceDescriptor,
    /// Scratch buffer for `[report_id, payload...]`
    out: Vec<u8>,
}

impl HidTransport {
    /// Wrap an opened `hidapi` device
    pub fn new(device: HidDevice, info: DeviceDescriptor) -> Self {
        Self {
            device,
            info,
            out: Vec::with_capacity(REPORT_SIZE + 1),
        }
    }
}

impl Transport for HidTransport {
    fn write_report(&mut self, payload: &[u8]) -> Result<(), TransportError> {
        self.out.clear();
        self.out.push(REPORT_ID);
        self.out.extend_from_slice(payload);

        let written = self.device.write(&self.out)?;
        trace!("Wrote {} of {} bytes to {}", written, self.out.len(), self.info.path);
        if written == 0 {
            return Err(TransportError::Disconnected);
        }
        Ok(())
    }

    fn read_report(&mut self, buf: &mut [u8], timeout_ms: i32) -> Result<usize, TransportError> {
        let n = self.device.read_timeout(buf, timeout_ms)?;
        if n > 0 {
            trace!("Read {} bytes from {}: {:02X?}", n, self.info.path, &buf[..n]);
        }
        Ok(n)
    }

    fn device_info(&self) -> &DeviceDescriptor {
        &self.info
    }
}

impl Drop for HidTransport {
    fn drop(&mut self) {
        debug!("HidTransport dropped, closing {}", self.info.path);
    }
}
