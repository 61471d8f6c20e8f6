//! In-memory instrument for exercising sessions without hardware
//!
//! [`MockDiscovery`] lists a fixed set of descriptors and opens
//! [`MockTransport`]s that talk to one shared [`MockInstrument`]. The
//! instrument decodes framed commands, answers queries from a reply table,
//! keeps a SCPI error queue and chops replies into reports the way a real
//! device would.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::discovery::DeviceDiscovery;
use crate::error::TransportError;
use crate::protocol::{ReplyAccumulator, DEFAULT_TERMINATOR, PAD, REPORT_SIZE};
use crate::types::{DeviceDescriptor, OpenTarget};
use crate::{BoxedTransport, Transport};

/// Longest a mock read sleeps when nothing is pending
const IDLE_SLEEP_MS: u64 = 5;

/// State of the simulated instrument
#[derive(Debug)]
pub struct MockInstrument {
    /// Exact query text → reply text (without terminator)
    pub replies: HashMap<String, String>,
    /// SCPI error queue, oldest first
    pub error_queue: VecDeque<(i32, String)>,
    /// Every complete command received, in order
    pub received: Vec<String>,
    /// Reports waiting to be read
    pub pending: VecDeque<Vec<u8>>,
    /// Bytes of reply per input report
    pub reply_chunk: usize,
    /// Pad the final reply report with NULs to the full report size
    pub pad_last: bool,
    /// Append the terminator to replies
    pub terminate_replies: bool,
    /// Swallow queries without answering
    pub silent: bool,
    /// Simulate the device being unplugged
    pub unplugged: bool,
    /// Fail every write with a HID error
    pub fail_writes: bool,
    /// Number of transports opened
    pub opens: usize,
    /// Number of transports dropped
    pub closes: usize,
}

impl Default for MockInstrument {
    fn default() -> Self {
        Self {
            replies: HashMap::new(),
            error_queue: VecDeque::new(),
            received: Vec::new(),
            pending: VecDeque::new(),
            reply_chunk: REPORT_SIZE,
            pad_last: true,
            terminate_replies: true,
            silent: false,
            unplugged: false,
            fail_writes: false,
            opens: 0,
            closes: 0,
        }
    }
}

impl MockInstrument {
    /// Register a reply for an exact query string
    pub fn reply(&mut self, query: &str, reply: &str) -> &mut Self {
        self.replies.insert(query.to_string(), reply.to_string());
        self
    }

    /// Push an entry onto the SCPI error queue
    pub fn push_error(&mut self, code: i32, message: &str) -> &mut Self {
        self.error_queue.push_back((code, message.to_string()));
        self
    }

    fn handle_command(&mut self, command: String) {
        let answer = match command.as_str() {
            ":SYST:ERR:COUNT?" => Some(self.error_queue.len().to_string()),
            ":SYST:ERR?" => Some(match self.error_queue.pop_front() {
                Some((code, message)) => format!("{code},\"{message}\""),
                None => "0,\"No error\"".to_string(),
            }),
            c if c.ends_with('?') => match self.replies.get(c) {
                Some(reply) => Some(reply.clone()),
                None => {
                    self.error_queue
                        .push_back((-113, "Undefined header".to_string()));
                    None
                }
            },
            _ => None,
        };
        self.received.push(command);

        if let Some(answer) = answer {
            if !self.silent {
                self.queue_reply(answer.as_bytes());
            }
        }
    }

    fn queue_reply(&mut self, reply: &[u8]) {
        let mut bytes = reply.to_vec();
        if self.terminate_replies {
            bytes.extend_from_slice(DEFAULT_TERMINATOR);
        }
        let chunk = self.reply_chunk.clamp(1, REPORT_SIZE);
        let count = bytes.chunks(chunk).count();
        for (i, part) in bytes.chunks(chunk).enumerate() {
            let mut report = part.to_vec();
            if i + 1 == count && self.pad_last {
                report.resize(REPORT_SIZE, PAD);
            }
            self.pending.push_back(report);
        }
    }
}

/// Shared handle to a mock instrument
pub type SharedInstrument = Arc<Mutex<MockInstrument>>;

/// Discovery backend serving a fixed descriptor list
pub struct MockDiscovery {
    devices: Vec<DeviceDescriptor>,
    instrument: SharedInstrument,
}

impl MockDiscovery {
    /// Create a discovery listing `devices` (sorted by path)
    pub fn new(mut devices: Vec<DeviceDescriptor>) -> Self {
        devices.sort_by(|a, b| a.path.cmp(&b.path));
        Self {
            devices,
            instrument: Arc::new(Mutex::new(MockInstrument::default())),
        }
    }

    /// Handle to the instrument behind every opened transport
    pub fn instrument(&self) -> SharedInstrument {
        Arc::clone(&self.instrument)
    }

    fn descriptor_for_path(&self, path: &str) -> DeviceDescriptor {
        self.devices
            .iter()
            .find(|d| d.path == path)
            .cloned()
            .unwrap_or_else(|| DeviceDescriptor::from_path(path))
    }
}

impl DeviceDiscovery for MockDiscovery {
    fn list_devices(&self) -> Result<Vec<DeviceDescriptor>, TransportError> {
        if self.instrument.lock().unplugged {
            return Ok(Vec::new());
        }
        Ok(self.devices.clone())
    }

    fn open(&self, target: &OpenTarget) -> Result<BoxedTransport, TransportError> {
        let info = match target {
            OpenTarget::Descriptor(d) => {
                if !self.devices.iter().any(|known| known.path == d.path) {
                    return Err(TransportError::DeviceNotFound(d.path.clone()));
                }
                d.clone()
            }
            OpenTarget::Path(path) => self.descriptor_for_path(path),
            OpenTarget::Hidraw(path) => DeviceDescriptor::from_path(path.as_str()),
        };

        let mut instrument = self.instrument.lock();
        if instrument.unplugged {
            return Err(TransportError::HidError(format!(
                "failed to open {}",
                info.path
            )));
        }
        instrument.opens += 1;
        drop(instrument);

        Ok(Box::new(MockTransport {
            instrument: Arc::clone(&self.instrument),
            inbound: ReplyAccumulator::new(DEFAULT_TERMINATOR),
            info,
        }))
    }
}

/// Transport connected to a [`MockInstrument`]
pub struct MockTransport {
    instrument: SharedInstrument,
    inbound: ReplyAccumulator,
    info: DeviceDescriptor,
}

impl Transport for MockTransport {
    fn write_report(&mut self, payload: &[u8]) -> Result<(), TransportError> {
        let mut instrument = self.instrument.lock();
        if instrument.unplugged {
            return Err(TransportError::Disconnected);
        }
        if instrument.fail_writes {
            return Err(TransportError::HidError("write failed".into()));
        }

        if self.inbound.push(payload) {
            let done = std::mem::replace(
                &mut self.inbound,
                ReplyAccumulator::new(DEFAULT_TERMINATOR),
            );
            let command = String::from_utf8_lossy(&done.into_bytes()).into_owned();
            instrument.handle_command(command);
        }
        Ok(())
    }

    fn read_report(&mut self, buf: &mut [u8], timeout_ms: i32) -> Result<usize, TransportError> {
        let next = {
            let mut instrument = self.instrument.lock();
            if instrument.unplugged {
                return Err(TransportError::Disconnected);
            }
            instrument.pending.pop_front()
        };

        match next {
            Some(report) => {
                let n = report.len().min(buf.len());
                buf[..n].copy_from_slice(&report[..n]);
                Ok(n)
            }
            None => {
                let wait = if timeout_ms < 0 {
                    IDLE_SLEEP_MS
                } else {
                    (timeout_ms as u64).min(IDLE_SLEEP_MS)
                };
                std::thread::sleep(Duration::from_millis(wait));
                Ok(0)
            }
        }
    }

    fn device_info(&self) -> &DeviceDescriptor {
        &self.info
    }
}

impl Drop for MockTransport {
    fn drop(&mut self) {
        self.instrument.lock().closes += 1;
    }
}
