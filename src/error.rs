//! Device session error types

use std::time::Duration;

use bendev_transport::TransportError;
use thiserror::Error;

/// Errors from device sessions
#[derive(Error, Debug)]
pub enum DeviceError {
    /// No attached device matched the selection criteria
    #[error("Can't find device ({0})")]
    NotFound(String),

    /// Several devices matched and the criteria can't tell them apart
    #[error("{count} devices match ({criteria}); narrow the selection")]
    Ambiguous { count: usize, criteria: String },

    /// The OS/HID layer refused to open (or reopen) the device
    #[error("Connection failed: {0}")]
    Connection(#[source] TransportError),

    /// Report transmission failed
    #[error("I/O error: {0}")]
    Io(#[source] TransportError),

    /// No complete reply arrived in time
    #[error("Device failed to respond in {0:?}")]
    Timeout(Duration),

    /// The session was closed
    #[error("This device connection is not open")]
    Closed,

    /// The instrument reported an entry in its SCPI error queue
    #[error("SCPI error {code}: {message}")]
    Scpi { code: i32, message: String },

    /// Invalid parameter value
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Reply bytes are not valid in the configured encoding
    #[error("Reply is not valid {encoding}: {reply:?}")]
    Decode { encoding: String, reply: String },

    /// Configuration file could not be read or parsed
    #[error("Config error: {0}")]
    Config(String),
}

impl DeviceError {
    /// Whether a `reconnect` may recover from this error
    pub fn is_connection_lost(&self) -> bool {
        matches!(
            self,
            DeviceError::Connection(_)
                | DeviceError::Io(TransportError::Disconnected)
                | DeviceError::Io(TransportError::HidError(_))
                | DeviceError::Io(TransportError::Io { .. })
        )
    }
}
