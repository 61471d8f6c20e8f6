//! Session configuration
//!
//! Everything a [`Device`](crate::Device) needs to find, open and talk to an
//! instrument. Loadable from TOML:
//!
//! ```toml
//! timeout_ms = 2000
//! read_interval_ms = 50
//! encoding = "ascii"
//!
//! [device]
//! serial_number = "99999/9"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use bendev_transport::OpenTarget;
use serde::{Deserialize, Serialize};

use crate::error::DeviceError;
use crate::selector::DeviceSelector;

/// Text encoding for commands and replies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Encoding {
    /// 7-bit ASCII; anything else is rejected
    #[default]
    Ascii,
    /// UTF-8
    Utf8,
}

impl Encoding {
    /// Encode a command for transmission
    pub fn encode(&self, text: &str) -> Result<Vec<u8>, DeviceError> {
        if *self == Encoding::Ascii && !text.is_ascii() {
            return Err(DeviceError::InvalidParameter(format!(
                "command {text:?} is not ASCII"
            )));
        }
        Ok(text.as_bytes().to_vec())
    }

    /// Decode reply bytes
    pub fn decode(&self, bytes: Vec<u8>) -> Result<String, DeviceError> {
        let valid = match self {
            Encoding::Ascii => bytes.is_ascii(),
            Encoding::Utf8 => std::str::from_utf8(&bytes).is_ok(),
        };
        if !valid {
            return Err(DeviceError::Decode {
                encoding: self.to_string(),
                reply: String::from_utf8_lossy(&bytes).into_owned(),
            });
        }
        String::from_utf8(bytes).map_err(|e| DeviceError::Decode {
            encoding: self.to_string(),
            reply: String::from_utf8_lossy(e.as_bytes()).into_owned(),
        })
    }
}

impl std::fmt::Display for Encoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Encoding::Ascii => write!(f, "ascii"),
            Encoding::Utf8 => write!(f, "utf8"),
        }
    }
}

fn default_read_interval() -> u64 {
    50
}

fn default_terminator() -> String {
    "\n".to_string()
}

/// Complete session configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Selection criteria used when neither `path` nor `hidraw` is set
    #[serde(default)]
    pub device: DeviceSelector,
    /// Explicit OS device path, opened through hidapi without selection
    #[serde(default)]
    pub path: Option<String>,
    /// Raw hidraw node, read and written directly (unix only)
    #[serde(default)]
    pub hidraw: Option<String>,
    /// Reply timeout in milliseconds; 0 waits forever
    #[serde(default)]
    pub timeout_ms: u64,
    /// Polling slice between report reads in milliseconds
    #[serde(default = "default_read_interval")]
    pub read_interval_ms: u64,
    #[serde(default)]
    pub encoding: Encoding,
    /// Appended to commands and expected at the end of replies
    #[serde(default = "default_terminator")]
    pub terminator: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            device: DeviceSelector::default(),
            path: None,
            hidraw: None,
            timeout_ms: 0,
            read_interval_ms: default_read_interval(),
            encoding: Encoding::default(),
            terminator: default_terminator(),
        }
    }
}

impl SessionConfig {
    /// Config selecting a device by serial number
    pub fn serial(serial: impl Into<String>) -> Self {
        Self {
            device: DeviceSelector::serial(serial),
            ..Self::default()
        }
    }

    /// Config selecting a device by product string substring
    pub fn product(product: impl Into<String>) -> Self {
        Self {
            device: DeviceSelector::product(product),
            ..Self::default()
        }
    }

    /// Config opening a raw hidraw node
    pub fn hidraw(path: impl Into<String>) -> Self {
        Self {
            hidraw: Some(path.into()),
            ..Self::default()
        }
    }

    /// Set the reply timeout (`Duration::ZERO` waits forever)
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Reply timeout, `None` when waiting forever
    pub fn timeout(&self) -> Option<Duration> {
        match self.timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }

    /// Polling slice between report reads (at least 1 ms)
    pub fn read_interval(&self) -> Duration {
        Duration::from_millis(self.read_interval_ms.max(1))
    }

    /// Explicit target bypassing selection, if one is configured
    ///
    /// `hidraw` takes precedence over `path`.
    pub fn explicit_target(&self) -> Option<OpenTarget> {
        if let Some(ref hidraw) = self.hidraw {
            return Some(OpenTarget::Hidraw(hidraw.clone()));
        }
        self.path.as_ref().map(|p| OpenTarget::Path(p.clone()))
    }

    /// Get the default config file path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("bendev")
            .join("config.toml")
    }

    /// Load config from a file, or return default if not found
    pub fn load(path: &Path) -> Result<Self, DeviceError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| DeviceError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml(&content)
    }

    /// Parse config from TOML text
    pub fn from_toml(content: &str) -> Result<Self, DeviceError> {
        toml::from_str(content).map_err(|e| DeviceError::Config(e.to_string()))
    }
}
