// CLI definitions using clap

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use bendev::{DeviceFilter, HidDiscovery, SessionConfig};
use bendev_transport::{DeviceDiscovery, MonitorConfig};
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "bendev")]
#[command(author, version, about = "Talk to Bentham Instruments devices over USB HID")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Select device by exact serial number
    #[arg(long, global = true)]
    pub serial: Option<String>,

    /// Select device by product string (substring)
    #[arg(long, global = true)]
    pub product: Option<String>,

    /// Manufacturer string to match (substring, default "Bentham")
    #[arg(long, global = true)]
    pub manufacturer: Option<String>,

    /// USB vendor ID (decimal or 0x-prefixed hex)
    #[arg(long, global = true, value_parser = parse_u16)]
    pub vendor_id: Option<u16>,

    /// USB product ID (decimal or 0x-prefixed hex)
    #[arg(long, global = true, value_parser = parse_u16)]
    pub product_id: Option<u16>,

    /// Open this OS device path instead of searching
    #[arg(long, global = true, value_name = "PATH")]
    pub path: Option<String>,

    /// Open a raw hidraw node directly, bypassing hidapi
    #[arg(long, global = true, value_name = "DEVICE")]
    pub hidraw: Option<String>,

    /// Reply timeout in seconds (0 waits forever)
    #[arg(long, global = true, value_name = "SECONDS", value_parser = parse_seconds)]
    pub timeout: Option<Duration>,

    /// Config file path (default: ~/.config/bendev/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Print every report sent and received
    #[arg(long, global = true)]
    pub monitor: bool,

    /// Show raw hex dump alongside monitored reports
    #[arg(long, global = true)]
    pub hex: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List connected devices
    #[command(visible_alias = "ls")]
    List {
        /// Include devices from every vendor
        #[arg(long)]
        all: bool,
        /// Print descriptors as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show USB information and identification of the selected device
    Info,

    /// Send a query and print the reply
    #[command(visible_alias = "q")]
    Query {
        /// SCPI query, e.g. "*IDN?"
        command: String,
    },

    /// Send a command without reading a reply
    #[command(visible_alias = "w")]
    Write {
        /// SCPI command, e.g. "SYSTEM:LOCAL"
        command: String,
    },

    /// Read one pending reply
    #[command(visible_alias = "r")]
    Read,

    /// Send a command and check the SCPI error queue
    ///
    /// Queries (ending in '?') print their reply with each field converted.
    Cmd {
        /// SCPI command or query
        command: String,
    },
}

impl Cli {
    /// Apply selection and timing flags on top of a loaded config
    pub fn apply_overrides(&self, config: &mut SessionConfig) {
        if let Some(ref serial) = self.serial {
            config.device.serial_number = Some(serial.clone());
        }
        if let Some(ref product) = self.product {
            config.device.product_string = Some(product.clone());
        }
        if let Some(ref manufacturer) = self.manufacturer {
            config.device.manufacturer_string = Some(manufacturer.clone());
        }
        if let Some(vid) = self.vendor_id {
            config.device.vendor_id = Some(vid);
        }
        if let Some(pid) = self.product_id {
            config.device.product_id = Some(pid);
        }
        if let Some(ref path) = self.path {
            config.path = Some(path.clone());
        }
        if let Some(ref hidraw) = self.hidraw {
            config.hidraw = Some(hidraw.clone());
        }
        if let Some(timeout) = self.timeout {
            config.timeout_ms = timeout.as_millis() as u64;
        }
    }

    /// Filter for the `list` command
    pub fn listing_filter(&self, all: bool) -> DeviceFilter {
        let mut filter = if all {
            DeviceFilter::any()
        } else {
            DeviceFilter::default()
        };
        if let Some(vid) = self.vendor_id {
            filter.vendor_id = Some(vid);
        }
        filter.manufacturer = self.manufacturer.clone();
        filter.product = self.product.clone();
        filter
    }

    /// HID discovery, wrapping opened transports when monitoring
    pub fn discovery(&self) -> Arc<dyn DeviceDiscovery> {
        if self.monitor {
            Arc::new(HidDiscovery::with_monitor(MonitorConfig { show_hex: self.hex }))
        } else {
            Arc::new(HidDiscovery::new())
        }
    }
}

/// Parse a u16 given in decimal or with a `0x` prefix
fn parse_u16(s: &str) -> Result<u16, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => s.parse::<u16>(),
    };
    parsed.map_err(|e| format!("invalid id {s:?}: {e}"))
}

fn parse_seconds(s: &str) -> Result<Duration, String> {
    let secs: f64 = s.parse().map_err(|e| format!("invalid timeout {s:?}: {e}"))?;
    Duration::try_from_secs_f64(secs).map_err(|e| format!("invalid timeout {s:?}: {e}"))
}
