//! bendev command-line interface
//!
//! Lists Bentham devices and sends SCPI commands to one of them.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use bendev::{list_connected_devices_with, render_summary, Device, DeviceDiscovery, SessionConfig};

mod cli;
use cli::{Cli, Commands};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli.config.clone().unwrap_or_else(SessionConfig::default_path);
    info!("Loading config from {:?}", config_path);
    let mut config = SessionConfig::load(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;
    cli.apply_overrides(&mut config);

    let discovery = cli.discovery();

    match &cli.command {
        Commands::List { all, json } => {
            let filter = cli.listing_filter(*all);
            let devices = list_connected_devices_with(discovery.as_ref(), &filter, false)?;
            if *json {
                println!("{}", serde_json::to_string_pretty(&devices)?);
            } else {
                print!("{}", render_summary(&devices));
            }
        }
        Commands::Info => {
            let mut device = open(discovery, config)?;
            match device.descriptor() {
                Some(descriptor) => {
                    println!("{descriptor}");
                    println!("path: {}", descriptor.path);
                }
                None => println!("hidraw: {}", device.config().hidraw.as_deref().unwrap_or("?")),
            }
            println!("{}", device.query("*IDN?")?);
        }
        Commands::Query { command } => {
            let mut device = open(discovery, config)?;
            println!("{}", device.query(command)?);
        }
        Commands::Write { command } => {
            let mut device = open(discovery, config)?;
            device.write(command)?;
        }
        Commands::Read => {
            let mut device = open(discovery, config)?;
            println!("{}", device.read()?);
        }
        Commands::Cmd { command } => {
            let mut device = open(discovery, config)?;
            if command.trim_end().ends_with('?') {
                println!("{}", device.cmd_query(command)?);
            } else {
                device.cmd(command)?;
            }
        }
    }

    Ok(())
}

fn open(discovery: Arc<dyn DeviceDiscovery>, config: SessionConfig) -> Result<Device> {
    let criteria = config.device.to_string();
    Device::open_with(discovery, config).with_context(|| format!("opening device ({criteria})"))
}
