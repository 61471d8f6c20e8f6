//! Tests against a real instrument.
//!
//! These tests require a Bentham device to be connected.
//! Run with: cargo test --test hardware -- --ignored --nocapture
//!
//! Set BENDEV_SERIAL to pick one device when several are attached.

use std::time::Duration;

use bendev::{list_connected_devices, Device, DeviceFilter, SessionConfig};

fn open_device() -> Device {
    let config = match std::env::var("BENDEV_SERIAL") {
        Ok(serial) => SessionConfig::serial(serial),
        Err(_) => SessionConfig::default(),
    };
    Device::open(config.with_timeout(Duration::from_secs(2)))
        .expect("No Bentham device found; plug one in or set BENDEV_SERIAL")
}

#[test]
#[ignore] // requires hardware
fn test_list_finds_device() {
    let devices = list_connected_devices(&DeviceFilter::default(), true).unwrap();
    assert!(!devices.is_empty(), "no Bentham devices listed");
    assert!(devices.windows(2).all(|w| w[0].path <= w[1].path));
}

#[test]
#[ignore] // requires hardware
fn test_idn_matches_usb_info() {
    let mut device = open_device();
    let idn = device.cmd_query("*IDN?").unwrap().into_values();
    println!("IDN: {idn:?}");

    let info = device.descriptor().unwrap().clone();
    assert_eq!(idn.len(), 4);
    assert_eq!(idn[2].to_string(), info.serial_number);
}

#[test]
#[ignore] // requires hardware
fn test_error_queue_round_trip() {
    let mut device = open_device();
    device.check_scpi_error().unwrap();

    // An undefined header lands in the error queue
    device.write("BENDEV:NO:SUCH:COMMAND").unwrap();
    let err = device.check_scpi_error().unwrap_err();
    println!("{err}");
    device.check_scpi_error().unwrap();
}

#[test]
#[ignore] // requires hardware
fn test_reconnect() {
    let mut device = open_device();
    device.reconnect().unwrap();
    assert!(!device.query("*IDN?").unwrap().is_empty());
}
