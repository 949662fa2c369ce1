//! Command line arguments for `cdc-acm-client`
use crate::constants::*;
use crate::{LineCoding, SessionBuilder, UsbDeviceConfig};

use clap::error::ErrorKind;
use clap::Parser;
use std::os::fd::RawFd;
use std::time::Duration;

/// Talk to a CDC-ACM device handed over as an open file descriptor, e.g. by
/// `termux-usb -e`.
///
/// Writes a byte to the device every interval and prints whatever comes back,
/// until interrupted.
#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Args {
    /// File descriptor of the already-open USB device
    pub fd: RawFd,

    /// Line coding, as <baud>-<data bits><parity><stop bits>
    #[arg(long, default_value = "115200-8N1")]
    pub line: LineCoding,

    /// Bulk IN endpoint address
    #[arg(long, default_value = "0x82", value_parser = parse_endpoint)]
    pub ep_in: u8,

    /// Bulk OUT endpoint address
    #[arg(long, default_value = "0x02", value_parser = parse_endpoint)]
    pub ep_out: u8,

    /// Byte written to the device each iteration
    #[arg(long, default_value_t = DEFAULT_PROBE_BYTE as char, value_parser = parse_probe_byte)]
    pub byte: char,

    /// Pause between iterations, in milliseconds
    #[arg(long, default_value_t = DEFAULT_INTERVAL.as_millis() as u64)]
    pub interval_ms: u64,

    /// Bulk read timeout, in milliseconds
    #[arg(long, default_value_t = DEFAULT_READ_TIMEOUT.as_millis() as u64)]
    pub read_timeout_ms: u64,

    /// Let libusb enumerate devices when it starts
    #[arg(long)]
    pub no_weak_authority: bool,

    /// Re-attach kernel drivers on exit
    #[arg(long)]
    pub reattach: bool,
}

impl Args {
    pub fn device_config(&self) -> UsbDeviceConfig {
        let mut config = UsbDeviceConfig::new(self.fd);
        config.weak_authority = !self.no_weak_authority;
        config
    }

    pub fn session_builder(&self) -> SessionBuilder {
        let mut builder = SessionBuilder::new();
        builder
            .line_coding(self.line)
            .endpoints(self.ep_in, self.ep_out)
            .probe_byte(self.byte as u8)
            .interval(Duration::from_millis(self.interval_ms))
            .read_timeout(Duration::from_millis(self.read_timeout_ms))
            .reattach_kernel_driver(self.reattach);
        builder
    }
}

/// The exit status for a clap error from [`Args`]: 0 for `--help` and `--version`,
/// [`EXIT_FAILURE`] for a real usage error
pub fn usage_exit_code(err: &clap::Error) -> i32 {
    match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => EXIT_SUCCESS,
        _ => EXIT_FAILURE,
    }
}

fn parse_endpoint(s: &str) -> Result<u8, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => s.parse::<u8>(),
    };
    parsed.map_err(|e| format!("invalid endpoint address {s:?}: {e}"))
}

fn parse_probe_byte(s: &str) -> Result<char, String> {
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii() => Ok(c),
        _ => Err(format!("{s:?} is not a single ASCII character")),
    }
}
