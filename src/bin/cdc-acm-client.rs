//! A minimal CDC-ACM serial client.
//!
//! It wraps the file descriptor it is given as a USB device, detaches the
//! kernel driver from the control and data interfaces and claims them,
//! asserts DTR/RTS and sets the line coding, then writes a byte and prints
//! the response once a second.
//!
//! It is intended to be run from `termux-usb`, which opens the device and
//! passes its fd:
//!
//! ```text
//! termux-usb -r -e ./cdc-acm-client /dev/bus/usb/001/002
//! ```
//!
//! Ctrl-C (or SIGTERM) stops the loop, releases the interfaces and exits 0.
//! A second Ctrl-C exits 130 straight away, for when a transfer never
//! completes.
//! Setup failures exit with the libusb error code.
//!
//! Received data is printed to stdout.  All logging is done to stderr and
//! can be controlled via the `RUST_LOG` environment variable.
use cdc_acm::cli::{usage_exit_code, Args};
use cdc_acm::constants::EXIT_SUCCESS;
use cdc_acm::{run, Device, Error, Shutdown, UsbDevice};

use clap::Parser;

use env_logger::Env;
#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};

fn execute(args: Args) -> Result<(), Error> {
    let shutdown = Shutdown::new();
    shutdown.install_handler()?;

    info!("Wrap file descriptor {}", args.fd);
    let device = UsbDevice::open(args.device_config())?;
    match device.usb_info() {
        Some(info) => info!(
            "Opened USB device {:04x}:{:04x} at {:03}-{:03}",
            info.vendor_id, info.product_id, info.bus_number, info.device_address
        ),
        None => info!("Opened USB device, no descriptor available"),
    }

    let builder = args.session_builder();
    let stats = run(device, &builder, &shutdown, &mut std::io::stdout())?;
    info!(
        "Exiting after {} iterations, {} bytes received",
        stats.iterations, stats.bytes_received
    );

    Ok(())
}

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("warn")).init();

    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            // Prints usage to stderr for errors, stdout for --help
            if let Err(print_err) = e.print() {
                error!("Failed to print usage: {}", print_err);
            }
            std::process::exit(usage_exit_code(&e));
        }
    };

    match execute(args) {
        Ok(_) => std::process::exit(EXIT_SUCCESS),
        Err(e) => {
            error!("Error: {}", e);
            std::process::exit(e.exit_code());
        }
    }
}
