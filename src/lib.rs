//! # cdc-acm
//!
//! This crate provides a minimal USB CDC-ACM (virtual serial port) client
//! built on [`rusb`].  It is aimed at environments such as Android/Termux,
//! where the process can't enumerate USB devices itself, and is instead handed
//! an already-open file descriptor for the device.
//!
//! ## Overview
//!
//! The crate is structured around two main components:
//!
//! - A high-level [`Session`] which drives the device through setup and the
//!   transfer loop
//! - A lower-level [`Device`] trait for direct USB communication, implemented
//!   by [`UsbDevice`]
//!
//! ### Session Layer
//!
//! A [`Session`] owns its device and steps through:
//!
//! 1. acquire - detach any kernel driver from the CDC-ACM control (0) and
//!    data (1) interfaces, and claim them
//! 2. configure - SET_CONTROL_LINE_STATE (DTR | RTS) then SET_LINE_CODING
//! 3. stream - write one byte, read up to 64 bytes with a 1s timeout, print
//!    what arrived, pause, repeat until [`Shutdown`] is triggered
//! 4. close - release the interfaces
//!
//! Out of order calls are rejected with [`Error::State`].  Interfaces are
//! released however the session ends, including on error and on drop.
//!
//! ### Device Layer
//!
//! [`Device`] mirrors the handful of libusb calls a CDC-ACM client needs.
//! [`UsbDevice`] wraps a file descriptor with
//! [`rusb::UsbContext::open_device_with_fd`], after optionally disabling
//! libusb device discovery.
//!
//! ## Getting Started
//!
//! ```rust,no_run
//! use cdc_acm::{run, Device, Error, SessionBuilder, Shutdown, UsbDevice, UsbDeviceConfig};
//!
//! fn main() -> Result<(), Error> {
//!     // fd 3 was opened for us by termux-usb
//!     let device = UsbDevice::open(UsbDeviceConfig::new(3))?;
//!
//!     // Stop cleanly on Ctrl-C
//!     let shutdown = Shutdown::new();
//!     shutdown.install_handler()?;
//!
//!     // 115200-8N1, endpoints 0x82/0x02
//!     let builder = SessionBuilder::new();
//!     run(device, &builder, &shutdown, &mut std::io::stdout())?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! The library uses a single [`Error`] type.  USB failures keep the
//! underlying [`rusb::Error`], display its libusb name, and map to libusb's
//! numeric code via [`Error::exit_code`].  Setup failures are fatal; failures
//! inside the transfer loop are logged and the loop continues.
//!
//! ## Logging
//!
//! The library uses the `log` crate for diagnostic output:
//!
//! - Error: Failed transfers
//! - Warn: Ignored failures, such as a kernel driver that wouldn't detach
//! - Info: Session state changes
//! - Debug: Protocol details
//! - Trace: Function entry
//!
//! To enable logging, use [`env_logger::init`](https://docs.rs/env_logger/latest/env_logger/index.html) and set the `RUST_LOG` environment variable.
//!
//! ## License
//!
//! This library is licensed under the GNU General Public License Version 3 (GPLv3).

pub mod cli;
pub mod constants;
pub mod device;
pub mod error;
pub mod line;
pub mod session;
pub mod shutdown;

pub use crate::device::{Device, UsbDevice, UsbDeviceConfig, UsbInfo};
pub use crate::error::{Error, UsbError};
pub use crate::line::{ControlLineState, ControlRequest, LineCoding, Parity, StopBits};
pub use crate::session::{run, Session, SessionBuilder, SessionConfig, SessionState, StreamStats};
pub use crate::shutdown::{Shutdown, SignalAction};
