//! Error objects for the cdc-acm crate
use crate::constants::EXIT_FAILURE;
use crate::line::ControlRequest;
use crate::session::SessionState;
use rusb::constants::{
    LIBUSB_ERROR_ACCESS, LIBUSB_ERROR_BUSY, LIBUSB_ERROR_INTERRUPTED, LIBUSB_ERROR_INVALID_PARAM,
    LIBUSB_ERROR_IO, LIBUSB_ERROR_NOT_FOUND, LIBUSB_ERROR_NOT_SUPPORTED, LIBUSB_ERROR_NO_DEVICE,
    LIBUSB_ERROR_NO_MEM, LIBUSB_ERROR_OTHER, LIBUSB_ERROR_OVERFLOW, LIBUSB_ERROR_PIPE,
    LIBUSB_ERROR_TIMEOUT,
};
use std::fmt;
use std::os::fd::RawFd;
use thiserror::Error;

/// Error type for the cdc-acm crate
#[derive(Debug, Error, PartialEq)]
pub enum Error {
    /// Invalid arguments passed to the cdc-acm library or client
    #[error("Invalid arguments: {message}")]
    Args { message: String },

    /// Failed to set up libusb itself
    #[error("Error initializing libusb: {source}")]
    Init { source: UsbError },

    /// The file descriptor could not be wrapped as a USB device handle
    #[error("Error wrapping file descriptor {fd}: {source}")]
    Wrap { fd: RawFd, source: UsbError },

    /// An interface could not be claimed
    #[error("Error claiming interface {interface}: {source}")]
    Claim { interface: u8, source: UsbError },

    /// A line configuration control transfer failed
    #[error("Error during control transfer {request}: {source}")]
    Control {
        request: ControlRequest,
        source: UsbError,
    },

    /// A bulk transfer failed
    #[error("Error during bulk transfer on endpoint 0x{endpoint:02x}: {source}")]
    Transfer { endpoint: u8, source: UsbError },

    /// A session operation was called before the session reached the
    /// required state
    #[error("Session is {actual}, operation requires {expected}")]
    State {
        expected: SessionState,
        actual: SessionState,
    },

    /// The shutdown signal handler could not be installed
    #[error("Failed to install signal handler: {message}")]
    Signal { message: String },

    /// Received data could not be written out
    #[error("Failed to write received data: {message}")]
    Output { message: String },
}

impl Error {
    /// The process exit status to use when this error ends the program.
    ///
    /// USB setup failures propagate the libusb error code, which is negative.
    /// Everything else exits with [`EXIT_FAILURE`].
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Init { source }
            | Error::Wrap { source, .. }
            | Error::Claim { source, .. }
            | Error::Control { source, .. }
            | Error::Transfer { source, .. } => source.code(),
            Error::Args { .. }
            | Error::State { .. }
            | Error::Signal { .. }
            | Error::Output { .. } => EXIT_FAILURE,
        }
    }

    /// The underlying libusb error, if there is one
    pub fn usb_error(&self) -> Option<rusb::Error> {
        match self {
            Error::Init { source }
            | Error::Wrap { source, .. }
            | Error::Claim { source, .. }
            | Error::Control { source, .. }
            | Error::Transfer { source, .. } => Some(source.0),
            _ => None,
        }
    }
}

/// A [`rusb::Error`] displayed the way libusb names it, e.g.
/// `LIBUSB_ERROR_TIMEOUT (Operation timed out)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsbError(pub rusb::Error);

impl UsbError {
    /// libusb's symbolic name for this error
    pub fn name(&self) -> &'static str {
        match self.0 {
            rusb::Error::Io => "LIBUSB_ERROR_IO",
            rusb::Error::InvalidParam => "LIBUSB_ERROR_INVALID_PARAM",
            rusb::Error::Access => "LIBUSB_ERROR_ACCESS",
            rusb::Error::NoDevice => "LIBUSB_ERROR_NO_DEVICE",
            rusb::Error::NotFound => "LIBUSB_ERROR_NOT_FOUND",
            rusb::Error::Busy => "LIBUSB_ERROR_BUSY",
            rusb::Error::Timeout => "LIBUSB_ERROR_TIMEOUT",
            rusb::Error::Overflow => "LIBUSB_ERROR_OVERFLOW",
            rusb::Error::Pipe => "LIBUSB_ERROR_PIPE",
            rusb::Error::Interrupted => "LIBUSB_ERROR_INTERRUPTED",
            rusb::Error::NoMem => "LIBUSB_ERROR_NO_MEM",
            rusb::Error::NotSupported => "LIBUSB_ERROR_NOT_SUPPORTED",
            rusb::Error::BadDescriptor | rusb::Error::Other => "LIBUSB_ERROR_OTHER",
        }
    }

    /// libusb's numeric code for this error (always negative)
    pub fn code(&self) -> i32 {
        match self.0 {
            rusb::Error::Io => LIBUSB_ERROR_IO,
            rusb::Error::InvalidParam => LIBUSB_ERROR_INVALID_PARAM,
            rusb::Error::Access => LIBUSB_ERROR_ACCESS,
            rusb::Error::NoDevice => LIBUSB_ERROR_NO_DEVICE,
            rusb::Error::NotFound => LIBUSB_ERROR_NOT_FOUND,
            rusb::Error::Busy => LIBUSB_ERROR_BUSY,
            rusb::Error::Timeout => LIBUSB_ERROR_TIMEOUT,
            rusb::Error::Overflow => LIBUSB_ERROR_OVERFLOW,
            rusb::Error::Pipe => LIBUSB_ERROR_PIPE,
            rusb::Error::Interrupted => LIBUSB_ERROR_INTERRUPTED,
            rusb::Error::NoMem => LIBUSB_ERROR_NO_MEM,
            rusb::Error::NotSupported => LIBUSB_ERROR_NOT_SUPPORTED,
            rusb::Error::BadDescriptor | rusb::Error::Other => LIBUSB_ERROR_OTHER,
        }
    }
}

impl fmt::Display for UsbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.0)
    }
}

impl std::error::Error for UsbError {}

// Map rusb::Error to UsbError
impl From<rusb::Error> for UsbError {
    fn from(err: rusb::Error) -> Self {
        Self(err)
    }
}

// Map output failures to Error
impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Output {
            message: err.to_string(),
        }
    }
}

// Map ctrlc failures to Error
impl From<ctrlc::Error> for Error {
    fn from(err: ctrlc::Error) -> Self {
        Self::Signal {
            message: err.to_string(),
        }
    }
}
