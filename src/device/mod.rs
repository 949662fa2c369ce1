//! The [`Device`] module provides the low-level interface to the USB device.  Prefer [`crate::Session`] for most use cases.
//!
//! It is unlikely you need to use this interface directly unless you are
//! re-implementing [`crate::Session`] or adding to it.

#[cfg(test)]
pub(crate) mod mock;
pub mod usb;

pub use usb::{UsbDevice, UsbDeviceConfig, UsbInfo};

use crate::Error;
use std::time::Duration;

/// The core Device trait, which allows Device to be mocked out for testing.
///
/// The methods mirror the libusb primitives a CDC-ACM client needs, and
/// return the raw [`rusb::Error`] so the caller can decide which failures are
/// fatal.  A zero `timeout` means wait forever.
pub trait Device: std::fmt::Debug {
    type Config;

    /// Opens the Device using the provided config.
    ///
    /// # Arguments
    /// * `config` - Configuration for the device
    ///
    /// # Returns
    /// * `Ok(Device)` - Successfully opened device, with no interfaces claimed
    /// * `Err(Error)` - If libusb could not be set up or the device couldn't be opened
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use cdc_acm::{Device, UsbDevice, UsbDeviceConfig};
    ///
    /// // fd 3 was opened and handed to us by the platform
    /// let device = UsbDevice::open(UsbDeviceConfig::new(3)).unwrap();
    /// ```
    fn open(config: Self::Config) -> Result<Self, Error>
    where
        Self: Sized;

    /// Returns whether a kernel driver is bound to `interface`
    fn kernel_driver_active(&self, interface: u8) -> Result<bool, rusb::Error>;

    /// Detaches the kernel driver bound to `interface`
    fn detach_kernel_driver(&self, interface: u8) -> Result<(), rusb::Error>;

    /// Re-attaches the kernel driver to `interface`
    fn attach_kernel_driver(&self, interface: u8) -> Result<(), rusb::Error>;

    /// Claims `interface` for exclusive use
    fn claim_interface(&self, interface: u8) -> Result<(), rusb::Error>;

    /// Releases a previously claimed `interface`
    fn release_interface(&self, interface: u8) -> Result<(), rusb::Error>;

    /// Sends a host-to-device control transfer
    ///
    /// # Arguments
    /// * `request_type` - The bmRequestType byte
    /// * `request` - The bRequest byte
    /// * `value` - The 2 byte wValue
    /// * `index` - The 2 byte wIndex
    /// * `data` - Any payload, may be empty
    /// * `timeout` - How long to wait, zero for no timeout
    ///
    /// # Returns
    /// * `Ok(usize)` - number of payload bytes sent
    /// * `Err(rusb::Error)` - On failure
    fn write_control(
        &self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        data: &[u8],
        timeout: Duration,
    ) -> Result<usize, rusb::Error>;

    /// Writes `data` to bulk OUT `endpoint`, returning the number of bytes written
    fn write_bulk(&self, endpoint: u8, data: &[u8], timeout: Duration)
        -> Result<usize, rusb::Error>;

    /// Reads from bulk IN `endpoint` into `buffer`, returning the number of
    /// bytes read.  Returns `Err(rusb::Error::Timeout)` if nothing arrived in
    /// time.
    fn read_bulk(
        &self,
        endpoint: u8,
        buffer: &mut [u8],
        timeout: Duration,
    ) -> Result<usize, rusb::Error>;
}
