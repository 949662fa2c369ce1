use crate::Device;
use crate::Error::{self, *};

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};
use rusb::DeviceHandle as RusbDeviceHandle;
use rusb::{Context, UsbContext};
use std::os::fd::RawFd;
use std::time::Duration;

/// UsbDevice represents a physical CDC-ACM device, reached through a file
/// descriptor that something else already opened.
///
/// On Android (for example via `termux-usb`) the process can't enumerate or
/// open USB devices itself.  A privileged component opens the device node,
/// grants access, and passes the fd in.  [`UsbDevice::open`] wraps that fd
/// with libusb.
///
/// Dropping the UsbDevice closes the handle.  Releasing claimed interfaces
/// is the job of [`crate::Session`], which tracks what it claimed.
#[derive(Debug)]
pub struct UsbDevice {
    handle: RusbDeviceHandle<Context>,
    usb_info: Option<UsbInfo>,
}

#[derive(Debug)]
pub struct UsbDeviceConfig {
    /// The already-open file descriptor of the USB device
    pub fd: RawFd,

    /// The [`rusb::Context`] to use for this device.  May be None to create
    /// a new context.
    pub context: Option<Context>,

    /// Disable libusb device discovery before creating the context.  Needed
    /// where the process has no access to the USB device nodes, such as
    /// Android.  Ignored if `context` is provided.
    pub weak_authority: bool,
}

impl UsbDeviceConfig {
    /// Config for `fd`, with weak authority
    pub fn new(fd: RawFd) -> Self {
        UsbDeviceConfig {
            fd,
            context: None,
            weak_authority: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UsbInfo {
    pub vendor_id: u16,
    pub product_id: u16,
    pub bus_number: u8,
    pub device_address: u8,
}

/// Public Device functions
impl Device for UsbDevice {
    type Config = UsbDeviceConfig;

    fn open(config: Self::Config) -> Result<Self, Error> {
        trace!("Device::open config {config:?}");

        // Create the rusb:Context if we weren't provided one
        let context = match config.context {
            Some(ctx) => ctx,
            None => {
                if config.weak_authority {
                    debug!("Disable libusb device discovery");
                    rusb::disable_device_discovery().map_err(|e| Init { source: e.into() })?;
                }
                Context::new().map_err(|e| Init { source: e.into() })?
            }
        };

        // Safety: the fd is owned by whoever handed it to us and stays open
        // for the life of the process.  libusb doesn't close it.
        let handle = unsafe { context.open_device_with_fd(config.fd) }.map_err(|e| {
            warn!("Failed to wrap file descriptor {}: {}", config.fd, e);
            Wrap {
                fd: config.fd,
                source: e.into(),
            }
        })?;
        debug!("Wrapped file descriptor {}", config.fd);

        let usb_info = Self::read_usb_info(&handle);
        Ok(Self { handle, usb_info })
    }

    fn kernel_driver_active(&self, interface: u8) -> Result<bool, rusb::Error> {
        trace!("Device::kernel_driver_active interface {interface}");
        self.handle.kernel_driver_active(interface)
    }

    fn detach_kernel_driver(&self, interface: u8) -> Result<(), rusb::Error> {
        trace!("Device::detach_kernel_driver interface {interface}");
        self.handle.detach_kernel_driver(interface)
    }

    fn attach_kernel_driver(&self, interface: u8) -> Result<(), rusb::Error> {
        trace!("Device::attach_kernel_driver interface {interface}");
        self.handle.attach_kernel_driver(interface)
    }

    fn claim_interface(&self, interface: u8) -> Result<(), rusb::Error> {
        trace!("Device::claim_interface interface {interface}");
        self.handle.claim_interface(interface)
    }

    fn release_interface(&self, interface: u8) -> Result<(), rusb::Error> {
        trace!("Device::release_interface interface {interface}");
        self.handle.release_interface(interface)
    }

    fn write_control(
        &self,
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        data: &[u8],
        timeout: Duration,
    ) -> Result<usize, rusb::Error> {
        trace!(
            "Device::write_control request_type 0x{request_type:02x} request 0x{request:02x} value 0x{value:04x} index {index} data.len() {}",
            data.len()
        );
        self.handle
            .write_control(request_type, request, value, index, data, timeout)
    }

    fn write_bulk(
        &self,
        endpoint: u8,
        data: &[u8],
        timeout: Duration,
    ) -> Result<usize, rusb::Error> {
        trace!(
            "Device::write_bulk endpoint 0x{endpoint:02x} data.len() {}",
            data.len()
        );
        self.handle.write_bulk(endpoint, data, timeout)
    }

    fn read_bulk(
        &self,
        endpoint: u8,
        buffer: &mut [u8],
        timeout: Duration,
    ) -> Result<usize, rusb::Error> {
        trace!(
            "Device::read_bulk endpoint 0x{endpoint:02x} buffer.len() {}",
            buffer.len()
        );
        self.handle.read_bulk(endpoint, buffer, timeout)
    }
}

impl UsbDevice {
    /// Bus and descriptor details of the wrapped device, if they could be
    /// read
    pub fn usb_info(&self) -> Option<&UsbInfo> {
        self.usb_info.as_ref()
    }

    fn read_usb_info(handle: &RusbDeviceHandle<Context>) -> Option<UsbInfo> {
        trace!("Device::read_usb_info");
        let device = handle.device();
        match device.device_descriptor() {
            Ok(desc) => Some(UsbInfo {
                vendor_id: desc.vendor_id(),
                product_id: desc.product_id(),
                bus_number: device.bus_number(),
                device_address: device.address(),
            }),
            Err(e) => {
                // Not needed for anything other than logging
                debug!("Couldn't read device descriptor: {}", e);
                None
            }
        }
    }
}

impl Drop for UsbDevice {
    fn drop(&mut self) {
        trace!("Device::drop");
        // The handle is closed, and the context exited, when the rusb types
        // are dropped
        debug!("Closing USB device");
    }
}
