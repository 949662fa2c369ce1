//! Constants used in the CDC-ACM implementation
use rusb::constants::{
    LIBUSB_ENDPOINT_IN, LIBUSB_ENDPOINT_OUT, LIBUSB_RECIPIENT_INTERFACE, LIBUSB_REQUEST_TYPE_CLASS,
};
use std::time::Duration;

/// CDC-ACM interfaces

/// Communications (control) interface number
pub const CONTROL_INTERFACE: u8 = 0;
/// Data interface number
pub const DATA_INTERFACE: u8 = 1;
/// Interfaces claimed by a session, in claim order
pub const ACM_INTERFACES: [u8; 2] = [CONTROL_INTERFACE, DATA_INTERFACE];

/// Class requests

/// Host-to-device, class request, interface recipient (0x21)
pub const ACM_REQUEST_TYPE: u8 =
    LIBUSB_ENDPOINT_OUT | LIBUSB_REQUEST_TYPE_CLASS | LIBUSB_RECIPIENT_INTERFACE;
/// SET_LINE_CODING class request
pub const SET_LINE_CODING: u8 = 0x20;
/// SET_CONTROL_LINE_STATE class request
pub const SET_CONTROL_LINE_STATE: u8 = 0x22;

/// Control line state bits

/// Data Terminal Ready
pub const ACM_CTRL_DTR: u16 = 0x01;
/// Request To Send
pub const ACM_CTRL_RTS: u16 = 0x02;

/// Line coding

/// Size of the SET_LINE_CODING payload
pub const LINE_CODING_SIZE: usize = 7;
/// Baud rate used when none is configured
pub const DEFAULT_BAUD_RATE: u32 = 115_200;
/// Data bits used when none are configured
pub const DEFAULT_DATA_BITS: u8 = 8;

/// Endpoints.  These are device specific - check `lsusb -v` for yours.

/// The device's bulk in endpoint is used to read data
pub const BULK_IN_ENDPOINT: u8 = 2 | LIBUSB_ENDPOINT_IN;
/// The device's bulk out endpoint is used to write data
pub const BULK_OUT_ENDPOINT: u8 = 2 | LIBUSB_ENDPOINT_OUT;

/// Timeouts.  A zero duration means wait forever.

/// Used to wait for the device to respond to a control message
pub const DEFAULT_CONTROL_TIMEOUT: Duration = Duration::ZERO;
/// Used to wait for the device to accept a write
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::ZERO;
/// Used to wait for the device to send data
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(1000);
/// Pause between transfer loop iterations
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(1);
/// Granularity used when waiting for the interval to elapse, so a shutdown
/// request is noticed promptly
pub const SHUTDOWN_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Transfer loop

/// Maximum number of bytes requested per bulk read
pub const READ_BUF_SIZE: usize = 64;
/// Byte sent to the device on each iteration
pub const DEFAULT_PROBE_BYTE: u8 = b't';

/// Process exit codes

/// Exit code used for usage errors and other non-USB failures
pub const EXIT_FAILURE: i32 = 1;
/// Exit code used after a clean shutdown
pub const EXIT_SUCCESS: i32 = 0;
/// Exit code used when a second signal forces exit (128 + SIGINT)
pub const EXIT_INTERRUPTED: i32 = 130;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_constants() {
        assert_eq!(ACM_REQUEST_TYPE, 0x21);
        assert_eq!(BULK_IN_ENDPOINT, 0x82);
        assert_eq!(BULK_OUT_ENDPOINT, 0x02);
        assert_eq!(ACM_CTRL_DTR | ACM_CTRL_RTS, 0x03);
    }
}
