//! [`Session`] is the main interface for talking to a CDC-ACM device.  Its use is preferred over direct use of [`Device`].
//!
//! A Session owns its [`Device`] and moves through
//! [`SessionState::Uninitialized`] → [`SessionState::Claimed`] →
//! [`SessionState::Configured`] → [`SessionState::Streaming`] →
//! [`SessionState::Closed`].  Each step is gated on the previous one
//! succeeding and a Session never goes back to an earlier state.  Interfaces
//! it claimed are released when it is closed or dropped, whichever path got
//! it there.
use crate::constants::*;
use crate::line::{ControlLineState, ControlRequest, LineCoding};
use crate::shutdown::Shutdown;
use crate::{Device, Error};

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};
use rusb::constants::LIBUSB_ENDPOINT_IN;
use std::fmt;
use std::io::Write;
use std::time::Duration;

/// Tracks how far a [`Session`] has got
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Device open, no interfaces claimed
    #[default]
    Uninitialized,
    /// Kernel drivers detached and both interfaces claimed
    Claimed,
    /// Control line state and line coding set
    Configured,
    /// Transfer loop running, or finished
    Streaming,
    /// Interfaces released
    Closed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SessionState::Uninitialized => "uninitialized",
            SessionState::Claimed => "claimed",
            SessionState::Configured => "configured",
            SessionState::Streaming => "streaming",
            SessionState::Closed => "closed",
        };
        write!(f, "{s}")
    }
}

/// Everything a [`Session`] needs to know about the device and the line.
///
/// Use [`SessionBuilder`] to create one.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub line_coding: LineCoding,
    pub line_state: ControlLineState,
    pub in_endpoint: u8,
    pub out_endpoint: u8,
    pub probe_byte: u8,
    pub read_timeout: Duration,
    pub write_timeout: Duration,
    pub control_timeout: Duration,
    pub interval: Duration,
    pub reattach_kernel_driver: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            line_coding: LineCoding::default(),
            line_state: ControlLineState::default(),
            in_endpoint: BULK_IN_ENDPOINT,
            out_endpoint: BULK_OUT_ENDPOINT,
            probe_byte: DEFAULT_PROBE_BYTE,
            read_timeout: DEFAULT_READ_TIMEOUT,
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            control_timeout: DEFAULT_CONTROL_TIMEOUT,
            interval: DEFAULT_INTERVAL,
            reattach_kernel_driver: false,
        }
    }
}

/// A builder pattern for creating [`Session`] instances with custom
/// configuration.
///
/// # Example
///
/// ```no_run
/// use cdc_acm::{Device, SessionBuilder, UsbDevice, UsbDeviceConfig};
/// use std::time::Duration;
///
/// let device = UsbDevice::open(UsbDeviceConfig::new(3)).unwrap();
/// let session = SessionBuilder::new()
///     .line_coding("9600-8N1".parse().unwrap())
///     .interval(Duration::from_millis(500))
///     .build(device)
///     .unwrap();
/// ```
#[derive(Debug, Clone, Default)]
pub struct SessionBuilder {
    config: SessionConfig,
}

impl SessionBuilder {
    /// Creates a new [`SessionBuilder`] using the defaults in
    /// [`crate::constants`]: 115200-8N1, DTR and RTS asserted, endpoints
    /// 0x82/0x02, a 1s read timeout and a 1s interval.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn line_coding(&mut self, line_coding: LineCoding) -> &mut Self {
        self.config.line_coding = line_coding;
        self
    }

    pub fn line_state(&mut self, line_state: ControlLineState) -> &mut Self {
        self.config.line_state = line_state;
        self
    }

    /// Sets the bulk IN and OUT endpoint addresses
    pub fn endpoints(&mut self, in_endpoint: u8, out_endpoint: u8) -> &mut Self {
        self.config.in_endpoint = in_endpoint;
        self.config.out_endpoint = out_endpoint;
        self
    }

    /// Sets the byte written to the device on each loop iteration
    pub fn probe_byte(&mut self, byte: u8) -> &mut Self {
        self.config.probe_byte = byte;
        self
    }

    pub fn read_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.config.read_timeout = timeout;
        self
    }

    /// Sets the pause between loop iterations
    pub fn interval(&mut self, interval: Duration) -> &mut Self {
        self.config.interval = interval;
        self
    }

    /// Re-attach kernel drivers this session detached, once it closes
    pub fn reattach_kernel_driver(&mut self, reattach: bool) -> &mut Self {
        self.config.reattach_kernel_driver = reattach;
        self
    }

    /// The configuration built so far
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Builds a [`Session`] around `device`.
    ///
    /// # Returns
    /// * `Ok(Session)` - the new session, in [`SessionState::Uninitialized`]
    /// * `Err(Error::Args)` - if an endpoint address has the wrong direction
    pub fn build<D: Device>(&self, device: D) -> Result<Session<D>, Error> {
        trace!("SessionBuilder::build");
        let config = self.config.clone();
        if config.in_endpoint & LIBUSB_ENDPOINT_IN == 0 {
            return Err(Error::Args {
                message: format!(
                    "Endpoint 0x{:02x} is not an IN endpoint",
                    config.in_endpoint
                ),
            });
        }
        if config.out_endpoint & LIBUSB_ENDPOINT_IN != 0 {
            return Err(Error::Args {
                message: format!(
                    "Endpoint 0x{:02x} is not an OUT endpoint",
                    config.out_endpoint
                ),
            });
        }
        Ok(Session::new(device, config))
    }
}

/// Counters from a [`Session::stream`] run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StreamStats {
    pub iterations: u64,
    pub bytes_received: u64,
    pub timeouts: u64,
    pub write_errors: u64,
    pub read_errors: u64,
}

/// The [`Session`] struct drives a CDC-ACM device through acquisition,
/// configuration and the transfer loop.
/// * acquire (detach kernel drivers, claim the control and data interfaces)
/// * configure (set DTR/RTS and the line coding)
/// * stream (write a byte, read the response, repeat until shutdown)
/// * close (release interfaces)
///
/// Use [`SessionBuilder`] to create a new [`Session`] instance, or [`run`]
/// to do all of the above in one go.
#[derive(Debug)]
pub struct Session<D: Device> {
    device: D,
    config: SessionConfig,
    state: SessionState,
    claimed: Vec<u8>,
    detached: Vec<u8>,
}

/// Public [`Session`] functions
impl<D: Device> Session<D> {
    /// Creates a new session.  Prefer [`SessionBuilder`], which validates
    /// the config.
    #[must_use]
    pub fn new(device: D, config: SessionConfig) -> Self {
        trace!("Session::new");
        Session {
            device,
            config,
            state: SessionState::default(),
            claimed: Vec::new(),
            detached: Vec::new(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Detaches any kernel driver from, and claims, the CDC-ACM control and
    /// data interfaces.
    ///
    /// Failing to query or detach a kernel driver is logged and otherwise
    /// ignored - the claim that follows is what decides success.
    ///
    /// # Returns
    /// * `Ok(())` - both interfaces claimed, session is [`SessionState::Claimed`]
    /// * `Err(Error::Claim)` - an interface couldn't be claimed.  Later
    ///   interfaces are not touched.
    /// * `Err(Error::State)` - session was not [`SessionState::Uninitialized`]
    pub fn acquire(&mut self) -> Result<(), Error> {
        trace!("Session::acquire");
        self.check_state(SessionState::Uninitialized)?;

        for interface in ACM_INTERFACES {
            match self.device.kernel_driver_active(interface) {
                Ok(true) => {
                    debug!("Kernel driver active on interface {interface}, detaching");
                    match self.device.detach_kernel_driver(interface) {
                        Ok(()) => self.detached.push(interface),
                        Err(e) => warn!(
                            "Failed to detach kernel driver from interface {interface}: {e}"
                        ),
                    }
                }
                Ok(false) => debug!("No kernel driver active on interface {interface}"),
                Err(e) => debug!("Couldn't query kernel driver on interface {interface}: {e}"),
            }

            self.device.claim_interface(interface).map_err(|e| {
                error!("Error claiming interface {interface}: {e}");
                Error::Claim {
                    interface,
                    source: e.into(),
                }
            })?;
            debug!("Claimed interface {interface}");
            self.claimed.push(interface);
        }

        self.state = SessionState::Claimed;
        info!("Claimed interfaces {:?}", self.claimed);
        Ok(())
    }

    /// Sets the control line state (DTR/RTS) and then the line coding.
    ///
    /// # Returns
    /// * `Ok(())` - session is [`SessionState::Configured`]
    /// * `Err(Error::Control)` - a control transfer failed.  If the line state
    ///   fails the line coding is not sent.
    /// * `Err(Error::State)` - session was not [`SessionState::Claimed`]
    pub fn configure(&mut self) -> Result<(), Error> {
        trace!("Session::configure");
        self.check_state(SessionState::Claimed)?;

        let line_state = self.config.line_state.value();
        debug!("Set control line state 0x{line_state:02x}");
        self.control(ControlRequest::SetControlLineState, line_state, &[])?;

        let coding = self.config.line_coding;
        debug!("Set line coding {coding}");
        self.control(ControlRequest::SetLineCoding, 0, &coding.to_bytes())?;

        self.state = SessionState::Configured;
        info!("Configured line {coding}");
        Ok(())
    }

    /// Writes a single byte to the OUT endpoint
    pub fn write_char(&self, byte: u8) -> Result<usize, Error> {
        trace!("Session::write_char 0x{byte:02x}");
        let endpoint = self.config.out_endpoint;
        self.device
            .write_bulk(endpoint, &[byte], self.config.write_timeout)
            .map_err(|e| Error::Transfer {
                endpoint,
                source: e.into(),
            })
    }

    /// Reads up to `buffer.len()` bytes from the IN endpoint, waiting up to
    /// the configured read timeout.
    ///
    /// # Returns
    /// * `Ok(usize)` - number of bytes read into `buffer`
    /// * `Err(Error::Transfer)` - on failure, including timeout
    pub fn read_chars(&self, buffer: &mut [u8]) -> Result<usize, Error> {
        trace!("Session::read_chars buffer.len() {}", buffer.len());
        let endpoint = self.config.in_endpoint;
        self.device
            .read_bulk(endpoint, buffer, self.config.read_timeout)
            .map_err(|e| Error::Transfer {
                endpoint,
                source: e.into(),
            })
    }

    /// Runs the transfer loop until `shutdown` is triggered.
    ///
    /// Each iteration writes the probe byte, reads up to
    /// [`READ_BUF_SIZE`] bytes and writes `Received: "<data>"` to `out`, then
    /// waits for the interval.  A read timeout writes `timeout` to `out`.
    /// rusb reports a timeout without the partial length, so any bytes that
    /// arrived during a read that then timed out are dropped unreported.
    /// Transfer failures are logged and the loop carries on.
    ///
    /// Shutdown is only noticed between transfers.  With the default
    /// zero write timeout a device that never drains the OUT endpoint blocks
    /// the loop until a second signal forces exit, see [`Shutdown`].
    ///
    /// # Returns
    /// * `Ok(StreamStats)` - once shutdown is triggered
    /// * `Err(Error::Output)` - if writing to `out` failed
    /// * `Err(Error::State)` - session was not [`SessionState::Configured`]
    pub fn stream<W: Write>(
        &mut self,
        shutdown: &Shutdown,
        out: &mut W,
    ) -> Result<StreamStats, Error> {
        trace!("Session::stream");
        self.check_state(SessionState::Configured)?;
        self.state = SessionState::Streaming;
        info!("Streaming");

        let mut stats = StreamStats::default();
        let mut buf = [0u8; READ_BUF_SIZE];
        while !shutdown.is_triggered() {
            self.iteration(&mut buf, out, &mut stats)?;
            if shutdown.wait(self.config.interval) {
                break;
            }
        }

        info!("Stopped streaming after {} iterations", stats.iterations);
        debug!("{stats:?}");
        Ok(stats)
    }

    /// Releases all claimed interfaces and moves to [`SessionState::Closed`].
    /// The device handle is closed when the session is dropped.
    pub fn close(mut self) {
        trace!("Session::close");
        self.release();
    }
}

/// Private [`Session`] functions
impl<D: Device> Session<D> {
    fn check_state(&self, expected: SessionState) -> Result<(), Error> {
        if self.state != expected {
            warn!("Session is {}, expected {}", self.state, expected);
            return Err(Error::State {
                expected,
                actual: self.state,
            });
        }
        Ok(())
    }

    fn control(&self, request: ControlRequest, value: u16, data: &[u8]) -> Result<(), Error> {
        let index = CONTROL_INTERFACE as u16;
        self.device
            .write_control(
                ACM_REQUEST_TYPE,
                request.code(),
                value,
                index,
                data,
                self.config.control_timeout,
            )
            .map(|_| ())
            .map_err(|e| {
                error!("Error during control transfer {request}: {e}");
                Error::Control {
                    request,
                    source: e.into(),
                }
            })
    }

    // One write, one read, and the resulting output
    fn iteration<W: Write>(
        &self,
        buf: &mut [u8],
        out: &mut W,
        stats: &mut StreamStats,
    ) -> Result<(), Error> {
        stats.iterations += 1;

        if let Err(e) = self.write_char(self.config.probe_byte) {
            error!("Error while sending char: {e}");
            stats.write_errors += 1;
        }

        match self.read_chars(buf) {
            Ok(len) => {
                stats.bytes_received += len as u64;
                writeln!(out, "Received: \"{}\"", String::from_utf8_lossy(&buf[..len]))?;
            }
            Err(e) if e.usb_error() == Some(rusb::Error::Timeout) => {
                debug!("Read timed out after {:?}", self.config.read_timeout);
                stats.timeouts += 1;
                writeln!(out, "timeout")?;
            }
            Err(e) => {
                error!("Error while waiting for char: {e}");
                stats.read_errors += 1;
            }
        }
        out.flush()?;
        Ok(())
    }

    fn release(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }

        // Release in reverse order, ignoring errors
        while let Some(interface) = self.claimed.pop() {
            match self.device.release_interface(interface) {
                Ok(()) => debug!("Released interface {interface}"),
                Err(e) => warn!("Failed to release interface {interface}: {e}"),
            }
        }

        if self.config.reattach_kernel_driver {
            while let Some(interface) = self.detached.pop() {
                match self.device.attach_kernel_driver(interface) {
                    Ok(()) => debug!("Re-attached kernel driver to interface {interface}"),
                    Err(e) => {
                        warn!("Failed to re-attach kernel driver to interface {interface}: {e}")
                    }
                }
            }
        }

        self.state = SessionState::Closed;
        info!("Session closed");
    }
}

impl<D: Device> Drop for Session<D> {
    fn drop(&mut self) {
        trace!("Session::drop");
        self.release();
    }
}

/// Builds a [`Session`] around an already opened `device`, acquires the
/// interfaces, configures the line, streams until `shutdown` and closes the
/// session.
///
/// Any error ends the run; interfaces claimed so far are released on the way
/// out.
///
/// # Example
///
/// ```no_run
/// use cdc_acm::{run, Device, SessionBuilder, Shutdown, UsbDevice, UsbDeviceConfig};
///
/// let device = UsbDevice::open(UsbDeviceConfig::new(3)).unwrap();
/// let shutdown = Shutdown::new();
/// shutdown.install_handler().unwrap();
/// let stats = run(device, &SessionBuilder::new(), &shutdown, &mut std::io::stdout()).unwrap();
/// println!("{stats:?}");
/// ```
pub fn run<D: Device, W: Write>(
    device: D,
    builder: &SessionBuilder,
    shutdown: &Shutdown,
    out: &mut W,
) -> Result<StreamStats, Error> {
    trace!("run");
    let mut session = builder.build(device)?;
    session.acquire()?;
    session.configure()?;
    let stats = session.stream(shutdown, out)?;
    session.close();
    Ok(stats)
}
