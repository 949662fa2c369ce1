//! Cancellation for the transfer loop.
//!
//! [`Shutdown`] is a cloneable flag.  The binary wires it to Ctrl-C and
//! SIGTERM with [`Shutdown::install_handler`], and [`crate::Session::stream`]
//! checks it between transfers, so the session can release its interfaces
//! and close the handle before the process exits.
//!
//! The flag is only seen once the in-flight transfer returns, and writes have
//! no timeout by default.  A second signal therefore exits the process
//! immediately, without releasing anything.
use crate::constants::{EXIT_INTERRUPTED, SHUTDOWN_POLL_INTERVAL};
use crate::Error;

#[allow(unused_imports)]
use log::{debug, error, info, trace, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::sleep;
use std::time::{Duration, Instant};

/// What the signal handler should do for a given signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalAction {
    /// First signal: stop the transfer loop after the current transfer
    Stop,
    /// Shutdown was already requested: exit now
    ForceExit,
}

#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    triggered: Arc<AtomicBool>,
}

impl Shutdown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs a process-wide Ctrl-C/SIGTERM handler which triggers this
    /// Shutdown.  A second signal exits the process with
    /// [`EXIT_INTERRUPTED`].  May only be called once per process.
    pub fn install_handler(&self) -> Result<(), Error> {
        trace!("Shutdown::install_handler");
        let shutdown = self.clone();
        ctrlc::set_handler(move || {
            if shutdown.signal() == SignalAction::ForceExit {
                std::process::exit(EXIT_INTERRUPTED);
            }
        })?;
        Ok(())
    }

    /// Records a shutdown signal, returning what the handler should do next
    pub fn signal(&self) -> SignalAction {
        if self.triggered.swap(true, Ordering::SeqCst) {
            warn!("Received second shutdown signal, exiting without cleanup");
            SignalAction::ForceExit
        } else {
            info!("Received shutdown signal");
            SignalAction::Stop
        }
    }

    /// Requests shutdown
    pub fn trigger(&self) {
        trace!("Shutdown::trigger");
        self.triggered.store(true, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }

    /// Sleeps for `duration`, waking early if shutdown is requested.
    ///
    /// # Returns
    /// * `true` - if shutdown was requested before or during the wait
    /// * `false` - if the full duration elapsed
    pub fn wait(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        loop {
            if self.is_triggered() {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            sleep(SHUTDOWN_POLL_INTERVAL.min(deadline - now));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn test_trigger_is_shared_between_clones() {
        let shutdown = Shutdown::new();
        let other = shutdown.clone();
        assert!(!shutdown.is_triggered());
        other.trigger();
        assert!(shutdown.is_triggered());
    }

    #[test]
    fn test_second_signal_forces_exit() {
        let shutdown = Shutdown::new();
        assert_eq!(shutdown.signal(), SignalAction::Stop);
        assert!(shutdown.is_triggered());
        assert_eq!(shutdown.signal(), SignalAction::ForceExit);
        assert_eq!(shutdown.signal(), SignalAction::ForceExit);
    }

    #[test]
    fn test_signal_after_trigger_forces_exit() {
        // e.g. the loop is already winding down when another signal arrives
        let shutdown = Shutdown::new();
        shutdown.clone().trigger();
        assert_eq!(shutdown.signal(), SignalAction::ForceExit);
    }

    #[test]
    fn test_wait_elapses_without_trigger() {
        let shutdown = Shutdown::new();
        assert!(!shutdown.wait(Duration::from_millis(10)));
        assert!(!shutdown.wait(Duration::ZERO));
    }

    #[test]
    fn test_wait_wakes_on_trigger() {
        let shutdown = Shutdown::new();
        let other = shutdown.clone();
        let start = Instant::now();
        let waker = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            other.trigger();
        });
        assert!(shutdown.wait(Duration::from_secs(30)));
        assert!(start.elapsed() < Duration::from_secs(10));
        waker.join().unwrap();
    }
}
