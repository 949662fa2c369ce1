//! A recording [`Device`] used by the unit tests.
//!
//! Every call is appended to a shared [`CallLog`], and responses come from a
//! [`MockScript`] so tests can inject failures.
use crate::{Device, Error};

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    KernelDriverActive(u8),
    DetachKernelDriver(u8),
    AttachKernelDriver(u8),
    ClaimInterface(u8),
    ReleaseInterface(u8),
    WriteControl {
        request_type: u8,
        request: u8,
        value: u16,
        index: u16,
        data: Vec<u8>,
        timeout: Duration,
    },
    WriteBulk {
        endpoint: u8,
        data: Vec<u8>,
        timeout: Duration,
    },
    ReadBulk {
        endpoint: u8,
        len: usize,
        timeout: Duration,
    },
}

pub type CallLog = Arc<Mutex<Vec<Call>>>;

/// A read response returned by the mock's `read_bulk`
pub type ReadResult = Result<Vec<u8>, rusb::Error>;

/// Called after each bulk read with the number of reads so far
pub type ReadHook = Box<dyn Fn(usize)>;

#[derive(Default)]
pub struct MockScript {
    pub kernel_driver_active: Vec<u8>,
    pub fail_kernel_driver_query: Option<rusb::Error>,
    pub fail_detach: Option<rusb::Error>,
    pub fail_claim: Option<(u8, rusb::Error)>,
    pub fail_control: Option<(u8, rusb::Error)>,
    pub write_results: VecDeque<Result<usize, rusb::Error>>,
    pub read_results: VecDeque<ReadResult>,
    pub after_read: Option<ReadHook>,
}

impl std::fmt::Debug for MockScript {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockScript")
            .field("read_results", &self.read_results)
            .finish_non_exhaustive()
    }
}

pub struct MockConfig {
    pub log: CallLog,
    pub script: MockScript,
}

#[derive(Debug)]
pub struct MockDevice {
    log: CallLog,
    script: Mutex<MockScript>,
    reads: Mutex<usize>,
}

impl MockDevice {
    /// Opens a mock with `script`, returning it and its call log
    pub fn with_script(script: MockScript) -> (Result<Self, Error>, CallLog) {
        let log = CallLog::default();
        let device = Self::open(MockConfig {
            log: log.clone(),
            script,
        });
        (device, log)
    }

    fn record(&self, call: Call) {
        self.log.lock().push(call);
    }
}

impl Device for MockDevice {
    type Config = MockConfig;

    fn open(config: Self::Config) -> Result<Self, Error> {
        Ok(MockDevice {
            log: config.log,
            script: Mutex::new(config.script),
            reads: Mutex::new(0),
        })
    }

    fn kernel_driver_active(&self, interface: u8) -> Result<bool, rusb::Error> {
        self.record(Call::KernelDriverActive(interface));
        let script = self.script.lock();
        match script.fail_kernel_driver_query {
            Some(e) => Err(e),
            None => Ok(script.kernel_driver_active.contains(&interface)),
        }
    }

    fn detach_kernel_driver(&self, interface: u8) -> Result<(), rusb::Error> {
        self.record(Call::DetachKernelDriver(interface));
        self.script.lock().fail_detach.map_or(Ok(()), Err)
    }

    fn attach_kernel_driver(&self, interface: u8) -> Result<(), rusb::Error> {
        self.record(Call::AttachKernelDriver(interface));
        Ok(())
    }

    fn claim_interface(&self, interface: u8) -> Result<(), rusb::Error> {
        self.record(Call::ClaimInterface(interface));
        match self.script.lock().fail_claim {
            Some((iface, e)) if iface == interface => Err(e),
            _ => Ok(()),
        }
    }

    fn release_interface(&self, interface: u8) -> Result<(), rusb::Error> {
        self.record(Call::ReleaseInterface(interface));
        Ok(())
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
        self.record(Call::WriteControl {
            request_type,
            request,
            value,
            index,
            data: data.to_vec(),
            timeout,
        });
        match self.script.lock().fail_control {
            Some((req, e)) if req == request => Err(e),
            _ => Ok(data.len()),
        }
    }

    fn write_bulk(
        &self,
        endpoint: u8,
        data: &[u8],
        timeout: Duration,
    ) -> Result<usize, rusb::Error> {
        self.record(Call::WriteBulk {
            endpoint,
            data: data.to_vec(),
            timeout,
        });
        self.script
            .lock()
            .write_results
            .pop_front()
            .unwrap_or(Ok(data.len()))
    }

    fn read_bulk(
        &self,
        endpoint: u8,
        buffer: &mut [u8],
        timeout: Duration,
    ) -> Result<usize, rusb::Error> {
        self.record(Call::ReadBulk {
            endpoint,
            len: buffer.len(),
            timeout,
        });
        let mut script = self.script.lock();
        let result = script
            .read_results
            .pop_front()
            .unwrap_or(Err(rusb::Error::Timeout))
            .map(|data| {
                let len = data.len().min(buffer.len());
                buffer[..len].copy_from_slice(&data[..len]);
                len
            });

        let reads = {
            let mut reads = self.reads.lock();
            *reads += 1;
            *reads
        };
        if let Some(hook) = &script.after_read {
            hook(reads);
        }
        result
    }
}
