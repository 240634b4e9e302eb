//! Scripted in-memory transport.
//!
//! Reads are served from a queue of steps. Each `Data` step is delivered by
//! one or more reads (never merged with the next step), which gives tests
//! exact control over how a byte stream is partitioned across reads. An
//! empty queue behaves like a serial read timeout.

use std::collections::VecDeque;
use std::io;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::error::{Result, TransportError};
use crate::traits::Transport;

/// One scripted read outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadStep {
    /// Bytes returned by the next read(s).
    Data(Vec<u8>),
    /// The next read fails with this error kind.
    Fail(io::ErrorKind),
}

#[derive(Debug, Default)]
struct MockState {
    open: bool,
    reads: VecDeque<ReadStep>,
    written: Vec<Vec<u8>>,
    read_calls: usize,
    write_calls: usize,
    open_calls: usize,
    close_calls: usize,
    open_failures: usize,
    open_reports_closed: bool,
    fail_writes: bool,
}

/// In-memory [`Transport`] with scripted reads and captured writes.
#[derive(Debug)]
pub struct MockTransport {
    state: Mutex<MockState>,
    idle_delay: Duration,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    /// A closed transport with nothing scripted.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState::default()),
            idle_delay: Duration::from_millis(1),
        }
    }

    /// An already-open transport.
    pub fn opened() -> Self {
        let mock = Self::new();
        mock.state().open = true;
        mock
    }

    /// Queue bytes to be returned by the next read(s).
    pub fn push_read(&self, bytes: impl Into<Vec<u8>>) {
        self.state().reads.push_back(ReadStep::Data(bytes.into()));
    }

    /// Queue a read failure.
    pub fn push_failure(&self, kind: io::ErrorKind) {
        self.state().reads.push_back(ReadStep::Fail(kind));
    }

    /// Make the next `count` calls to `open` fail.
    pub fn fail_next_opens(&self, count: usize) {
        self.state().open_failures = count;
    }

    /// Let `open` return `Ok` while the port stays closed.
    pub fn open_reports_closed(&self, closed: bool) {
        self.state().open_reports_closed = closed;
    }

    /// Make every write fail (or succeed again).
    pub fn fail_writes(&self, fail: bool) {
        self.state().fail_writes = fail;
    }

    /// Every buffer passed to `write`, in order.
    pub fn written(&self) -> Vec<Vec<u8>> {
        self.state().written.clone()
    }

    pub fn read_calls(&self) -> usize {
        self.state().read_calls
    }

    pub fn write_calls(&self) -> usize {
        self.state().write_calls
    }

    pub fn open_calls(&self) -> usize {
        self.state().open_calls
    }

    pub fn close_calls(&self) -> usize {
        self.state().close_calls
    }

    /// Number of scripted read steps not yet consumed.
    pub fn pending_reads(&self) -> usize {
        self.state().reads.len()
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Transport for MockTransport {
    fn open(&self) -> Result<()> {
        let mut state = self.state();
        state.open_calls += 1;
        if state.open_failures > 0 {
            state.open_failures -= 1;
            state.open = false;
            return Err(TransportError::Open {
                port: "mock".to_string(),
                source: serialport::Error::new(
                    serialport::ErrorKind::NoDevice,
                    "scripted open failure",
                ),
            });
        }
        state.open = !state.open_reports_closed;
        Ok(())
    }

    fn close(&self) {
        let mut state = self.state();
        state.close_calls += 1;
        state.open = false;
    }

    fn is_open(&self) -> bool {
        self.state().open
    }

    fn read(&self, buf: &mut [u8]) -> Result<usize> {
        let step = {
            let mut state = self.state();
            state.read_calls += 1;
            if !state.open {
                return Err(TransportError::NotOpen);
            }
            state.reads.pop_front()
        };

        match step {
            Some(ReadStep::Data(mut bytes)) => {
                let n = bytes.len().min(buf.len());
                buf[..n].copy_from_slice(&bytes[..n]);
                if n < bytes.len() {
                    let rest = bytes.split_off(n);
                    self.state().reads.push_front(ReadStep::Data(rest));
                }
                Ok(n)
            }
            Some(ReadStep::Fail(kind)) => Err(TransportError::Io(io::Error::from(kind))),
            None => {
                std::thread::sleep(self.idle_delay);
                Err(TransportError::Io(io::Error::from(io::ErrorKind::TimedOut)))
            }
        }
    }

    fn write(&self, data: &[u8]) -> Result<()> {
        let mut state = self.state();
        state.write_calls += 1;
        if !state.open {
            return Err(TransportError::NotOpen);
        }
        if state.fail_writes {
            return Err(TransportError::Io(io::Error::from(io::ErrorKind::BrokenPipe)));
        }
        state.written.push(data.to_vec());
        Ok(())
    }

    fn name(&self) -> &str {
        "mock"
    }
}
