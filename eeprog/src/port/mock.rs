//! Scripted port for unit tests.

use std::collections::VecDeque;
use std::io::{self, Read, Write};

use crate::error::Result;
use crate::port::Port;

/// What the next `read` call returns.
#[derive(Debug)]
pub(crate) enum ReadEvent {
    /// Bytes available; handed out at most `buf.len()` at a time.
    Data(Vec<u8>),
    /// Driver-level timeout.
    Timeout,
    /// Zero-length read.
    Empty,
    /// Hard I/O failure.
    Fail(io::ErrorKind),
}

/// What the next `write` call does.
#[derive(Debug, Clone, Copy)]
pub(crate) enum WriteEvent {
    /// Accept nothing.
    Zero,
    /// Hard I/O failure.
    Fail(io::ErrorKind),
}

/// Port that replays queued reads and records every write.
pub(crate) struct MockPort {
    reads: VecDeque<ReadEvent>,
    write_faults: VecDeque<Option<WriteEvent>>,
    writes: Vec<Vec<u8>>,
    read_sizes: Vec<usize>,
    closed: bool,
}

/// Route library logs to the test harness; `RUST_LOG=trace` shows frames.
pub(crate) fn init_test_logging() {
    let _ = env_logger::builder()
        .is_test(true)
        .try_init();
}

impl MockPort {
    pub(crate) fn new() -> Self {
        init_test_logging();
        Self {
            reads: VecDeque::new(),
            write_faults: VecDeque::new(),
            writes: Vec::new(),
            read_sizes: Vec::new(),
            closed: false,
        }
    }

    /// Queue a chunk of reply bytes.
    pub(crate) fn reply(&mut self, data: &[u8]) -> &mut Self {
        self.reads
            .push_back(ReadEvent::Data(data.to_vec()));
        self
    }

    /// Queue an arbitrary read event.
    pub(crate) fn push_read(&mut self, event: ReadEvent) -> &mut Self {
        self.reads
            .push_back(event);
        self
    }

    /// Let the next `skip` writes succeed, then apply `event` once.
    pub(crate) fn fail_write_after(&mut self, skip: usize, event: WriteEvent) -> &mut Self {
        for _ in 0..skip {
            self.write_faults
                .push_back(None);
        }
        self.write_faults
            .push_back(Some(event));
        self
    }

    /// Every successful write, in order.
    pub(crate) fn writes(&self) -> &[Vec<u8>] {
        &self.writes
    }

    /// Buffer sizes passed to each `read` call.
    pub(crate) fn read_sizes(&self) -> &[usize] {
        &self.read_sizes
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Read for MockPort {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.read_sizes
            .push(buf.len());
        match self
            .reads
            .pop_front()
        {
            Some(ReadEvent::Data(mut data)) => {
                let n = data
                    .len()
                    .min(buf.len());
                buf[..n].copy_from_slice(&data[..n]);
                if n < data.len() {
                    let rest = data.split_off(n);
                    self.reads
                        .push_front(ReadEvent::Data(rest));
                }
                Ok(n)
            },
            Some(ReadEvent::Empty) => Ok(0),
            Some(ReadEvent::Fail(kind)) => Err(io::Error::new(kind, "mock read failure")),
            Some(ReadEvent::Timeout) | None => {
                Err(io::Error::new(io::ErrorKind::TimedOut, "mock timeout"))
            },
        }
    }
}

impl Write for MockPort {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self
            .write_faults
            .pop_front()
            .flatten()
        {
            Some(WriteEvent::Zero) => Ok(0),
            Some(WriteEvent::Fail(kind)) => Err(io::Error::new(kind, "mock write failure")),
            None => {
                self.writes
                    .push(buf.to_vec());
                Ok(buf.len())
            },
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Port for MockPort {
    fn name(&self) -> &str {
        "mock"
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}
