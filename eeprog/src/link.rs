//! Command round trips over the programmer link.
//!
//! A command is written as one frame, then the reply is drained in small
//! chunks until either the link goes quiet (zero-length read or driver
//! timeout) or the accumulated bytes end with a carriage return. The
//! trimmed reply must end with `OK`.

use std::io::{self, Read};

use log::{debug, trace};

use crate::error::{Error, Result};
use crate::port::Port;
use crate::protocol::{Command, Reply, is_terminated};

/// Read size used while draining a command reply.
pub const COMMAND_READ_CHUNK: usize = 16;

/// Owns an open port and speaks the command protocol over it.
pub struct Link<P: Port> {
    port: P,
}

impl<P: Port> Link<P> {
    /// Wrap an already opened port.
    pub fn new(port: P) -> Self {
        Self { port }
    }

    /// Get a reference to the underlying port.
    pub fn port(&self) -> &P {
        &self.port
    }

    /// Get a mutable reference to the underlying port.
    pub fn port_mut(&mut self) -> &mut P {
        &mut self.port
    }

    /// Consume the link and return the underlying port.
    pub fn into_port(self) -> P {
        self.port
    }

    /// Release the port.
    pub fn close(&mut self) -> Result<()> {
        self.port
            .close()
    }

    /// Send a command and wait for its acknowledgement.
    ///
    /// Returns the acknowledged reply; the reply never carries bulk data.
    pub fn send_command(&mut self, command: &Command) -> Result<Reply> {
        debug!("Sending {command}");
        let frame = command.build();

        if self.write_frame(&frame)? == 0 {
            return Err(Error::NoResponse);
        }

        let raw = self.read_reply(COMMAND_READ_CHUNK)?;
        let reply = Reply::from_raw(&raw);
        debug!("Receive {}", reply.text());

        if !reply.is_ack() {
            return Err(Error::InvalidResponse(reply.into_text()));
        }
        Ok(reply)
    }

    /// Write a frame, returning how many bytes the first write accepted.
    ///
    /// A first write of zero bytes is reported as-is so callers can treat it
    /// as a dead link; otherwise any remainder is pushed through.
    pub(crate) fn write_frame(&mut self, frame: &[u8]) -> io::Result<usize> {
        let written = self
            .port
            .write(frame)?;
        if written == 0 {
            return Ok(0);
        }
        if written < frame.len() {
            self.port
                .write_all(&frame[written..])?;
        }
        self.port
            .flush()?;
        Ok(written)
    }

    /// Accumulate reply bytes until the link goes quiet or a terminator arrives.
    pub(crate) fn read_reply(&mut self, chunk_size: usize) -> io::Result<Vec<u8>> {
        let mut buf = vec![0u8; chunk_size];
        let mut reply = Vec::new();

        loop {
            let n = read_chunk(&mut self.port, &mut buf)?;
            if n == 0 {
                break;
            }
            trace!("Reply chunk: {:02X?}", &buf[..n]);
            reply.extend_from_slice(&buf[..n]);
            if is_terminated(&reply) {
                break;
            }
        }

        Ok(reply)
    }
}

/// Read once, reporting a driver timeout as a zero-length read.
///
/// The programmer protocol cannot tell a finished reply from a stalled
/// device, so both end the current reply.
pub(crate) fn read_chunk<R: Read + ?Sized>(port: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    loop {
        match port.read(buf) {
            Ok(n) => return Ok(n),
            Err(e) if e.kind() == io::ErrorKind::TimedOut => return Ok(0),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {},
            Err(e) => return Err(e),
        }
    }
}
