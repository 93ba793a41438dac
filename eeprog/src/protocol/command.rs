//! Outgoing command frames.
//!
//! Numbers are rendered as `0x` followed by zero-padded uppercase hex
//! (four digits for sizes, counts and addresses, two for data bytes). The
//! programmer firmware parses exactly this form.

use std::fmt;

use crate::protocol::reply::FRAME_TERMINATOR;

/// A command understood by the programmer firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Liveness check.
    Ping,
    /// Start streaming `size` bytes of memory to the host.
    ReadAll {
        /// Number of bytes to stream.
        size: usize,
    },
    /// Start a page write sequence.
    BeginWrite,
    /// Announce how many pages follow a `BeginWrite`.
    PageCount(usize),
    /// Read a single byte.
    ReadAddr(u16),
    /// Write a single byte.
    WriteAddr {
        /// Target address.
        addr: u16,
        /// Byte to store.
        value: u8,
    },
}

impl Command {
    /// Build the frame bytes, terminator included.
    pub fn build(&self) -> Vec<u8> {
        let mut frame = self
            .to_string()
            .into_bytes();
        frame.push(FRAME_TERMINATOR);
        frame
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ping => write!(f, "ping"),
            Self::ReadAll { size } => write!(f, "read 0x{size:04X}"),
            Self::BeginWrite => write!(f, "write"),
            Self::PageCount(pages) => write!(f, "0x{pages:04X}"),
            Self::ReadAddr(addr) => write!(f, "read addr 0x{addr:04X}"),
            Self::WriteAddr { addr, value } => write!(f, "write addr 0x{addr:04X} 0x{value:02X}"),
        }
    }
}
