//! Serial link to the programmer.
//!
//! Everything above this module talks to a [`Port`]: a byte stream that
//! can be named and explicitly released. [`NativePort`] is the real serial
//! device; tests substitute a scripted port.
//!
//! ```text
//! Eeprom ──> Link (frames, bulk data) ──> Port ──> serialport
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::io::Write;
//! use eeprog::port::{NativePort, SerialConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut port = NativePort::open(&SerialConfig::new("/dev/ttyUSB0"))?;
//!     port.write_all(b"ping\r")?;
//!     Ok(())
//! }
//! ```

pub mod native;

#[cfg(test)]
pub(crate) mod mock;

use std::io::{Read, Write};
use std::time::Duration;

use crate::error::Result;

/// Baud rate the programmer firmware listens on.
pub const PROGRAMMER_BAUD: u32 = 57600;

/// Read timeout after which a silent link counts as end of reply.
pub const PROGRAMMER_TIMEOUT: Duration = Duration::from_secs(3);

/// How to open the programmer's port. Framing is always 8N1 without flow control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SerialConfig {
    /// Device path or name ("/dev/ttyUSB0", "COM3").
    pub port_name: String,
    /// Line speed.
    pub baud_rate: u32,
    /// Per-read timeout.
    pub timeout: Duration,
}

impl SerialConfig {
    /// Standard programmer settings for `port_name`.
    pub fn new(port_name: impl Into<String>) -> Self {
        Self {
            port_name: port_name.into(),
            baud_rate: PROGRAMMER_BAUD,
            timeout: PROGRAMMER_TIMEOUT,
        }
    }

    /// Override the per-read timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// An attached serial device as reported by the OS.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PortInfo {
    /// Device path or name.
    pub name: String,
    /// USB vendor ID.
    pub vid: Option<u16>,
    /// USB product ID.
    pub pid: Option<u16>,
    /// USB manufacturer string.
    pub manufacturer: Option<String>,
    /// USB product string.
    pub product: Option<String>,
    /// USB serial number.
    pub serial_number: Option<String>,
}

/// Byte stream to the programmer.
///
/// Drivers report a silent line either as `Ok(0)` or as
/// `io::ErrorKind::TimedOut`; the link layer accepts both.
pub trait Port: Read + Write + Send {
    /// Device name, for messages.
    fn name(&self) -> &str;

    /// Release the device. Later reads and writes fail.
    fn close(&mut self) -> Result<()>;
}

pub use native::{NativePort, list_ports};
