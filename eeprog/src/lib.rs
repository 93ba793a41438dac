//! # eeprog
//!
//! A library for driving a serial EEPROM programmer.
//!
//! The programmer is a small board (typically an Arduino) attached over a
//! serial port at 57600 baud. It understands a handful of CR-terminated
//! text commands and streams raw memory contents in both directions.
//!
//! This crate provides:
//!
//! - Serial transport with explicit open/close ([`port`])
//! - Command framing and acknowledgement checks ([`protocol`], [`link`])
//! - Page-chunked writes and streamed reads ([`transfer`])
//! - Whole-image read, write and MD5 verification ([`eeprom`])
//! - USB bridge discovery ([`device`])
//!
//! ## Supported Sizes
//!
//! 64 bytes, 8 KiB, 16 KiB, 32 KiB (default) and 64 KiB.
//!
//! ## Features
//!
//! - `serde`: Serialization support for port metadata
//!
//! ## Example
//!
//! ```rust,no_run
//! use eeprog::{Eeprom, MemorySize};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut eeprom = Eeprom::open("/dev/ttyUSB0", MemorySize::S32K)?;
//!
//!     eeprom.ping()?;
//!     eeprom.read_to_file("dump.bin", |current, total| {
//!         println!("Read {current}/{total}");
//!     })?;
//!
//!     let verification = eeprom.check_file("dump.bin", |_, _| {})?;
//!     println!("{verification}");
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod device;
pub mod eeprom;
pub mod error;
pub mod link;
pub mod port;
pub mod progress;
pub mod protocol;
pub mod transfer;

pub use device::{DetectedPort, DeviceKind, auto_detect_port, detect_ports};
pub use eeprom::{Eeprom, MemorySize, Verification};
pub use error::{Error, Result};
pub use link::Link;
pub use port::{NativePort, Port, PortInfo, SerialConfig};
pub use progress::ProgressMeter;
pub use protocol::{Command, Reply};
pub use transfer::PAGE_SIZE;
