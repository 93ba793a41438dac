//! EEPROM operations built on the programmer link.
//!
//! ## Example
//!
//! ```rust,no_run
//! use eeprog::{Eeprom, MemorySize};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut eeprom = Eeprom::open("/dev/ttyUSB0", MemorySize::S32K)?;
//!     eeprom.ping()?;
//!
//!     let written = eeprom.read_to_file("dump.bin", |current, total| {
//!         println!("{current}/{total}");
//!     })?;
//!     println!("saved {written} bytes");
//!
//!     let verification = eeprom.check_file("dump.bin", |_, _| {})?;
//!     println!("{verification}");
//!     Ok(())
//! }
//! ```

use std::fmt;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::Path;
use std::str::FromStr;

use log::{info, warn};
use md5::{Digest, Md5};

use crate::error::{Error, Result};
use crate::link::Link;
use crate::port::{NativePort, Port, SerialConfig};
use crate::protocol::{Command, Reply};
use crate::transfer::PAGE_SIZE;

/// Memory sizes the programmer can be told to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MemorySize {
    /// 64 bytes.
    S64,
    /// 8 KiB.
    S8K,
    /// 16 KiB.
    S16K,
    /// 32 KiB.
    #[default]
    S32K,
    /// 64 KiB.
    S64K,
}

impl MemorySize {
    /// Every supported size, smallest first.
    pub const ALL: [Self; 5] = [Self::S64, Self::S8K, Self::S16K, Self::S32K, Self::S64K];

    /// Size in bytes.
    pub const fn bytes(self) -> usize {
        match self {
            Self::S64 => 64,
            Self::S8K => 8192,
            Self::S16K => 16384,
            Self::S32K => 32768,
            Self::S64K => 65536,
        }
    }

    /// Look up a size by its byte count.
    pub fn from_bytes(bytes: usize) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|s| s.bytes() == bytes)
    }

    /// Short label (`64`, `8k`, ...).
    pub const fn label(self) -> &'static str {
        match self {
            Self::S64 => "64",
            Self::S8K => "8k",
            Self::S16K => "16k",
            Self::S32K => "32k",
            Self::S64K => "64k",
        }
    }
}

impl fmt::Display for MemorySize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.bytes())
    }
}

impl FromStr for MemorySize {
    type Err = String;

    /// Accepts a label (`8k`), a decimal byte count (`8192`) or hex (`0x2000`).
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        if let Some(size) = Self::ALL
            .into_iter()
            .find(|size| size.label().eq_ignore_ascii_case(s))
        {
            return Ok(size);
        }

        let bytes = if let Some(hex) = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
        {
            usize::from_str_radix(hex, 16)
        } else {
            s.parse::<usize>()
        }
        .map_err(|_| format!("invalid memory size: '{s}'"))?;

        Self::from_bytes(bytes).ok_or_else(|| {
            format!("unsupported memory size {bytes} (expected one of 64, 8192, 16384, 32768, 65536)")
        })
    }
}

/// Outcome of comparing a file with the device contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Verification {
    /// MD5 of the (size-adjusted) file contents.
    pub file_digest: [u8; 16],
    /// MD5 of the bytes read back from the device.
    pub device_digest: [u8; 16],
}

impl Verification {
    /// Whether both digests match.
    pub fn is_ok(&self) -> bool {
        self.file_digest == self.device_digest
    }

    /// File digest as lowercase hex.
    pub fn file_hex(&self) -> String {
        to_hex(&self.file_digest)
    }

    /// Device digest as lowercase hex.
    pub fn device_hex(&self) -> String {
        to_hex(&self.device_digest)
    }
}

impl fmt::Display for Verification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_ok() {
            write!(f, "Verification OK")
        } else {
            write!(f, "Verification BAD")
        }
    }
}

fn md5_digest(data: &[u8]) -> [u8; 16] {
    let mut out = [0u8; 16];
    out.copy_from_slice(&Md5::digest(data));
    out
}

fn to_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

/// An EEPROM behind a programmer, with the memory size it is treated as.
pub struct Eeprom<P: Port> {
    link: Link<P>,
    size: MemorySize,
}

impl Eeprom<NativePort> {
    /// Open the programmer on `port_name` with the standard link settings.
    ///
    /// The port is released when the returned value is dropped.
    pub fn open(port_name: &str, size: MemorySize) -> Result<Self> {
        let port = NativePort::open(&SerialConfig::new(port_name))?;
        Ok(Self::new(port, size))
    }
}

impl<P: Port> Eeprom<P> {
    /// Bind an opened port to a memory size.
    pub fn new(port: P, size: MemorySize) -> Self {
        Self {
            link: Link::new(port),
            size,
        }
    }

    /// Selected memory size.
    pub fn size(&self) -> MemorySize {
        self.size
    }

    /// Change the memory size used by later operations.
    pub fn set_size(&mut self, size: MemorySize) {
        self.size = size;
    }

    /// Name of the port in use.
    pub fn port_name(&self) -> &str {
        self.link
            .port()
            .name()
    }

    /// Get a reference to the underlying link.
    pub fn link(&self) -> &Link<P> {
        &self.link
    }

    /// Release the port. Later operations fail.
    pub fn close(&mut self) -> Result<()> {
        self.link
            .close()
    }

    /// Consume and return the underlying port.
    pub fn into_port(self) -> P {
        self.link
            .into_port()
    }

    /// Read the whole device into memory.
    ///
    /// The length is whatever the programmer streamed; it is not checked
    /// against the selected size.
    pub fn read_data<F>(&mut self, progress: F) -> Result<Vec<u8>>
    where
        F: FnMut(usize, usize),
    {
        let size = self
            .size
            .bytes();
        self.link
            .send_command(&Command::ReadAll { size })?;
        self.link
            .receive_data(size, progress)
    }

    /// Read the device into `path`, returning the number of bytes written.
    ///
    /// The file is created if needed and overwritten from the start, but is
    /// not truncated: bytes past the new length survive.
    pub fn read_to_file<F>(&mut self, path: impl AsRef<Path>, progress: F) -> Result<usize>
    where
        F: FnMut(usize, usize),
    {
        let path = path.as_ref();
        let data = self.read_data(progress)?;
        if data.is_empty() {
            return Err(Error::NoData);
        }
        let expected = self
            .size
            .bytes();
        if data.len() != expected {
            warn!(
                "Received {} bytes, expected {expected}",
                data.len()
            );
        }

        info!(
            "Write to file '{}' size {}",
            path.display(),
            data.len()
        );
        let write_err = |source| Error::FileWrite {
            path: path.to_path_buf(),
            source,
        };
        #[allow(clippy::suspicious_open_options)]
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)
            .map_err(write_err)?;
        file.write_all(&data)
            .map_err(write_err)?;
        file.flush()
            .map_err(write_err)?;

        info!("Written {}", data.len());
        Ok(data.len())
    }

    /// Write the contents of `path` to the device page by page.
    ///
    /// Returns the number of bytes sent. A trailing partial page is dropped.
    pub fn write_from_file<F>(&mut self, path: impl AsRef<Path>, progress: F) -> Result<usize>
    where
        F: FnMut(usize, usize),
    {
        let path = path.as_ref();
        let data = fs::read(path).map_err(|source| Error::FileRead {
            path: path.to_path_buf(),
            source,
        })?;
        info!(
            "Write from file '{}' size {}",
            path.display(),
            data.len()
        );
        self.write_data(&data, progress)
    }

    /// Write `data` to the device page by page.
    pub fn write_data<F>(&mut self, data: &[u8], progress: F) -> Result<usize>
    where
        F: FnMut(usize, usize),
    {
        let dropped = data.len() % PAGE_SIZE;
        if dropped > 0 {
            warn!("Last {dropped} bytes do not fill a {PAGE_SIZE}-byte page and will not be written");
        }

        self.link
            .send_command(&Command::BeginWrite)?;
        self.link
            .send_data(data, progress)
    }

    /// Compare `path` against a fresh read of the device.
    ///
    /// The file is cut or zero-padded to the selected size before hashing.
    /// An empty file is a [`Error::FileRead`] and the device is not touched.
    /// A content mismatch is a normal result, not an error.
    pub fn check_file<F>(&mut self, path: impl AsRef<Path>, progress: F) -> Result<Verification>
    where
        F: FnMut(usize, usize),
    {
        let path = path.as_ref();
        let read_err = |source| Error::FileRead {
            path: path.to_path_buf(),
            source,
        };
        let size = self
            .size
            .bytes();

        let mut expected = Vec::with_capacity(size);
        File::open(path)
            .map_err(read_err)?
            .take(size as u64)
            .read_to_end(&mut expected)
            .map_err(read_err)?;
        if expected.is_empty() {
            return Err(read_err(io::Error::from(io::ErrorKind::UnexpectedEof)));
        }
        expected.resize(size, 0);

        let file_digest = md5_digest(&expected);
        let device = self.read_data(progress)?;
        let verification = Verification {
            file_digest,
            device_digest: md5_digest(&device),
        };

        info!("file {}", verification.file_hex());
        info!("eeprom {}", verification.device_hex());
        Ok(verification)
    }

    /// Read one byte. The value comes back in the reply text.
    pub fn read_addr(&mut self, addr: u16) -> Result<Reply> {
        self.link
            .send_command(&Command::ReadAddr(addr))
    }

    /// Write one byte.
    pub fn write_addr(&mut self, addr: u16, value: u8) -> Result<Reply> {
        self.link
            .send_command(&Command::WriteAddr { addr, value })
    }

    /// Check that the programmer answers.
    pub fn ping(&mut self) -> Result<Reply> {
        self.link
            .send_command(&Command::Ping)
    }
}
