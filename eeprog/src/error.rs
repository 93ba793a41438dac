//! Error types for eeprog.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for eeprog operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for eeprog operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The named serial device could not be opened.
    #[error("open port {port}: {source}")]
    OpenFailed {
        /// Port name/path that failed to open.
        port: String,
        /// Underlying driver error.
        #[source]
        source: serialport::Error,
    },

    /// The transport accepted zero bytes of a command.
    #[error("programmer didn't respond or serial port error")]
    NoResponse,

    /// I/O error while talking to the programmer.
    #[error("transport failure: {0}")]
    TransportFailure(#[from] io::Error),

    /// The reply did not end with the acknowledgement token.
    #[error("response is invalid: {0:?}")]
    InvalidResponse(String),

    /// A full read produced no bytes.
    #[error("no data")]
    NoData,

    /// A bulk transfer failed part way through.
    #[error("transfer failed after {transferred} of {total} bytes: {source}")]
    Transfer {
        /// Bytes moved before the failure.
        transferred: usize,
        /// Bytes the transfer was expected to move.
        total: usize,
        /// Underlying transport error.
        #[source]
        source: io::Error,
    },

    /// A local file could not be read.
    #[error("read file {}: {source}", path.display())]
    FileRead {
        /// File path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// A local file could not be written.
    #[error("write file {}: {source}", path.display())]
    FileWrite {
        /// File path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// Serial port enumeration error.
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// No usable serial port was found.
    #[error("no serial port found")]
    DeviceNotFound,
}

impl Error {
    /// Bytes transferred before a bulk transfer failed, if this is a transfer error.
    pub fn transferred(&self) -> Option<usize> {
        match self {
            Self::Transfer { transferred, .. } => Some(*transferred),
            _ => None,
        }
    }
}
