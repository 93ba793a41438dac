//! Programmer wire protocol.
//!
//! Commands are ASCII lines terminated by a carriage return. Every command
//! is answered by a reply line that must end with the `OK` token:
//!
//! ```text
//! host -> programmer   ping\r
//! programmer -> host   ...OK\r
//! ```
//!
//! Bulk data (pages written, memory images read) travels outside this
//! framing; see [`crate::transfer`].

pub mod command;
pub mod reply;

// Re-export common types
pub use command::Command;
pub use reply::{ACK_TOKEN, FRAME_TERMINATOR, Reply, is_terminated};
