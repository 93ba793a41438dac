//! Incoming reply handling.

/// Byte that ends every command and reply line.
pub const FRAME_TERMINATOR: u8 = b'\r';

/// Suffix a reply must carry to count as an acknowledgement.
pub const ACK_TOKEN: &str = "OK";

/// Whether accumulated bytes end with the frame terminator.
pub fn is_terminated(buf: &[u8]) -> bool {
    buf.last() == Some(&FRAME_TERMINATOR)
}

/// A complete reply line with surrounding terminators stripped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    text: String,
}

impl Reply {
    /// Build a reply from the raw bytes accumulated off the wire.
    pub fn from_raw(raw: &[u8]) -> Self {
        let text = String::from_utf8_lossy(raw)
            .trim_matches(char::from(FRAME_TERMINATOR))
            .to_string();
        Self { text }
    }

    /// Reply text without leading/trailing carriage returns.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Whether the reply ends with the acknowledgement token.
    pub fn is_ack(&self) -> bool {
        self.text
            .ends_with(ACK_TOKEN)
    }

    /// Consume the reply, returning its text.
    pub fn into_text(self) -> String {
        self.text
    }
}
