//! Command implementations.
//!
//! Device commands are generic over [`eeprog::Port`] so the one-shot
//! subcommands and the interactive shell share them.

pub(crate) mod completions;
pub(crate) mod device;
pub(crate) mod shell;
pub(crate) mod transfer;

/// Parse a number given as `0x` hex or decimal.
pub(crate) fn parse_number(text: &str) -> Option<u32> {
    let text = text.trim();
    match text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
    {
        Some(hex) => u32::from_str_radix(hex, 16).ok(),
        None => text
            .parse()
            .ok(),
    }
}

/// Parse an EEPROM address (0..=0xFFFF).
pub(crate) fn parse_addr(text: &str) -> Option<u16> {
    parse_number(text).and_then(|n| u16::try_from(n).ok())
}
