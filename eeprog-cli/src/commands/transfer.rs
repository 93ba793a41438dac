//! Whole-memory commands: read, write and check.

use anyhow::{Context, Result};
use console::style;
use eeprog::{Eeprom, Port, Verification};
use std::path::Path;

use crate::progress::TransferBar;

/// Dump the whole memory into `file`.
pub(crate) fn cmd_read<P: Port>(eeprom: &mut Eeprom<P>, file: &Path, quiet: bool) -> Result<()> {
    if !quiet {
        eprintln!(
            "{} Reading {} bytes into '{}'",
            style("📥").cyan(),
            eeprom
                .size()
                .bytes(),
            file.display()
        );
    }

    let mut bar = TransferBar::new("Reading", quiet);
    let result = eeprom.read_to_file(file, |current, total| bar.update(current, total));
    bar.finish();
    let written = result.with_context(|| format!("Failed to read EEPROM into '{}'", file.display()))?;

    if !quiet {
        eprintln!("{} Written {written} bytes", style("✓").green());
    }
    Ok(())
}

/// Program the memory from `file`.
pub(crate) fn cmd_write<P: Port>(eeprom: &mut Eeprom<P>, file: &Path, quiet: bool) -> Result<()> {
    if !quiet {
        eprintln!(
            "{} Writing '{}' to EEPROM",
            style("📤").cyan(),
            file.display()
        );
    }

    let mut bar = TransferBar::new("Writing", quiet);
    let result = eeprom.write_from_file(file, |current, total| bar.update(current, total));
    bar.finish();
    let sent = result.with_context(|| format!("Failed to write '{}' to EEPROM", file.display()))?;

    if !quiet {
        eprintln!("{} Sent {sent} bytes", style("✓").green());
    }
    Ok(())
}

/// Compare `file` with the memory and print the verdict on stdout.
pub(crate) fn cmd_check<P: Port>(
    eeprom: &mut Eeprom<P>,
    file: &Path,
    quiet: bool,
) -> Result<Verification> {
    let mut bar = TransferBar::new("Reading", quiet);
    let result = eeprom.check_file(file, |current, total| bar.update(current, total));
    bar.finish();
    let verification =
        result.with_context(|| format!("Failed to check '{}' against EEPROM", file.display()))?;

    print!("{}", format_verification(&verification));
    Ok(verification)
}

fn format_verification(verification: &Verification) -> String {
    format!(
        "file {}\neeprom {}\n{verification}\n",
        verification.file_hex(),
        verification.device_hex()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_verification_ok() {
        let verification = Verification {
            file_digest: [0xAB; 16],
            device_digest: [0xAB; 16],
        };
        let text = format_verification(&verification);
        let lines: Vec<&str> = text
            .lines()
            .collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], format!("file {}", "ab".repeat(16)));
        assert_eq!(lines[1], format!("eeprom {}", "ab".repeat(16)));
        assert_eq!(lines[2], "Verification OK");
    }

    #[test]
    fn test_format_verification_bad() {
        let verification = Verification {
            file_digest: [0; 16],
            device_digest: [1; 16],
        };
        assert!(
            format_verification(&verification)
                .ends_with("Verification BAD\n")
        );
    }
}
