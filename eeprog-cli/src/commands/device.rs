//! Programmer commands and port listing.

use anyhow::{Context, Result};
use console::style;
use eeprog::{DetectedPort, Eeprom, Port, auto_detect_port, detect_ports};

/// Check that the programmer answers.
pub(crate) fn cmd_ping<P: Port>(eeprom: &mut Eeprom<P>) -> Result<()> {
    let reply = eeprom
        .ping()
        .context("Programmer did not answer ping")?;
    println!("{}", reply.text());
    Ok(())
}

/// Ask the programmer for the byte at `addr`.
pub(crate) fn cmd_read_addr<P: Port>(eeprom: &mut Eeprom<P>, addr: u16) -> Result<()> {
    let reply = eeprom
        .read_addr(addr)
        .with_context(|| format!("Failed to read address 0x{addr:04X}"))?;
    println!("{}", reply.text());
    Ok(())
}

/// Store `value` at `addr`.
pub(crate) fn cmd_write_addr<P: Port>(eeprom: &mut Eeprom<P>, addr: u16, value: u8) -> Result<()> {
    let reply = eeprom
        .write_addr(addr, value)
        .with_context(|| format!("Failed to write 0x{value:02X} to address 0x{addr:04X}"))?;
    println!("{}", reply.text());
    Ok(())
}

fn port_json(port: &DetectedPort) -> serde_json::Value {
    serde_json::json!({
        "name": port.name,
        "device": port.device.name(),
        "known": port.device.is_known(),
        "vid": port.vid,
        "pid": port.pid,
        "manufacturer": port.manufacturer,
        "product": port.product,
        "serial": port.serial,
    })
}

/// List serial ports, as text on stderr or JSON on stdout.
pub(crate) fn cmd_list_ports(json: bool) -> Result<()> {
    let detected = detect_ports();

    if json {
        let ports: Vec<serde_json::Value> = detected
            .iter()
            .map(port_json)
            .collect();
        println!("{}", serde_json::to_string_pretty(&ports)?);
        return Ok(());
    }

    eprintln!("{}", style("Serial ports").bold().underlined());

    if detected.is_empty() {
        eprintln!("  {}", style("No serial ports found").dim());
        return Ok(());
    }

    for port in &detected {
        let device_type = if port
            .device
            .is_known()
        {
            format!(
                " [{}]",
                style(
                    port.device
                        .name()
                )
                .yellow()
            )
        } else {
            String::new()
        };
        let vid_pid = match (port.vid, port.pid) {
            (Some(vid), Some(pid)) => format!(" ({vid:04X}:{pid:04X})"),
            _ => String::new(),
        };
        let product = port
            .product
            .as_deref()
            .map(|p| format!(" - {}", style(p).dim()))
            .unwrap_or_default();

        eprintln!(
            "  {} {}{}{}{}",
            style("•").green(),
            style(&port.name).cyan(),
            device_type,
            vid_pid,
            product
        );
    }

    if let Ok(auto_port) = auto_detect_port() {
        eprintln!(
            "\n{} Auto-detected: {}",
            style("→").green().bold(),
            style(&auto_port.name).cyan().bold()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use eeprog::PortInfo;

    #[test]
    fn test_port_json_fields() {
        let port = DetectedPort::from(PortInfo {
            name: "/dev/ttyUSB0".to_string(),
            vid: Some(0x1A86),
            pid: Some(0x7523),
            manufacturer: Some("QinHeng".to_string()),
            product: None,
            serial_number: None,
        });

        let value = port_json(&port);
        assert_eq!(value["name"], "/dev/ttyUSB0");
        assert_eq!(value["device"], "CH340/CH341");
        assert_eq!(value["known"], true);
        assert_eq!(value["vid"], 0x1A86);
        assert!(value["product"].is_null());
    }
}
