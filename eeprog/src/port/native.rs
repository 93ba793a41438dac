//! [`Port`] over a real serial device via `serialport`.

use std::io::{self, Read, Write};

use log::{debug, trace};
use serialport::{DataBits, FlowControl, Parity, SerialPort, SerialPortType, StopBits};

use crate::error::{Error, Result};
use crate::port::{Port, PortInfo, SerialConfig};

/// An opened programmer port. Dropping it closes the device.
pub struct NativePort {
    inner: Option<Box<dyn SerialPort>>,
    name: String,
}

impl NativePort {
    /// Open `config.port_name` as 8N1 without flow control.
    pub fn open(config: &SerialConfig) -> Result<Self> {
        debug!(
            "Open {} at {} baud, timeout {:?}",
            config.port_name, config.baud_rate, config.timeout
        );
        let inner = serialport::new(&config.port_name, config.baud_rate)
            .timeout(config.timeout)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .open()
            .map_err(|source| Error::OpenFailed {
                port: config
                    .port_name
                    .clone(),
                source,
            })?;

        Ok(Self {
            inner: Some(inner),
            name: config
                .port_name
                .clone(),
        })
    }

    /// Whether [`Port::close`] has not been called yet.
    pub fn is_open(&self) -> bool {
        self.inner
            .is_some()
    }

    fn device(&mut self) -> io::Result<&mut Box<dyn SerialPort>> {
        self.inner
            .as_mut()
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "port closed"))
    }
}

impl Port for NativePort {
    fn name(&self) -> &str {
        &self.name
    }

    fn close(&mut self) -> Result<()> {
        if self
            .inner
            .take()
            .is_some()
        {
            debug!("Closed {}", self.name);
        }
        Ok(())
    }
}

impl Read for NativePort {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.device()?
            .read(buf)
    }
}

impl Write for NativePort {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.device()?
            .write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.device()?
            .flush()
    }
}

impl Drop for NativePort {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

/// Serial devices currently attached, with USB metadata where available.
pub fn list_ports() -> Result<Vec<PortInfo>> {
    let ports = serialport::available_ports()?;
    trace!("OS reports {} serial ports", ports.len());

    Ok(ports
        .into_iter()
        .map(|p| match p.port_type {
            SerialPortType::UsbPort(usb) => PortInfo {
                name: p.port_name,
                vid: Some(usb.vid),
                pid: Some(usb.pid),
                manufacturer: usb.manufacturer,
                product: usb.product,
                serial_number: usb.serial_number,
            },
            _ => PortInfo {
                name: p.port_name,
                vid: None,
                pid: None,
                manufacturer: None,
                product: None,
                serial_number: None,
            },
        })
        .collect())
}
