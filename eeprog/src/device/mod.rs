//! Finding the programmer among attached serial devices.
//!
//! Programmers are microcontroller boards behind a USB serial bridge. The
//! bridge's VID/PID tells an Arduino or a CH340 clone apart from a random
//! modem, which is enough to rank candidates.

use log::{debug, info, trace};

use crate::error::{Error, Result};
use crate::port::{PortInfo, list_ports};

/// USB serial bridge behind a port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DeviceKind {
    /// Arduino board (native USB or 16U2 bridge).
    Arduino,
    /// WCH CH340/CH341.
    Ch340,
    /// Silicon Labs CP210x.
    Cp210x,
    /// FTDI FT232 family.
    Ftdi,
    /// Prolific PL2303.
    Prolific,
    /// Anything else.
    Unknown,
}

impl DeviceKind {
    /// Classify a USB VID/PID pair.
    pub fn from_vid_pid(vid: u16, pid: u16) -> Self {
        match (vid, pid) {
            // arduino.cc and arduino.org boards
            (0x2341 | 0x2A03, _) => Self::Arduino,
            (0x1A86, 0x7523 | 0x7522 | 0x5523 | 0x5512 | 0x55D4) => Self::Ch340,
            (0x10C4, 0xEA60 | 0xEA63 | 0xEA70 | 0xEA71) => Self::Cp210x,
            (0x0403, 0x6001 | 0x6010 | 0x6011 | 0x6014 | 0x6015) => Self::Ftdi,
            (0x067B, 0x2303 | 0x23A3 | 0x23C3 | 0x23D3) => Self::Prolific,
            _ => Self::Unknown,
        }
    }

    /// Display name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Arduino => "Arduino",
            Self::Ch340 => "CH340/CH341",
            Self::Cp210x => "CP210x",
            Self::Ftdi => "FTDI",
            Self::Prolific => "PL2303",
            Self::Unknown => "Unknown",
        }
    }

    /// Whether this is a recognised bridge.
    pub fn is_known(self) -> bool {
        self != Self::Unknown
    }

    /// Selection rank, lower first. Arduino-style boards are what the
    /// programmer firmware usually runs on.
    fn rank(self) -> u8 {
        match self {
            Self::Arduino | Self::Ch340 => 0,
            Self::Cp210x | Self::Ftdi | Self::Prolific => 1,
            Self::Unknown => 2,
        }
    }
}

/// A serial port with its bridge classified.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DetectedPort {
    /// Device path or name.
    pub name: String,
    /// Classified bridge.
    pub device: DeviceKind,
    /// USB vendor ID.
    pub vid: Option<u16>,
    /// USB product ID.
    pub pid: Option<u16>,
    /// USB manufacturer string.
    pub manufacturer: Option<String>,
    /// USB product string.
    pub product: Option<String>,
    /// USB serial number.
    pub serial: Option<String>,
}

impl DetectedPort {
    /// A port known only by name, e.g. one given on the command line.
    pub fn unknown(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            device: DeviceKind::Unknown,
            vid: None,
            pid: None,
            manufacturer: None,
            product: None,
            serial: None,
        }
    }

    /// Whether the bridge is one programmers are commonly built on.
    pub fn is_likely_programmer(&self) -> bool {
        self.device
            .is_known()
    }

    /// One-line description: name, bridge or raw IDs, product string.
    pub fn describe(&self) -> String {
        let mut text = self
            .name
            .clone();
        match (self.device, self.vid, self.pid) {
            (kind, _, _) if kind.is_known() => {
                text.push_str(&format!(" [{}]", kind.name()));
            },
            (_, Some(vid), Some(pid)) => {
                text.push_str(&format!(" [VID:{vid:04X} PID:{pid:04X}]"));
            },
            _ => {},
        }
        if let Some(product) = &self.product {
            text.push_str(" - ");
            text.push_str(product);
        }
        text
    }
}

impl From<PortInfo> for DetectedPort {
    fn from(info: PortInfo) -> Self {
        let device = info
            .vid
            .zip(info.pid)
            .map_or(DeviceKind::Unknown, |(vid, pid)| {
                DeviceKind::from_vid_pid(vid, pid)
            });
        Self {
            name: info.name,
            device,
            vid: info.vid,
            pid: info.pid,
            manufacturer: info.manufacturer,
            product: info.product,
            serial: info.serial_number,
        }
    }
}

/// Every attached serial port. Enumeration failures yield an empty list.
pub fn detect_ports() -> Vec<DetectedPort> {
    let infos = match list_ports() {
        Ok(infos) => infos,
        Err(e) => {
            debug!("Port enumeration failed: {e}");
            return Vec::new();
        },
    };
    infos
        .into_iter()
        .map(DetectedPort::from)
        .inspect(|port| trace!("Found {} ({:?})", port.name, port.device))
        .collect()
}

/// Best programmer candidate: highest ranked bridge, earliest listed on ties.
pub fn select_best_port(ports: &[DetectedPort]) -> Option<&DetectedPort> {
    ports
        .iter()
        .enumerate()
        .min_by_key(|(index, port)| {
            (
                port.device
                    .rank(),
                *index,
            )
        })
        .map(|(_, port)| port)
}

/// Pick a programmer port without asking.
pub fn auto_detect_port() -> Result<DetectedPort> {
    let ports = detect_ports();
    let best = select_best_port(&ports).ok_or(Error::DeviceNotFound)?;
    info!("Auto-detected {} ({})", best.name, best.device.name());
    Ok(best.clone())
}

/// [`DetectedPort::describe`] for each port.
pub fn format_port_list(ports: &[DetectedPort]) -> Vec<String> {
    ports
        .iter()
        .map(DetectedPort::describe)
        .collect()
}
