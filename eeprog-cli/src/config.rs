//! Configuration files.
//!
//! Later sources override earlier ones:
//!
//! 1. `<config dir>/eeprog/config.toml`, then `ports.toml` beside it
//! 2. `./eeprog.toml`, then `./eeprog_ports.toml`
//! 3. `EEPROG_*` environment variables and command-line flags (in `main`)
//!
//! ```toml
//! [port.connection]
//! serial = "/dev/ttyUSB0"
//!
//! [[port.usb_device]]
//! vid = 0x1A86
//! pid = 0x7523
//!
//! [eeprom]
//! size = 32768
//! ```
//!
//! A file that fails to parse is reported and skipped.

use directories::ProjectDirs;
use eeprog::MemorySize;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::fs;
use std::path::{Path, PathBuf};

const LOCAL_CONFIG: &str = "eeprog.toml";
const LOCAL_PORTS: &str = "eeprog_ports.toml";
const GLOBAL_CONFIG: &str = "config.toml";
const GLOBAL_PORTS: &str = "ports.toml";

/// A USB serial bridge the user confirmed as a programmer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UsbDevice {
    /// Vendor ID.
    pub vid: u16,
    /// Product ID.
    pub pid: u16,
}

impl UsbDevice {
    /// Whether `vid`/`pid` identify this device.
    pub fn matches(&self, vid: u16, pid: u16) -> bool {
        (self.vid, self.pid) == (vid, pid)
    }
}

/// `[port.connection]`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Port to use without asking.
    pub serial: Option<String>,
}

/// `[port]`, also the whole content of a ports file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PortConfig {
    #[serde(default)]
    pub connection: ConnectionConfig,
    /// Remembered bridges.
    #[serde(default)]
    pub usb_device: Vec<UsbDevice>,
}

impl PortConfig {
    fn overlay(&mut self, other: Self) {
        if other
            .connection
            .serial
            .is_some()
        {
            self.connection = other.connection;
        }
        for device in other.usb_device {
            if !self
                .usb_device
                .contains(&device)
            {
                self.usb_device
                    .push(device);
            }
        }
    }
}

/// `[eeprom]`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EepromConfig {
    /// Memory size in bytes.
    pub size: Option<usize>,
}

impl EepromConfig {
    /// The configured size, if set and supported.
    pub fn memory_size(&self) -> Option<MemorySize> {
        let bytes = self.size?;
        MemorySize::from_bytes(bytes).or_else(|| {
            warn!("Ignoring unsupported eeprom size {bytes} in config");
            None
        })
    }
}

/// Merged configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub port: PortConfig,
    #[serde(default)]
    pub eeprom: EepromConfig,
}

impl Config {
    /// Merge every config and ports file that exists.
    pub fn load() -> Self {
        let global = Self::global_config_dir();
        let layers = [
            global
                .as_ref()
                .map(|dir| (dir.join(GLOBAL_CONFIG), dir.join(GLOBAL_PORTS))),
            Some((PathBuf::from(LOCAL_CONFIG), PathBuf::from(LOCAL_PORTS))),
        ];

        let mut config = Self::default();
        for (config_path, ports_path) in layers
            .into_iter()
            .flatten()
        {
            if let Some(layer) = read_toml::<Self>(&config_path) {
                config.overlay(layer);
            }
            if let Some(ports) = read_toml::<PortConfig>(&ports_path) {
                config
                    .port
                    .overlay(ports);
            }
        }
        config
    }

    /// Load only `path` (`--config`), falling back to defaults.
    pub fn load_from_path(path: &Path) -> Self {
        read_toml(path).unwrap_or_else(|| {
            warn!("Using default settings; could not load {}", path.display());
            Self::default()
        })
    }

    /// `<platform config dir>/eeprog`.
    pub fn global_config_dir() -> Option<PathBuf> {
        ProjectDirs::from("", "", "eeprog").map(|dirs| {
            dirs.config_dir()
                .to_path_buf()
        })
    }

    fn overlay(&mut self, other: Self) {
        self.port
            .overlay(other.port);
        if other
            .eeprom
            .size
            .is_some()
        {
            self.eeprom = other.eeprom;
        }
    }

    /// Remember a USB bridge and persist the port settings.
    ///
    /// Written next to an existing local config, otherwise to the global
    /// ports file.
    pub fn remember_usb_device(&mut self, vid: u16, pid: u16) -> anyhow::Result<()> {
        let device = UsbDevice { vid, pid };
        if self
            .port
            .usb_device
            .contains(&device)
        {
            return Ok(());
        }
        self.port
            .usb_device
            .push(device);

        let has_local = Path::new(LOCAL_CONFIG).exists() || Path::new(LOCAL_PORTS).exists();
        let path = match Self::global_config_dir() {
            Some(dir) if !has_local => {
                fs::create_dir_all(&dir)?;
                dir.join(GLOBAL_PORTS)
            },
            _ => PathBuf::from(LOCAL_PORTS),
        };
        self.save_ports_to(&path)?;
        info!("Remembered {vid:04X}:{pid:04X} in {}", path.display());
        Ok(())
    }

    fn save_ports_to(&self, path: &Path) -> anyhow::Result<()> {
        fs::write(path, toml::to_string_pretty(&self.port)?)?;
        Ok(())
    }
}

/// Parse `path` if it exists. Read and parse errors are logged, not returned.
fn read_toml<T: DeserializeOwned>(path: &Path) -> Option<T> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            warn!("Cannot read {}: {e}", path.display());
            return None;
        },
    };
    match toml::from_str(&text) {
        Ok(value) => {
            debug!("Loaded {}", path.display());
            Some(value)
        },
        Err(e) => {
            warn!("Skipping {}: {e}", path.display());
            None
        },
    }
}
