//! Choosing which serial port the programmer is on.
//!
//! `--port`/`EEPROG_PORT` wins, then `[port.connection] serial` from the
//! config. Otherwise attached ports are ranked (recognised bridges and
//! remembered USB IDs first) and the user picks when the answer is not
//! obvious.

use {
    crate::{CliError, config::Config},
    anyhow::Result,
    console::style,
    dialoguer::{Confirm, Error as DialoguerError, Select, theme::ColorfulTheme},
    eeprog::{DetectedPort, detect_ports},
    log::{debug, error, info},
    std::io::{self, IsTerminal},
};

/// How the port may be chosen.
#[derive(Debug, Clone, Default)]
pub struct SerialOptions {
    /// Port named on the command line or in the environment.
    pub port: Option<String>,
    /// Never prompt; ambiguity is an error.
    pub non_interactive: bool,
}

/// The chosen port.
pub struct SelectedPort {
    /// Port details.
    pub port: DetectedPort,
    /// Recognised bridge or a USB ID remembered in the config.
    pub is_known: bool,
}

fn usage_err(message: &str) -> anyhow::Error {
    CliError::Usage(message.to_string()).into()
}

fn cancelled() -> anyhow::Error {
    CliError::Cancelled("Port selection cancelled".to_string()).into()
}

pub(crate) fn map_prompt_error(err: DialoguerError) -> anyhow::Error {
    match err {
        DialoguerError::IO(e) if e.kind() == io::ErrorKind::Interrupted => cancelled(),
        DialoguerError::IO(e) => usage_err(&format!("Failed to read from terminal: {e}")),
    }
}

/// Recognised bridge, or a USB ID the user asked to remember.
fn is_known_device(port: &DetectedPort, config: &Config) -> bool {
    port.device
        .is_known()
        || port
            .vid
            .zip(port.pid)
            .is_some_and(|(vid, pid)| {
                config
                    .port
                    .usb_device
                    .iter()
                    .any(|device| device.matches(vid, pid))
            })
}

/// Attached ports worth offering: known ones if any, else all of them.
fn candidates(ports: Vec<DetectedPort>, config: &Config) -> Vec<SelectedPort> {
    let (known, other): (Vec<_>, Vec<_>) = ports
        .into_iter()
        .partition(|port| is_known_device(port, config));
    if known.is_empty() {
        other
            .into_iter()
            .map(|port| SelectedPort {
                port,
                is_known: false,
            })
            .collect()
    } else {
        known
            .into_iter()
            .map(|port| SelectedPort {
                port,
                is_known: true,
            })
            .collect()
    }
}

/// Look a name up among attached ports; unlisted names are used as given.
fn resolve_named(name: &str, config: &Config) -> SelectedPort {
    let port = detect_ports()
        .into_iter()
        .find(|p| {
            p.name == name
                || p.name
                    .eq_ignore_ascii_case(name)
        })
        .unwrap_or_else(|| DetectedPort::unknown(name));
    SelectedPort {
        is_known: is_known_device(&port, config),
        port,
    }
}

/// Choose the programmer port.
pub fn select_serial_port(options: &SerialOptions, config: &Config) -> Result<SelectedPort> {
    if let Some(name) = &options.port {
        return Ok(resolve_named(name, config));
    }
    if let Some(name) = &config
        .port
        .connection
        .serial
    {
        debug!("Port from config: {name}");
        return Ok(resolve_named(name, config));
    }

    let mut found = candidates(detect_ports(), config);
    match (found.len(), options.non_interactive) {
        (0, _) => Err(usage_err(
            "No serial ports found; is the programmer attached?",
        )),
        (1, _) if found[0].is_known => {
            let selected = found.remove(0);
            info!(
                "Auto-selected {} [{}]",
                selected
                    .port
                    .name,
                selected
                    .port
                    .device
                    .name()
            );
            Ok(selected)
        },
        (1, true) => Ok(found.remove(0)),
        (1, false) => {
            require_terminal()?;
            confirm_port(found.remove(0))
        },
        (_, true) => Err(usage_err(
            "Several serial ports found; pick one with --port",
        )),
        (_, false) => {
            require_terminal()?;
            pick_port(found, config)
        },
    }
}

fn require_terminal() -> Result<()> {
    if io::stdin().is_terminal() && io::stderr().is_terminal() {
        Ok(())
    } else {
        Err(usage_err(
            "Choosing a port needs an interactive terminal; use --port",
        ))
    }
}

fn port_label(port: &DetectedPort, config: &Config) -> String {
    let mut label = if is_known_device(port, config) {
        style(&port.name)
            .bold()
            .to_string()
    } else {
        port.name
            .clone()
    };
    if port
        .device
        .is_known()
    {
        label.push_str(&format!(" [{}]", style(port.device.name()).yellow()));
    } else if let (Some(vid), Some(pid)) = (port.vid, port.pid) {
        label.push_str(&format!(" ({vid:04X}:{pid:04X})"));
    }
    if let Some(product) = &port.product {
        label.push_str(&format!(" - {}", style(product).dim()));
    }
    label
}

fn pick_port(found: Vec<SelectedPort>, config: &Config) -> Result<SelectedPort> {
    eprintln!(
        "{} {} candidate ports",
        style("ℹ").blue(),
        found.len()
    );

    let width = usize::from(
        console::Term::stderr()
            .size()
            .1,
    )
    .saturating_sub(4);
    let labels: Vec<String> = found
        .iter()
        .map(|s| console::truncate_str(&port_label(&s.port, config), width, "…").into_owned())
        .collect();

    let choice = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("Which port is the programmer on?")
        .items(&labels)
        .default(0)
        .interact_opt()
        .map_err(map_prompt_error)?
        .ok_or_else(cancelled)?;

    found
        .into_iter()
        .nth(choice)
        .ok_or_else(cancelled)
}

fn confirm_port(selected: SelectedPort) -> Result<SelectedPort> {
    let accepted = Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(format!("Use {}?", selected.port.describe()))
        .default(true)
        .interact_opt()
        .map_err(map_prompt_error)?
        .unwrap_or(false);

    if accepted { Ok(selected) } else { Err(cancelled()) }
}

/// Offer to remember the port's USB ID so it is recognised next time.
pub fn ask_remember_port(port: &DetectedPort, config: &mut Config) -> Result<()> {
    let Some((vid, pid)) = port
        .vid
        .zip(port.pid)
    else {
        return Ok(());
    };
    if is_known_device(port, config) || require_terminal().is_err() {
        return Ok(());
    }

    let remember = Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(format!("Remember {vid:04X}:{pid:04X} as a programmer?"))
        .default(false)
        .interact_opt()
        .map_err(map_prompt_error)?
        .unwrap_or(false);

    if remember {
        if let Err(e) = config.remember_usb_device(vid, pid) {
            error!("Could not save USB device: {e}");
        }
    }
    Ok(())
}
