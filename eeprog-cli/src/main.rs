//! eeprog CLI - Command-line tool for serial EEPROM programmers.
//!
//! Subcommands cover whole-memory read, write and MD5 check, single-byte
//! access, an interactive shell, port listing and completion scripts.
//! The programmer port comes from `--port`, the config file, or detection.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use clap_complete::Shell;
use console::style;
use eeprog::{Eeprom, MemorySize, NativePort};
use env_logger::Env;
use log::debug;
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};

mod commands;
mod config;
mod progress;
mod serial;

use commands::{completions, device, parse_addr, parse_number, shell, transfer};
use config::Config;
use serial::{SerialOptions, ask_remember_port, select_serial_port};

/// Set once in `main`.
static STDERR_IS_TTY: AtomicBool = AtomicBool::new(true);

/// Progress bars only draw on a colour-capable terminal.
pub(crate) fn use_fancy_output() -> bool {
    STDERR_IS_TTY.load(Ordering::Relaxed) && console::colors_enabled_stderr()
}

/// Errors with a dedicated exit code.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    /// Bad invocation or missing setup (exit code 2).
    #[error("{0}")]
    Usage(String),
    /// The user aborted a prompt (exit code 130).
    #[error("{0}")]
    Cancelled(String),
}

impl CliError {
    fn exit_code(&self) -> u8 {
        match self {
            Self::Usage(_) => 2,
            Self::Cancelled(_) => 130,
        }
    }
}

/// eeprog - Read, write and verify EEPROMs through a serial programmer.
///
/// Environment variables:
///   EEPROG_PORT              - Default serial port
///   EEPROG_SIZE              - Memory size (64, 8k, 16k, 32k, 64k)
///   EEPROG_NON_INTERACTIVE   - Non-interactive mode (disable prompts)
#[derive(Parser)]
#[command(name = "eeprog")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
#[command(after_help = "Examples:\n  eeprog -p /dev/ttyUSB0 read dump.bin\n  eeprog -s 8k write image.bin\n  eeprog check image.bin")]
struct Cli {
    /// Programmer serial port [default: detected].
    #[arg(short, long, global = true, env = "EEPROG_PORT")]
    port: Option<String>,

    /// Memory size: 64, 8k, 16k, 32k or 64k [default: 32k].
    #[arg(short, long, global = true, env = "EEPROG_SIZE", value_parser = parse_size)]
    size: Option<MemorySize>,

    /// Verbose output level (-v, -vv for increasing detail).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only print results and errors.
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Fail instead of prompting for a port.
    #[arg(long, global = true, env = "EEPROG_NON_INTERACTIVE")]
    non_interactive: bool,

    /// Read settings from this file only.
    #[arg(long = "config", global = true, value_name = "PATH")]
    config_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
enum Commands {
    /// Read the whole memory into a file.
    Read {
        /// Destination file.
        file: PathBuf,
    },

    /// Write a file into the memory.
    Write {
        /// Source file.
        file: PathBuf,
    },

    /// Compare the memory with a file.
    Check {
        /// File to compare against.
        file: PathBuf,
    },

    /// Check that the programmer answers.
    Ping,

    /// Read the byte at an address.
    ReadAddr {
        /// Address (decimal or 0x hex).
        #[arg(value_parser = parse_addr_arg)]
        addr: u16,
    },

    /// Write one byte at an address.
    WriteAddr {
        /// Address (decimal or 0x hex).
        #[arg(value_parser = parse_addr_arg)]
        addr: u16,

        /// Byte value 0-255 (decimal or 0x hex).
        #[arg(value_parser = parse_byte_arg)]
        byte: u8,
    },

    /// Show attached serial ports.
    ListPorts {
        /// Print a JSON array on stdout.
        #[arg(long)]
        json: bool,
    },

    /// Start the interactive shell.
    Shell,

    /// Print a completion script.
    Completions {
        /// Shell type.
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn parse_size(s: &str) -> Result<MemorySize, String> {
    s.parse()
}

fn parse_addr_arg(s: &str) -> Result<u16, String> {
    parse_addr(s).ok_or_else(|| format!("Addr {s} is wrong"))
}

fn parse_byte_arg(s: &str) -> Result<u8, String> {
    let value = parse_number(s).ok_or_else(|| format!("Byte {s} is wrong"))?;
    u8::try_from(value).map_err(|_| format!("Byte {value} must be between 0-255"))
}

fn init_logging(cli: &Cli) {
    let log_level = if cli.quiet {
        "warn"
    } else {
        match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level))
        .format_target(cli.verbose >= 2)
        .format_timestamp(if cli.verbose >= 2 {
            Some(env_logger::TimestampPrecision::Millis)
        } else {
            None
        })
        .init();
}

fn main() -> ExitCode {
    let stderr_is_tty = console::Term::stderr().is_term();
    STDERR_IS_TTY.store(stderr_is_tty, Ordering::Relaxed);

    if env::var("NO_COLOR").is_ok() || !stderr_is_tty {
        console::set_colors_enabled(false);
        console::set_colors_enabled_stderr(false);
    }

    let cli = Cli::parse();
    init_logging(&cli);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{} {err:#}", style("Error:").red().bold());
            let code = err
                .downcast_ref::<CliError>()
                .map_or(1, CliError::exit_code);
            ExitCode::from(code)
        },
    }
}

fn run(cli: &Cli) -> Result<()> {
    debug!(
        "eeprog v{} (verbose level: {})",
        env!("CARGO_PKG_VERSION"),
        cli.verbose
    );

    let mut config = if let Some(ref path) = cli.config_path {
        Config::load_from_path(path)
    } else {
        Config::load()
    };

    match &cli.command {
        Commands::Read { file } => {
            let mut eeprom = open_eeprom(cli, &mut config)?;
            transfer::cmd_read(&mut eeprom, file, cli.quiet)?;
        },
        Commands::Write { file } => {
            if !file.is_file() {
                return Err(CliError::Usage(format!("File not found: {}", file.display())).into());
            }
            let mut eeprom = open_eeprom(cli, &mut config)?;
            transfer::cmd_write(&mut eeprom, file, cli.quiet)?;
        },
        Commands::Check { file } => {
            if !file.is_file() {
                return Err(CliError::Usage(format!("File not found: {}", file.display())).into());
            }
            let mut eeprom = open_eeprom(cli, &mut config)?;
            transfer::cmd_check(&mut eeprom, file, cli.quiet)?;
        },
        Commands::Ping => {
            let mut eeprom = open_eeprom(cli, &mut config)?;
            device::cmd_ping(&mut eeprom)?;
        },
        Commands::ReadAddr { addr } => {
            let mut eeprom = open_eeprom(cli, &mut config)?;
            device::cmd_read_addr(&mut eeprom, *addr)?;
        },
        Commands::WriteAddr { addr, byte } => {
            let mut eeprom = open_eeprom(cli, &mut config)?;
            device::cmd_write_addr(&mut eeprom, *addr, *byte)?;
        },
        Commands::ListPorts { json } => device::cmd_list_ports(*json)?,
        Commands::Shell => {
            let port = cli
                .port
                .clone()
                .or_else(|| {
                    config
                        .port
                        .connection
                        .serial
                        .clone()
                })
                .or_else(|| {
                    eeprog::auto_detect_port()
                        .ok()
                        .map(|p| p.name)
                });
            shell::cmd_shell(port, memory_size(cli, &config), cli.quiet)?;
        },
        Commands::Completions { shell } => completions::cmd_completions(*shell),
    }

    Ok(())
}

/// Effective memory size: CLI/env first, then config, then 32 KiB.
fn memory_size(cli: &Cli, config: &Config) -> MemorySize {
    cli.size
        .or_else(|| {
            config
                .eeprom
                .memory_size()
        })
        .unwrap_or_default()
}

/// Resolve the port, offering to remember a newly chosen bridge.
fn get_port(cli: &Cli, config: &mut Config) -> Result<String> {
    let options = SerialOptions {
        port: cli
            .port
            .clone(),
        non_interactive: cli.non_interactive,
    };

    let selected = select_serial_port(&options, config)?;

    if !selected.is_known && !cli.non_interactive && cli.port.is_none() {
        ask_remember_port(&selected.port, config)?;
    }

    Ok(selected
        .port
        .name)
}

/// Select a port and open the programmer on it.
fn open_eeprom(cli: &Cli, config: &mut Config) -> Result<Eeprom<NativePort>> {
    let port = get_port(cli, config)?;
    let size = memory_size(cli, config);
    if !cli.quiet {
        eprintln!(
            "{} Using {} ({} bytes)",
            style("🔌").cyan(),
            style(&port).cyan(),
            size.bytes()
        );
    }
    Eeprom::open(&port, size).with_context(|| format!("Failed to open programmer on {port}"))
}
