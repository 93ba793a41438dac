//! Interactive programmer shell.
//!
//! ```text
//! Prog> size
//! 32768
//! Prog> read addr 0x10
//! ...
//! Prog> quit
//! ```
//!
//! On a terminal the prompt has history and prefix completion. With piped
//! stdin, commands are read line by line without a prompt so the shell can
//! be scripted.

use {
    super::{device, parse_addr, parse_number, transfer},
    crate::serial::map_prompt_error,
    anyhow::{Context, Result, anyhow},
    dialoguer::{
        BasicHistory, Completion, Input, Select,
        theme::{ColorfulTheme, Theme},
    },
    eeprog::{Eeprom, MemorySize, NativePort, detect_ports, device::format_port_list},
    log::{debug, warn},
    std::{
        fmt, fs,
        io::{self, BufRead, IsTerminal},
        path::PathBuf,
    },
};

const PROMPT: &str = "Prog";

/// Every command line the shell understands, used for help and completion.
const COMMANDS: &[&str] = &[
    "help",
    "quit",
    "ping",
    "serial",
    "set serial",
    "size",
    "set size",
    "read",
    "read addr",
    "write",
    "write addr",
    "check",
    "show",
];

/// Commands whose argument is a local file.
const FILE_COMMANDS: &[&str] = &["read", "write", "check", "show"];

/// One parsed shell line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ShellCommand {
    /// Blank or unrecognised line.
    Nothing,
    Help,
    Quit,
    Ping,
    ShowSerial,
    SetSerial,
    ShowSize,
    SetSize,
    Read(PathBuf),
    Write(PathBuf),
    Check(PathBuf),
    Show(PathBuf),
    ReadAddr(u16),
    WriteAddr { addr: u16, value: u8 },
}

/// Split off `word` when it is the first whitespace-separated token of `text`.
fn strip_word<'a>(text: &'a str, word: &str) -> Option<&'a str> {
    let rest = text.strip_prefix(word)?;
    if rest.is_empty() || rest.starts_with(char::is_whitespace) {
        Some(rest.trim())
    } else {
        None
    }
}

fn file_arg(rest: &str) -> Result<PathBuf, String> {
    if rest.is_empty() {
        Err("filename?".to_string())
    } else {
        Ok(PathBuf::from(rest))
    }
}

fn parse_read_addr(args: &str) -> Result<ShellCommand, String> {
    if args.is_empty() {
        return Err("addr?".to_string());
    }
    let addr = parse_addr(args).ok_or_else(|| format!("Addr {args} is wrong"))?;
    Ok(ShellCommand::ReadAddr(addr))
}

fn parse_write_addr(args: &str) -> Result<ShellCommand, String> {
    let mut parts = args.split_whitespace();
    let (Some(addr_text), Some(byte_text)) = (parts.next(), parts.next()) else {
        return Err("addr or/and byte?".to_string());
    };
    let addr = parse_addr(addr_text).ok_or_else(|| format!("Addr {addr_text} is wrong"))?;
    let byte = parse_number(byte_text).ok_or_else(|| format!("Byte {byte_text} is wrong"))?;
    let value = u8::try_from(byte).map_err(|_| format!("Byte {byte} must be between 0-255"))?;
    Ok(ShellCommand::WriteAddr { addr, value })
}

/// Parse a shell line. `Err` carries the message to show the user.
pub(crate) fn parse_line(line: &str) -> Result<ShellCommand, String> {
    let line = line.trim();
    let (word, rest) = line
        .split_once(char::is_whitespace)
        .map_or((line, ""), |(word, rest)| (word, rest.trim()));

    match word {
        "help" => Ok(ShellCommand::Help),
        "quit" | "exit" => Ok(ShellCommand::Quit),
        "ping" => Ok(ShellCommand::Ping),
        "serial" => Ok(ShellCommand::ShowSerial),
        "size" => Ok(ShellCommand::ShowSize),
        "set" if strip_word(rest, "serial").is_some() => Ok(ShellCommand::SetSerial),
        "set" if strip_word(rest, "size").is_some() => Ok(ShellCommand::SetSize),
        "read" => match strip_word(rest, "addr") {
            Some(args) => parse_read_addr(args),
            None => file_arg(rest).map(ShellCommand::Read),
        },
        "write" => match strip_word(rest, "addr") {
            Some(args) => parse_write_addr(args),
            None => file_arg(rest).map(ShellCommand::Write),
        },
        "check" => file_arg(rest).map(ShellCommand::Check),
        "show" => file_arg(rest).map(ShellCommand::Show),
        _ => Ok(ShellCommand::Nothing),
    }
}

fn usage() -> String {
    let mut text = String::from("commands:\n");
    for command in COMMANDS {
        text.push_str("    ");
        text.push_str(command);
        text.push('\n');
    }
    text
}

/// Canonical hex dump: offset, 16 bytes split in two groups, printable ASCII.
pub(crate) fn hexdump(data: &[u8]) -> String {
    let mut out = String::new();
    for (line, chunk) in data
        .chunks(16)
        .enumerate()
    {
        out.push_str(&format!("{:08x}  ", line * 16));
        for i in 0..16 {
            match chunk.get(i) {
                Some(byte) => out.push_str(&format!("{byte:02x} ")),
                None => out.push_str("   "),
            }
            if i == 7 {
                out.push(' ');
            }
        }
        out.push_str(" |");
        out.extend(chunk.iter().map(|&b| {
            if b.is_ascii_graphic() || b == b' ' {
                b as char
            } else {
                '.'
            }
        }));
        out.push_str("|\n");
    }
    out
}

/// First command line (or file argument) extending `input`.
fn complete(input: &str, files: &[String]) -> Option<String> {
    let mut candidates: Vec<String> = COMMANDS
        .iter()
        .map(|c| (*c).to_string())
        .collect();
    if let Some((command, _)) = input.split_once(' ') {
        if FILE_COMMANDS.contains(&command) {
            candidates.extend(
                files
                    .iter()
                    .map(|f| format!("{command} {f}")),
            );
        }
    }
    candidates
        .into_iter()
        .find(|c| c.len() > input.len() && c.starts_with(input))
}

fn local_files() -> Vec<String> {
    let Ok(entries) = fs::read_dir(".") else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            entry
                .file_name()
                .into_string()
                .ok()
        })
        .collect();
    names.sort();
    names
}

struct ShellCompletion;

impl Completion for ShellCompletion {
    fn get(&self, input: &str) -> Option<String> {
        complete(input, &local_files())
    }
}

/// Renders the prompt as `Prog> `.
struct ShellTheme;

impl Theme for ShellTheme {
    fn format_input_prompt(
        &self,
        f: &mut dyn fmt::Write,
        prompt: &str,
        _default: Option<&str>,
    ) -> fmt::Result {
        write!(f, "{prompt}> ")
    }

    fn format_input_prompt_selection(
        &self,
        f: &mut dyn fmt::Write,
        prompt: &str,
        sel: &str,
    ) -> fmt::Result {
        write!(f, "{prompt}> {sel}")
    }
}

/// Where shell lines come from.
enum LineSource {
    Terminal(BasicHistory),
    Piped(io::Lines<io::StdinLock<'static>>),
}

impl LineSource {
    fn new() -> Self {
        if io::stdin().is_terminal() && io::stderr().is_terminal() {
            Self::Terminal(
                BasicHistory::new()
                    .max_entries(64)
                    .no_duplicates(true),
            )
        } else {
            Self::Piped(
                io::stdin()
                    .lock()
                    .lines(),
            )
        }
    }

    /// Next line, or `None` at end of input.
    fn read_line(&mut self) -> Result<Option<String>> {
        match self {
            Self::Terminal(history) => {
                let line = Input::<String>::with_theme(&ShellTheme)
                    .with_prompt(PROMPT)
                    .allow_empty(true)
                    .history_with(history)
                    .completion_with(&ShellCompletion)
                    .interact_text();
                match line {
                    Ok(line) => Ok(Some(line)),
                    Err(dialoguer::Error::IO(e))
                        if matches!(
                            e.kind(),
                            io::ErrorKind::Interrupted | io::ErrorKind::UnexpectedEof
                        ) =>
                    {
                        Ok(None)
                    },
                    Err(e) => Err(map_prompt_error(e)),
                }
            },
            Self::Piped(lines) => lines
                .next()
                .transpose()
                .context("Failed to read command"),
        }
    }

    /// Let the user pick one of `items`.
    fn choose(&mut self, prompt: &str, items: &[String]) -> Result<Option<usize>> {
        match self {
            Self::Terminal(_) => Select::with_theme(&ColorfulTheme::default())
                .with_prompt(prompt)
                .items(items)
                .default(0)
                .interact_opt()
                .map_err(map_prompt_error),
            Self::Piped(_) => {
                for (i, item) in items
                    .iter()
                    .enumerate()
                {
                    println!("\t{i} {item}");
                }
                let Some(answer) = self.read_line()? else {
                    return Ok(None);
                };
                match parse_number(&answer)
                    .and_then(|i| usize::try_from(i).ok())
                    .filter(|&i| i < items.len())
                {
                    Some(i) => Ok(Some(i)),
                    None => {
                        println!("wrong choice");
                        Ok(None)
                    },
                }
            },
        }
    }
}

enum Flow {
    Continue,
    Quit,
}

/// Shell state: selected port and size, plus the lazily opened connection.
struct Session {
    port_name: Option<String>,
    size: MemorySize,
    eeprom: Option<Eeprom<NativePort>>,
    quiet: bool,
}

impl Session {
    fn new(port_name: Option<String>, size: MemorySize, quiet: bool) -> Self {
        Self {
            port_name,
            size,
            eeprom: None,
            quiet,
        }
    }

    /// Open the connection on first use.
    fn eeprom(&mut self) -> Result<&mut Eeprom<NativePort>> {
        let eeprom = match self
            .eeprom
            .take()
        {
            Some(eeprom) => eeprom,
            None => {
                let port = self
                    .port_name
                    .as_deref()
                    .ok_or_else(|| anyhow!("No serial port selected, use 'set serial'"))?;
                debug!("Opening {port}");
                Eeprom::open(port, self.size).with_context(|| format!("Failed to open {port}"))?
            },
        };
        Ok(self
            .eeprom
            .insert(eeprom))
    }

    fn release(&mut self) {
        if let Some(mut eeprom) = self
            .eeprom
            .take()
        {
            if let Err(e) = eeprom.close() {
                warn!("Failed to close port: {e}");
            }
        }
    }

    fn set_port(&mut self, port: String) {
        self.release();
        self.port_name = Some(port);
    }

    fn set_size(&mut self, size: MemorySize) {
        self.size = size;
        if let Some(eeprom) = &mut self.eeprom {
            eeprom.set_size(size);
        }
    }

    fn execute(&mut self, command: ShellCommand, input: &mut LineSource) -> Result<Flow> {
        let quiet = self.quiet;
        match command {
            ShellCommand::Nothing => {},
            ShellCommand::Help => eprint!("{}", usage()),
            ShellCommand::Quit => return Ok(Flow::Quit),
            ShellCommand::Ping => device::cmd_ping(self.eeprom()?)?,
            ShellCommand::ShowSerial => {
                println!("{}", self.port_name.as_deref().unwrap_or("<none>"));
            },
            ShellCommand::SetSerial => {
                let ports = detect_ports();
                if ports.is_empty() {
                    println!("No serial ports found!");
                } else if let Some(port) = input
                    .choose("Ports", &format_port_list(&ports))?
                    .and_then(|index| ports.get(index))
                {
                    self.set_port(
                        port.name
                            .clone(),
                    );
                }
            },
            ShellCommand::ShowSize => println!("{}", self.size),
            ShellCommand::SetSize => {
                let labels: Vec<String> = MemorySize::ALL
                    .iter()
                    .map(ToString::to_string)
                    .collect();
                if let Some(&size) = input
                    .choose("Size", &labels)?
                    .and_then(|index| MemorySize::ALL.get(index))
                {
                    self.set_size(size);
                }
            },
            ShellCommand::Read(file) => transfer::cmd_read(self.eeprom()?, &file, quiet)?,
            ShellCommand::Write(file) => transfer::cmd_write(self.eeprom()?, &file, quiet)?,
            ShellCommand::Check(file) => {
                transfer::cmd_check(self.eeprom()?, &file, quiet)?;
            },
            ShellCommand::Show(file) => {
                let data =
                    fs::read(&file).with_context(|| format!("Failed to read '{}'", file.display()))?;
                print!("{}", hexdump(&data));
            },
            ShellCommand::ReadAddr(addr) => device::cmd_read_addr(self.eeprom()?, addr)?,
            ShellCommand::WriteAddr { addr, value } => {
                device::cmd_write_addr(self.eeprom()?, addr, value)?;
            },
        }
        Ok(Flow::Continue)
    }
}

/// Run the shell until `quit` or end of input.
pub(crate) fn cmd_shell(port: Option<String>, size: MemorySize, quiet: bool) -> Result<()> {
    let mut session = Session::new(port, size, quiet);
    let mut input = LineSource::new();

    while let Some(line) = input.read_line()? {
        match parse_line(&line) {
            Ok(command) => match session.execute(command, &mut input) {
                Ok(Flow::Continue) => {},
                Ok(Flow::Quit) => break,
                Err(e) => println!("error: {e:#}"),
            },
            Err(message) => println!("{message}"),
        }
    }

    session.release();
    Ok(())
}
