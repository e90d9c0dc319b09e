//! Resolution of parsed command-line arguments into a validated [`Configuration`].

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::cli::{Cli, Cmd, DiscoverOpts, ScpiOpts};
use crate::error::Result;

/// Sent when `scpi` is given nothing else to do.
pub const DEFAULT_SCPI_COMMAND: &str = "*IDN?";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum UsageError {
    #[error("unknown arguments: {}", .0.join(" "))]
    UnknownArguments(Vec<String>),
    #[error("--ip is required to reach an instrument")]
    AddressRequired,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("no IP address specified")]
    NoAddress,
    #[error("--dump-file and --run-script cannot be used together")]
    DumpFileWithScript,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Discover,
    SendCommand,
}

/// Everything one invocation needs, fixed after parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Configuration {
    pub command: Command,
    pub timeout_secs: u64,
    /// Empty until `--ip` is given.
    pub target_address: String,
    /// Empty in interactive/script mode when no inline command was given.
    pub scpi_command: String,
    pub dump_hex: bool,
    pub dump_file: Option<PathBuf>,
    pub interactive: bool,
    pub script: Option<PathBuf>,
    pub debug: bool,
}

impl Configuration {
    fn new(command: Command, timeout_secs: u64, debug: bool) -> Self {
        Self {
            command,
            timeout_secs,
            target_address: String::new(),
            scpi_command: String::new(),
            dump_hex: false,
            dump_file: None,
            interactive: false,
            script: None,
            debug,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn has_inline_command(&self) -> bool {
        !self.scpi_command.is_empty()
    }
}

/// What the binary should do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invocation {
    Help,
    Version,
    Run(Configuration),
}

pub fn resolve(cli: Cli) -> Result<Invocation> {
    if cli.version {
        return Ok(Invocation::Version);
    }
    let config = match cli.cmd {
        None => return Ok(Invocation::Help),
        Some(Cmd::Discover(opts)) => from_discover(opts)?,
        Some(Cmd::Scpi(opts)) => from_scpi(opts)?,
    };
    Ok(Invocation::Run(config))
}

fn from_discover(opts: DiscoverOpts) -> Result<Configuration> {
    if !opts.rest.is_empty() {
        return Err(UsageError::UnknownArguments(opts.rest).into());
    }
    Ok(Configuration::new(Command::Discover, opts.timeout, opts.debug))
}

fn from_scpi(opts: ScpiOpts) -> Result<Configuration> {
    let mut config = Configuration::new(Command::SendCommand, opts.timeout, opts.debug);
    config.target_address = opts.ip.unwrap_or_default();
    config.dump_hex = opts.dump_hex;
    config.dump_file = opts.dump_file.filter(|p| !p.as_os_str().is_empty());
    config.interactive = opts.interactive;
    config.script = opts.run_script;

    if config.dump_file.is_some() && config.script.is_some() {
        return Err(ConfigError::DumpFileWithScript.into());
    }

    let mut positional = opts.args.into_iter();
    if let Some(cmd) = positional.next() {
        config.scpi_command = cmd;
        if config.target_address.is_empty() {
            return Err(ConfigError::NoAddress.into());
        }
    }

    let rest: Vec<String> = positional.collect();
    if !rest.is_empty() {
        return Err(UsageError::UnknownArguments(rest).into());
    }

    if !config.has_inline_command() && !config.interactive && config.script.is_none() {
        config.scpi_command = DEFAULT_SCPI_COMMAND.to_string();
    }
    Ok(config)
}
