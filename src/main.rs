use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use std::io;

use lxi::cli::Cli;
use lxi::{Command, Invocation, TcpTransport, config, discover, scpi};

fn main() -> Result<()> {
    let args = Cli::parse();
    let config = match config::resolve(args)? {
        Invocation::Help => {
            Cli::command().print_help()?;
            return Ok(());
        }
        Invocation::Version => {
            println!("lxi v{}", env!("CARGO_PKG_VERSION"));
            return Ok(());
        }
        Invocation::Run(config) => config,
    };
    lxi::init_logging(config.debug);

    let transport = TcpTransport::default();
    let mut out = io::stdout().lock();
    match config.command {
        Command::Discover => discover::run(&config, &transport, &mut out).context("discover")?,
        Command::SendCommand => scpi::run(&config, &transport, io::stdin().lock(), &mut out)?,
    }
    Ok(())
}
