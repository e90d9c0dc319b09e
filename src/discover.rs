use std::io::Write;

use tracing::info;

use crate::config::Configuration;
use crate::error::{Error, Result};
use crate::transport::Transport;

pub fn run<T, W>(config: &Configuration, transport: &T, out: &mut W) -> Result<()>
where
    T: Transport + ?Sized,
    W: Write,
{
    writeln!(out, "Searching for LXI devices - please wait...").map_err(Error::stdout)?;
    out.flush().map_err(Error::stdout)?;

    let devices = transport.discover(config.timeout())?;
    info!(count = devices.len(), "discovery finished");

    for dev in &devices {
        writeln!(out, "  Found \"{}\" on address {}", dev.id, dev.address)
            .map_err(Error::stdout)?;
    }
    writeln!(out, "\nFound {} device(s)", devices.len()).map_err(Error::stdout)
}
