use anyhow::{Context, Result};
use clap::Parser;
use std::time::Duration;

use lxi::TcpTransport;
use lxi::cli::ScreenshotCli;
use lxi::screenshot;

fn main() -> Result<()> {
    let args = ScreenshotCli::parse();
    lxi::init_logging(args.debug);

    let n = screenshot::save(
        &TcpTransport::default(),
        &args.ip,
        &args.filename,
        Duration::from_secs(args.timeout),
    )
    .with_context(|| format!("capturing screenshot from {}", args.ip))?;

    tracing::info!(bytes = n, "screenshot captured");
    println!("Saved screenshot to {}", args.filename.display());
    Ok(())
}
