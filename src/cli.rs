use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "lxi",
    about = "Send SCPI commands to LXI instruments",
    disable_version_flag = true
)]
pub struct Cli {
    /// Display version
    #[arg(short = 'v', long = "version")]
    pub version: bool,
    #[command(subcommand)]
    pub cmd: Option<Cmd>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Cmd {
    /// Search for LXI devices
    Discover(DiscoverOpts),
    /// Send SCPI command
    Scpi(ScpiOpts),
}

#[derive(Args, Debug, Clone)]
pub struct DiscoverOpts {
    /// Timeout in seconds
    #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: u64,
    /// Log protocol activity to stderr
    #[arg(short, long, default_value_t = false)]
    pub debug: bool,
    #[arg(hide = true)]
    pub rest: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct ScpiOpts {
    /// IP address
    #[arg(short, long)]
    pub ip: Option<String>,
    /// Timeout in seconds
    #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: u64,
    /// Print response in hexadecimal
    #[arg(short = 'x', long, default_value_t = false)]
    pub dump_hex: bool,
    /// Save response to file
    #[arg(short = 'f', long, value_name = "FILENAME")]
    pub dump_file: Option<PathBuf>,
    /// Enter interactive mode
    #[arg(short = 'a', long, default_value_t = false)]
    pub interactive: bool,
    /// Run script
    #[arg(short, long, value_name = "FILENAME")]
    pub run_script: Option<PathBuf>,
    /// Log protocol activity to stderr
    #[arg(short, long, default_value_t = false)]
    pub debug: bool,
    /// SCPI command, e.g. "*IDN?"
    #[arg(value_name = "SCPI_COMMAND")]
    pub args: Vec<String>,
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "lxi-screenshot",
    version,
    about = "Capture a bitmap screenshot from an LXI oscilloscope"
)]
pub struct ScreenshotCli {
    /// Instrument IP address
    pub ip: String,
    /// Destination file for the bitmap
    pub filename: PathBuf,
    /// Timeout in seconds
    #[arg(short, long, default_value_t = 5, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: u64,
    /// Log protocol activity to stderr
    #[arg(short, long, default_value_t = false)]
    pub debug: bool,
}
