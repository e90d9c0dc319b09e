//! Client for LXI instruments: SCPI over the raw socket, TMC block decoding
//! and screenshot capture.

use tracing_subscriber::EnvFilter;

pub mod cli;
pub mod config;
pub mod discover;
pub mod error;
pub mod output;
pub mod scpi;
pub mod screenshot;
pub mod tmc;
pub mod transport;

pub use config::{Command, Configuration, Invocation};
pub use error::{Error, Result};
pub use tmc::{DecodedPayload, decode_block};
pub use transport::{Connection, TcpTransport, Transport, TransportError};

/// Log to stderr: `RUST_LOG` if set, `warn` otherwise, `debug` when forced.
pub fn init_logging(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
