use std::path::Path;
use std::time::Duration;

use tracing::debug;

use crate::error::Result;
use crate::output;
use crate::tmc::{self, DecodedPayload};
use crate::transport::Transport;

/// Query returning the display bitmap as a TMC block.
pub const DISPLAY_DATA_QUERY: &str = "display:data?";

/// Fetch the display bitmap. A reply that is not a well-formed block is an error.
pub fn capture<T: Transport + ?Sized>(
    transport: &T,
    address: &str,
    timeout: Duration,
) -> Result<DecodedPayload> {
    let mut conn = transport.connect(address, timeout)?;
    conn.send(format!("{DISPLAY_DATA_QUERY}\n").as_bytes(), timeout)?;
    let raw = conn.receive(timeout)?;
    debug!(len = raw.len(), "display data received");
    Ok(tmc::decode_block(&raw)?)
}

/// Capture and save to `path`; returns the bitmap size.
pub fn save<T: Transport + ?Sized>(
    transport: &T,
    address: &str,
    path: &Path,
    timeout: Duration,
) -> Result<usize> {
    let bitmap = capture(transport, address, timeout)?;
    output::write_file(path, bitmap.as_bytes())?;
    Ok(bitmap.len())
}
