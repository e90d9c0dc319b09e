use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, trace};

use crate::tmc;

/// LXI raw socket SCPI port.
pub const RAW_SOCKET_PORT: u16 = 5025;
/// Upper bound on a single reply.
pub const MAX_RESPONSE_LEN: usize = 64 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("cannot resolve address {0}")]
    Resolve(String),
    #[error("connect to {addr}: {source}")]
    Connect { addr: String, source: io::Error },
    #[error("send failed: {0}")]
    Send(#[source] io::Error),
    #[error("receive failed: {0}")]
    Receive(#[source] io::Error),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("connection closed by instrument")]
    Closed,
    #[error("reply exceeds {0} bytes")]
    TooLarge(usize),
    #[error("{0} is not supported by this transport")]
    Unsupported(&'static str),
}

/// An instrument found by [`Transport::discover`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub address: String,
    pub id: String,
}

/// Opens connections to instruments.
pub trait Transport {
    fn connect(&self, address: &str, timeout: Duration)
    -> Result<Box<dyn Connection>, TransportError>;

    /// Search the local network for instruments.
    fn discover(&self, timeout: Duration) -> Result<Vec<DeviceInfo>, TransportError>;
}

/// One open instrument connection.
pub trait Connection {
    fn send(&mut self, data: &[u8], timeout: Duration) -> Result<(), TransportError>;

    /// Receive one complete reply.
    fn receive(&mut self, timeout: Duration) -> Result<Vec<u8>, TransportError>;
}

/// SCPI over the raw TCP socket.
#[derive(Debug, Clone, Copy)]
pub struct TcpTransport {
    pub port: u16,
}

impl Default for TcpTransport {
    fn default() -> Self {
        Self {
            port: RAW_SOCKET_PORT,
        }
    }
}

impl TcpTransport {
    fn resolve(&self, address: &str) -> Result<SocketAddr, TransportError> {
        if let Ok(addr) = address.parse::<SocketAddr>() {
            return Ok(addr);
        }
        (address, self.port)
            .to_socket_addrs()
            .map_err(|_| TransportError::Resolve(address.to_string()))?
            .next()
            .ok_or_else(|| TransportError::Resolve(address.to_string()))
    }
}

impl Transport for TcpTransport {
    fn connect(
        &self,
        address: &str,
        timeout: Duration,
    ) -> Result<Box<dyn Connection>, TransportError> {
        let addr = self.resolve(address)?;
        debug!(%addr, ?timeout, "connecting");
        let stream = TcpStream::connect_timeout(&addr, timeout).map_err(|e| {
            if is_timeout(&e) {
                TransportError::Timeout(timeout)
            } else {
                TransportError::Connect {
                    addr: addr.to_string(),
                    source: e,
                }
            }
        })?;
        stream.set_nodelay(true).map_err(TransportError::Send)?;
        Ok(Box::new(TcpConnection { stream }))
    }

    fn discover(&self, _timeout: Duration) -> Result<Vec<DeviceInfo>, TransportError> {
        Err(TransportError::Unsupported("discovery"))
    }
}

pub struct TcpConnection {
    stream: TcpStream,
}

impl Connection for TcpConnection {
    fn send(&mut self, data: &[u8], timeout: Duration) -> Result<(), TransportError> {
        self.stream
            .set_write_timeout(Some(timeout))
            .map_err(TransportError::Send)?;
        self.stream.write_all(data).map_err(|e| {
            if is_timeout(&e) {
                TransportError::Timeout(timeout)
            } else {
                TransportError::Send(e)
            }
        })?;
        trace!(len = data.len(), "sent");
        Ok(())
    }

    fn receive(&mut self, timeout: Duration) -> Result<Vec<u8>, TransportError> {
        read_reply(&mut self.stream, timeout)
    }
}

/// A reader whose blocking time can be capped before each read.
pub(crate) trait TimedRead: Read {
    fn set_read_limit(&mut self, limit: Duration) -> io::Result<()>;
}

impl TimedRead for TcpStream {
    fn set_read_limit(&mut self, limit: Duration) -> io::Result<()> {
        self.set_read_timeout(Some(limit))
    }
}

/// Read from `reader` until one reply is complete. `timeout` bounds the whole
/// reply, not each read.
pub(crate) fn read_reply<R: TimedRead>(
    reader: &mut R,
    timeout: Duration,
) -> Result<Vec<u8>, TransportError> {
    let deadline = Instant::now() + timeout;
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(TransportError::Timeout(timeout));
        }
        reader
            .set_read_limit(remaining)
            .map_err(TransportError::Receive)?;
        let n = match reader.read(&mut chunk) {
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) if is_timeout(&e) => return Err(TransportError::Timeout(timeout)),
            Err(e) => return Err(TransportError::Receive(e)),
        };
        if n == 0 {
            if buf.is_empty() {
                return Err(TransportError::Closed);
            }
            debug!(len = buf.len(), "instrument closed connection mid-reply");
            return Ok(buf);
        }
        buf.extend_from_slice(&chunk[..n]);
        if buf.len() > MAX_RESPONSE_LEN {
            return Err(TransportError::TooLarge(MAX_RESPONSE_LEN));
        }
        if reply_complete(&buf) {
            trace!(len = buf.len(), "received");
            return Ok(buf);
        }
    }
}

/// Whether `buf` holds a whole reply: a block with its terminator, or a
/// newline-terminated text line.
fn reply_complete(buf: &[u8]) -> bool {
    if buf.first() != Some(&tmc::BLOCK_MARKER) {
        return buf.ends_with(b"\n");
    }
    match tmc::parse_header(buf) {
        Ok(Some(tmc::BlockHeader {
            header_len,
            payload_len: Some(len),
        })) => buf.len() > header_len + len,
        Ok(Some(tmc::BlockHeader {
            payload_len: None, ..
        })) => buf.len() > 2 && buf.ends_with(b"\n"),
        Ok(None) => false,
        // let the decoder report the defect
        Err(_) => buf.ends_with(b"\n"),
    }
}

fn is_timeout(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
    )
}
