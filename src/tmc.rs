//! TMC / IEEE 488.2 definite-length block decoding.
//!
//! A block reply looks like `#<n><n length digits><payload><terminator>`,
//! e.g. `#15HELLO\n`. `#0` introduces an indefinite-length block whose payload
//! runs up to the final terminator byte.

use thiserror::Error;
use tracing::debug;

pub const BLOCK_MARKER: u8 = b'#';

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("reply is {0} bytes, too short for a block header")]
    TooShort(usize),
    #[error("expected block marker '#', got 0x{0:02X}")]
    BadMarker(u8),
    #[error("invalid digit count 0x{0:02X} in block header")]
    BadDigitCount(u8),
    #[error("invalid length digit 0x{0:02X} in block header")]
    BadLengthDigit(u8),
    #[error("block declares {declared} payload bytes but {available} follow the header")]
    LengthMismatch { declared: usize, available: usize },
    #[error("block is missing its terminator")]
    MissingTerminator,
}

/// Payload bytes with framing removed. Owns its buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedPayload {
    bytes: Vec<u8>,
}

impl DecodedPayload {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Parsed `#<n><digits>` prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    /// Bytes taken by the header itself (`n + 2`).
    pub header_len: usize,
    /// Declared payload length, `None` for an indefinite-length (`#0`) block.
    pub payload_len: Option<usize>,
}

/// Parse the block header at the start of `buf`.
///
/// Returns `Ok(None)` when `buf` is a valid but incomplete prefix, which lets
/// a stream reader keep reading.
pub fn parse_header(buf: &[u8]) -> Result<Option<BlockHeader>, DecodeError> {
    let Some(&marker) = buf.first() else {
        return Ok(None);
    };
    if marker != BLOCK_MARKER {
        return Err(DecodeError::BadMarker(marker));
    }
    let Some(&count) = buf.get(1) else {
        return Ok(None);
    };
    if !count.is_ascii_digit() {
        return Err(DecodeError::BadDigitCount(count));
    }
    let n = usize::from(count - b'0');
    let header_len = n + 2;
    if n == 0 {
        return Ok(Some(BlockHeader {
            header_len,
            payload_len: None,
        }));
    }

    let digits = &buf[2..buf.len().min(header_len)];
    let mut len: usize = 0;
    for &d in digits {
        if !d.is_ascii_digit() {
            return Err(DecodeError::BadLengthDigit(d));
        }
        len = len * 10 + usize::from(d - b'0');
    }
    if digits.len() < n {
        return Ok(None);
    }
    Ok(Some(BlockHeader {
        header_len,
        payload_len: Some(len),
    }))
}

/// Strip the block header and trailing terminator from a raw reply.
pub fn decode_block(raw: &[u8]) -> Result<DecodedPayload, DecodeError> {
    let header = parse_header(raw)?.ok_or(DecodeError::TooShort(raw.len()))?;
    let body = &raw[header.header_len..];

    let payload = match header.payload_len {
        Some(declared) => {
            if body.len() == declared {
                return Err(DecodeError::MissingTerminator);
            }
            if body.len() != declared + 1 {
                return Err(DecodeError::LengthMismatch {
                    declared,
                    available: body.len(),
                });
            }
            &body[..declared]
        }
        None => match body.split_last() {
            Some((_, payload)) => payload,
            None => return Err(DecodeError::MissingTerminator),
        },
    };

    debug!(
        header_len = header.header_len,
        payload_len = payload.len(),
        "decoded block"
    );
    Ok(DecodedPayload::new(payload.to_vec()))
}

/// Decode any reply: blocks via [`decode_block`], text by dropping the
/// trailing newline (and a carriage return before it).
pub fn extract_payload(raw: &[u8]) -> Result<DecodedPayload, DecodeError> {
    if raw.first() == Some(&BLOCK_MARKER) {
        return decode_block(raw);
    }
    let text = raw.strip_suffix(b"\n").unwrap_or(raw);
    let text = text.strip_suffix(b"\r").unwrap_or(text);
    Ok(DecodedPayload::new(text.to_vec()))
}

/// Build a definite-length block around `payload`, terminated by `\n`.
#[cfg(test)]
pub(crate) fn encode_block(payload: &[u8]) -> Vec<u8> {
    let len = payload.len().to_string();
    let mut out = Vec::with_capacity(payload.len() + len.len() + 3);
    out.push(BLOCK_MARKER);
    out.push(b'0' + len.len() as u8);
    out.extend_from_slice(len.as_bytes());
    out.extend_from_slice(payload);
    out.push(b'\n');
    out
}
