//! Protocol codec
//!
//! Encoding and decoding of RESP values.
//!
//! ## Wire Format
//! ```text
//! +OK\r\n                      simple string
//! -invalid command syntax\r\n  error
//! :1000\r\n                    integer
//! ,3.25\r\n                    double
//! $5\r\nhello\r\n              bulk string    ($-1\r\n is null)
//! *2\r\n$3\r\nGET\r\n$1\r\nk\r\n  array      (*-1\r\n is null)
//! ```
//!
//! Line types end at the first CRLF. Bulk payloads are taken by their declared
//! length and may contain any byte, CRLF included.

use std::io::Write;

use crate::error::{RetainError, Result};
use super::value::is_line_safe;
use super::Value;

pub const SIMPLE_STRING: u8 = b'+';
pub const ERROR: u8 = b'-';
pub const INTEGER: u8 = b':';
pub const DOUBLE: u8 = b',';
pub const BULK_STRING: u8 = b'$';
pub const ARRAY: u8 = b'*';

pub const CRLF: &[u8] = b"\r\n";

/// Maximum bulk string payload (512 MiB)
pub const MAX_BULK_LEN: usize = 512 * 1024 * 1024;

/// Maximum number of elements in one array
pub const MAX_ARRAY_LEN: usize = 1024 * 1024;

/// Maximum array nesting depth
pub const MAX_DEPTH: usize = 32;

/// Maximum length of a line (simple string, error, number, length header)
pub const MAX_LINE_LEN: usize = 64 * 1024;

// =============================================================================
// Encoding
// =============================================================================

/// Encode a value to bytes
///
/// Fails only when a simple string or error carries CR or LF, which would
/// break line framing.
pub fn encode(value: &Value) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    encode_into(value, &mut buf)?;
    Ok(buf)
}

/// Encode a value, appending to `buf`
///
/// On error `buf` may hold a partial encoding and should be discarded.
pub fn encode_into(value: &Value, buf: &mut Vec<u8>) -> Result<()> {
    match value {
        Value::SimpleString(text) => encode_line(buf, SIMPLE_STRING, text)?,
        Value::Error(text) => encode_line(buf, ERROR, text)?,
        Value::Integer(n) => encode_header(buf, INTEGER, &n.to_string()),
        // Display for f64 never uses exponent notation and round-trips exactly
        Value::Double(f) => encode_header(buf, DOUBLE, &f.to_string()),
        Value::BulkString(None) => encode_header(buf, BULK_STRING, "-1"),
        Value::BulkString(Some(bytes)) => {
            encode_header(buf, BULK_STRING, &bytes.len().to_string());
            buf.extend_from_slice(bytes);
            buf.extend_from_slice(CRLF);
        }
        Value::Array(None) => encode_header(buf, ARRAY, "-1"),
        Value::Array(Some(items)) => {
            encode_header(buf, ARRAY, &items.len().to_string());
            for item in items {
                encode_into(item, buf)?;
            }
        }
    }
    Ok(())
}

fn encode_line(buf: &mut Vec<u8>, prefix: u8, text: &str) -> Result<()> {
    if !is_line_safe(text) {
        return Err(RetainError::Encode(format!(
            "'{}' line must not contain CR or LF",
            prefix as char
        )));
    }
    encode_header(buf, prefix, text);
    Ok(())
}

fn encode_header(buf: &mut Vec<u8>, prefix: u8, text: &str) {
    buf.push(prefix);
    buf.extend_from_slice(text.as_bytes());
    buf.extend_from_slice(CRLF);
}

// =============================================================================
// Decoding
// =============================================================================

/// Decode the value at the front of `bytes`
///
/// Trailing bytes after the first complete value are ignored; use
/// [`decode_frame`] to learn how many bytes were consumed.
pub fn decode(bytes: &[u8]) -> Result<Value> {
    decode_frame(bytes).map(|(value, _)| value)
}

/// Decode one value and return it with the number of bytes it occupied
///
/// Returns `RetainError::Incomplete` if `bytes` is a valid but truncated
/// prefix of a frame.
pub fn decode_frame(bytes: &[u8]) -> Result<(Value, usize)> {
    if bytes.is_empty() {
        return Err(RetainError::Decode("empty input".to_string()));
    }

    let mut pos = 0;
    let value = decode_value(bytes, &mut pos, 0)?;
    Ok((value, pos))
}

/// Decode the value starting at `*pos`, advancing `*pos` past it
fn decode_value(src: &[u8], pos: &mut usize, depth: usize) -> Result<Value> {
    let prefix = *src.get(*pos).ok_or(RetainError::Incomplete)?;
    *pos += 1;

    match prefix {
        SIMPLE_STRING => Ok(Value::SimpleString(parse_text(read_line(src, pos)?)?)),
        ERROR => Ok(Value::Error(parse_text(read_line(src, pos)?)?)),
        INTEGER => Ok(Value::Integer(parse_integer(read_line(src, pos)?)?)),
        DOUBLE => Ok(Value::Double(parse_double(read_line(src, pos)?)?)),
        BULK_STRING => decode_bulk(src, pos),
        ARRAY => decode_array(src, pos, depth),
        other => Err(unknown_type(other)),
    }
}

fn decode_bulk(src: &[u8], pos: &mut usize) -> Result<Value> {
    let len = match parse_length(read_line(src, pos)?, MAX_BULK_LEN, "bulk string")? {
        Some(len) => len,
        None => return Ok(Value::BulkString(None)),
    };

    // Payload is taken by length, never by searching for CRLF
    let end = *pos + len;
    if src.len() < end + CRLF.len() {
        return Err(RetainError::Incomplete);
    }
    if &src[end..end + CRLF.len()] != CRLF {
        return Err(missing_bulk_crlf(len));
    }

    let payload = src[*pos..end].to_vec();
    *pos = end + CRLF.len();
    Ok(Value::BulkString(Some(payload)))
}

fn decode_array(src: &[u8], pos: &mut usize, depth: usize) -> Result<Value> {
    if depth >= MAX_DEPTH {
        return Err(too_deep());
    }

    let count = match parse_length(read_line(src, pos)?, MAX_ARRAY_LEN, "array")? {
        Some(count) => count,
        None => return Ok(Value::Array(None)),
    };

    // Cap the up-front allocation; the count comes from the peer
    let mut items = Vec::with_capacity(count.min(64));
    for _ in 0..count {
        items.push(decode_value(src, pos, depth + 1)?);
    }
    Ok(Value::Array(Some(items)))
}

// =============================================================================
// Completeness check
// =============================================================================

/// Resumable check for whether the buffer holds one complete frame
///
/// Walks the frame structure without allocating and remembers the offset of
/// the last complete element, so a frame that arrives over many reads is
/// scanned once overall instead of once per read. Feed it the same growing
/// buffer each time and call [`FrameScanner::reset`] once the frame has been
/// consumed or the buffer discarded.
#[derive(Debug, Default)]
pub(crate) struct FrameScanner {
    /// Offset just past the last complete element
    pos: usize,

    /// Elements still expected by each open array, innermost last
    pending: Vec<usize>,
}

impl FrameScanner {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Length of the frame at the front of `src`
    ///
    /// Returns `RetainError::Incomplete` while more bytes are needed.
    pub(crate) fn scan(&mut self, src: &[u8]) -> Result<usize> {
        loop {
            let mut pos = self.pos;
            let prefix = *src.get(pos).ok_or(RetainError::Incomplete)?;
            pos += 1;

            match prefix {
                SIMPLE_STRING | ERROR | INTEGER | DOUBLE => {
                    read_line(src, &mut pos)?;
                }
                BULK_STRING => {
                    let header = read_line(src, &mut pos)?;
                    if let Some(len) = parse_length(header, MAX_BULK_LEN, "bulk string")? {
                        let end = pos + len;
                        if src.len() < end + CRLF.len() {
                            return Err(RetainError::Incomplete);
                        }
                        if &src[end..end + CRLF.len()] != CRLF {
                            return Err(missing_bulk_crlf(len));
                        }
                        pos = end + CRLF.len();
                    }
                }
                ARRAY => {
                    if self.pending.len() >= MAX_DEPTH {
                        return Err(too_deep());
                    }
                    let header = read_line(src, &mut pos)?;
                    if let Some(count) = parse_length(header, MAX_ARRAY_LEN, "array")? {
                        if count > 0 {
                            self.pos = pos;
                            self.pending.push(count);
                            continue;
                        }
                    }
                }
                other => return Err(unknown_type(other)),
            }

            self.pos = pos;

            // Close every array this element completes
            loop {
                match self.pending.last_mut() {
                    None => return Ok(self.pos),
                    Some(remaining) => {
                        *remaining -= 1;
                        if *remaining > 0 {
                            break;
                        }
                        self.pending.pop();
                    }
                }
            }
        }
    }

    /// Forget all progress; the next scan starts at offset 0
    pub(crate) fn reset(&mut self) {
        self.pos = 0;
        self.pending.clear();
    }
}

/// Read up to the next CRLF, advancing `*pos` past the CRLF
fn read_line<'a>(src: &'a [u8], pos: &mut usize) -> Result<&'a [u8]> {
    let rest = &src[*pos..];

    match rest.windows(CRLF.len()).position(|w| w == CRLF) {
        Some(end) if end > MAX_LINE_LEN => Err(line_too_long()),
        Some(end) => {
            *pos += end + CRLF.len();
            Ok(&rest[..end])
        }
        None if rest.len() > MAX_LINE_LEN => Err(line_too_long()),
        None => Err(RetainError::Incomplete),
    }
}

fn unknown_type(byte: u8) -> RetainError {
    RetainError::Decode(format!("unknown type byte 0x{:02x}", byte))
}

fn missing_bulk_crlf(len: usize) -> RetainError {
    RetainError::Decode(format!("bulk string of length {} not followed by CRLF", len))
}

fn too_deep() -> RetainError {
    RetainError::Decode(format!("arrays nested deeper than {}", MAX_DEPTH))
}

fn line_too_long() -> RetainError {
    RetainError::Decode(format!("line longer than {} bytes", MAX_LINE_LEN))
}

fn parse_text(line: &[u8]) -> Result<String> {
    String::from_utf8(line.to_vec())
        .map_err(|_| RetainError::Decode("line is not valid UTF-8".to_string()))
}

fn parse_integer(line: &[u8]) -> Result<i64> {
    std::str::from_utf8(line)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(|| {
            RetainError::Decode(format!(
                "invalid integer '{}'",
                String::from_utf8_lossy(line)
            ))
        })
}

fn parse_double(line: &[u8]) -> Result<f64> {
    std::str::from_utf8(line)
        .ok()
        .and_then(|s| s.parse::<f64>().ok())
        .ok_or_else(|| {
            RetainError::Decode(format!(
                "invalid double '{}'",
                String::from_utf8_lossy(line)
            ))
        })
}

/// Parse a length header; `-1` means null
fn parse_length(line: &[u8], max: usize, what: &str) -> Result<Option<usize>> {
    let len = parse_integer(line)?;
    if len == -1 {
        return Ok(None);
    }
    if len < 0 {
        return Err(RetainError::Decode(format!(
            "negative {} length {}",
            what, len
        )));
    }

    let len = len as usize;
    if len > max {
        return Err(RetainError::Decode(format!(
            "{} length {} exceeds limit {}",
            what, len, max
        )));
    }
    Ok(Some(len))
}

// =============================================================================
// Stream-based I/O helpers
// =============================================================================

/// Encode a value and write it to a stream
pub fn write_value<W: Write>(writer: &mut W, value: &Value) -> Result<()> {
    let bytes = encode(value)?;
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(())
}
