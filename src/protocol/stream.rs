//! Frame reader
//!
//! Pulls whole RESP frames out of a byte stream.

use std::io::{self, Read};

use bytes::{Buf, BytesMut};

use crate::error::{RetainError, Result};
use super::codec::{decode_frame, FrameScanner};
use super::Value;

/// Bytes requested from the underlying reader per read call
const READ_CHUNK_SIZE: usize = 16 * 1024;

/// Buffered reader that yields one decoded frame at a time
///
/// Bytes that arrive after a complete frame stay buffered for the next call,
/// so pipelined requests and frames split across reads are both handled.
pub struct FrameReader<R> {
    reader: R,
    buffer: BytesMut,

    /// Progress through the frame at the front of `buffer`
    scanner: FrameScanner,
}

impl<R: Read> FrameReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buffer: BytesMut::with_capacity(READ_CHUNK_SIZE),
            scanner: FrameScanner::new(),
        }
    }

    /// Read the next frame
    ///
    /// Returns:
    /// - `Ok(Some(value))` for a complete frame
    /// - `Ok(None)` when the peer closed the stream between frames
    /// - `Err(Io(UnexpectedEof))` when the peer closed the stream mid-frame
    /// - `Err(Decode(..))` for malformed bytes; the buffer is discarded so
    ///   the caller can reply and keep reading
    pub fn read_frame(&mut self) -> Result<Option<Value>> {
        loop {
            if let Some(value) = self.parse_frame()? {
                return Ok(Some(value));
            }

            if self.fill_buffer()? == 0 {
                if self.buffer.is_empty() {
                    return Ok(None);
                }
                return Err(io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    "connection closed in the middle of a frame",
                )
                .into());
            }
        }
    }

    /// Try to decode a frame from what is already buffered
    ///
    /// The scanner resumes where the previous attempt stopped; the frame is
    /// only decoded once it is known to be complete.
    fn parse_frame(&mut self) -> Result<Option<Value>> {
        if self.buffer.is_empty() {
            return Ok(None);
        }

        let len = match self.scanner.scan(&self.buffer) {
            Ok(len) => len,
            Err(RetainError::Incomplete) => return Ok(None),
            Err(e) => {
                self.discard();
                return Err(e);
            }
        };

        match decode_frame(&self.buffer[..len]) {
            Ok((value, _)) => {
                self.buffer.advance(len);
                self.scanner.reset();
                Ok(Some(value))
            }
            Err(e) => {
                self.discard();
                Err(e)
            }
        }
    }

    /// Drop everything buffered so the next request starts clean
    fn discard(&mut self) {
        self.buffer.clear();
        self.scanner.reset();
    }

    /// Read more bytes into the buffer, returning how many arrived
    fn fill_buffer(&mut self) -> Result<usize> {
        let start = self.buffer.len();
        self.buffer.resize(start + READ_CHUNK_SIZE, 0);

        loop {
            match self.reader.read(&mut self.buffer[start..]) {
                Ok(n) => {
                    self.buffer.truncate(start + n);
                    return Ok(n);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.buffer.truncate(start);
                    return Err(e.into());
                }
            }
        }
    }

    /// Number of bytes received but not yet consumed
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }
}
