//! Connection Handler
//!
//! Handles individual client connections.

use std::io::{self, BufWriter};
use std::net::TcpStream;
use std::sync::Arc;

use crate::engine::Engine;
use crate::error::{RetainError, Result};
use crate::protocol::{write_value, Command, FrameReader, Value, INVALID_COMMAND_REPLY};

/// Handles a single client connection
pub struct Connection {
    /// Frame reader over the TCP stream
    reader: FrameReader<TcpStream>,

    /// TCP stream writer (buffered for efficiency)
    writer: BufWriter<TcpStream>,

    /// Reference to the storage engine
    engine: Arc<Engine>,

    /// Peer address for logging
    peer_addr: String,
}

impl Connection {
    /// Create a new connection handler
    pub fn new(stream: TcpStream, engine: Arc<Engine>) -> Result<Self> {
        // Get peer address for logging before we split the stream
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        // Disable Nagle's algorithm for low latency
        stream.set_nodelay(true)?;

        // Clone stream for separate read/write handles
        let read_stream = stream.try_clone()?;
        let write_stream = stream;

        Ok(Self {
            reader: FrameReader::new(read_stream),
            writer: BufWriter::new(write_stream),
            engine,
            peer_addr,
        })
    }

    /// Handle the connection (blocking until closed)
    ///
    /// Reads requests in a loop and sends replies, in arrival order.
    /// Malformed requests get an error reply and the loop continues.
    /// Returns when the client disconnects or an I/O error occurs.
    pub fn handle(&mut self) -> Result<()> {
        tracing::debug!("Connection established from {}", self.peer_addr);

        loop {
            let reply = match self.reader.read_frame() {
                Ok(Some(frame)) => self.dispatch(frame),
                Ok(None) => {
                    tracing::debug!("Client {} disconnected", self.peer_addr);
                    return Ok(());
                }
                Err(e) if e.is_protocol_error() => {
                    tracing::debug!("Malformed request from {}: {}", self.peer_addr, e);
                    Value::error(INVALID_COMMAND_REPLY)
                }
                Err(RetainError::Io(ref e)) if is_disconnect(e.kind()) => {
                    tracing::debug!("Client {} went away: {}", self.peer_addr, e);
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!("Error reading from {}: {}", self.peer_addr, e);
                    return Err(e);
                }
            };

            if let Err(e) = self.send(&reply) {
                // If the client disconnected before we could send the reply,
                // end quietly rather than treating it as a server error.
                if let RetainError::Io(ref io_err) = e {
                    if is_disconnect(io_err.kind()) {
                        tracing::debug!(
                            "Client {} disconnected before reply could be sent: {}",
                            self.peer_addr,
                            e
                        );
                        return Ok(());
                    }
                }
                tracing::warn!("Error writing to {}: {}", self.peer_addr, e);
                return Err(e);
            }
        }
    }

    /// Turn a decoded frame into a reply
    fn dispatch(&self, frame: Value) -> Value {
        match Command::try_from(frame) {
            Ok(command) => {
                tracing::trace!("{} > {}", self.peer_addr, command.name());
                self.engine.execute(command)
            }
            Err(e) => {
                tracing::trace!("{} > rejected: {}", self.peer_addr, e);
                Value::error(e.to_string())
            }
        }
    }

    /// Send a reply to the client
    fn send(&mut self, reply: &Value) -> Result<()> {
        write_value(&mut self.writer, reply)
    }

    /// Get the peer address string
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }
}

/// I/O error kinds that mean the peer is gone
fn is_disconnect(kind: io::ErrorKind) -> bool {
    matches!(
        kind,
        io::ErrorKind::UnexpectedEof
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
    )
}
