//! Client Module
//!
//! Blocking TCP client speaking the RetainKV request framing.

use std::io::{self, BufWriter};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};

use crate::error::Result;
use crate::protocol::{write_value, Command, FrameReader, Value};

/// A connection to a RetainKV server
///
/// Helpers return the raw reply so callers can see error replies such as
/// `-(nil)` alongside ordinary values.
pub struct Client {
    reader: FrameReader<TcpStream>,
    writer: BufWriter<TcpStream>,
    peer_addr: SocketAddr,
}

impl Client {
    /// Connect to a server
    pub fn connect<A: ToSocketAddrs>(addr: A) -> Result<Self> {
        let stream = TcpStream::connect(addr)?;
        stream.set_nodelay(true)?;
        let peer_addr = stream.peer_addr()?;

        Ok(Self {
            reader: FrameReader::new(stream.try_clone()?),
            writer: BufWriter::new(stream),
            peer_addr,
        })
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// Send a command keyword and its arguments as bulk strings
    pub fn request<I, T>(&mut self, args: I) -> Result<Value>
    where
        I: IntoIterator<Item = T>,
        T: Into<Vec<u8>>,
    {
        let frame = Value::array(args.into_iter().map(Value::bulk).collect());
        self.send_value(&frame)
    }

    /// Send a typed command
    pub fn execute(&mut self, command: &Command) -> Result<Value> {
        self.send_value(&command.to_value())
    }

    /// Send any frame and wait for the reply
    pub fn send_value(&mut self, frame: &Value) -> Result<Value> {
        write_value(&mut self.writer, frame)?;
        self.read_reply()
    }

    /// Read the next reply frame
    pub fn read_reply(&mut self) -> Result<Value> {
        match self.reader.read_frame()? {
            Some(reply) => Ok(reply),
            None => Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "server closed the connection",
            )
            .into()),
        }
    }

    // =========================================================================
    // Command helpers
    // =========================================================================

    pub fn ping(&mut self) -> Result<Value> {
        self.execute(&Command::Ping { message: None })
    }

    pub fn echo(&mut self, message: impl Into<Vec<u8>>) -> Result<Value> {
        self.execute(&Command::Echo {
            message: Some(message.into()),
        })
    }

    pub fn get(&mut self, key: &str) -> Result<Value> {
        self.execute(&Command::Get {
            key: key.to_string(),
        })
    }

    pub fn set(&mut self, key: &str, value: impl Into<Vec<u8>>) -> Result<Value> {
        self.execute(&Command::Set {
            key: key.to_string(),
            value: value.into(),
        })
    }

    pub fn del(&mut self, key: &str) -> Result<Value> {
        self.execute(&Command::Del {
            key: key.to_string(),
        })
    }

    pub fn mset<K, V>(&mut self, pairs: impl IntoIterator<Item = (K, V)>) -> Result<Value>
    where
        K: Into<String>,
        V: Into<Vec<u8>>,
    {
        self.execute(&Command::MSet {
            pairs: pairs
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        })
    }

    pub fn mget<K: Into<String>>(&mut self, keys: impl IntoIterator<Item = K>) -> Result<Value> {
        self.execute(&Command::MGet {
            keys: keys.into_iter().map(Into::into).collect(),
        })
    }

    pub fn save(&mut self) -> Result<Value> {
        self.execute(&Command::Save)
    }
}
