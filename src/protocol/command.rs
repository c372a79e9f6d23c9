//! Command definitions
//!
//! Converts decoded request frames into typed commands.

use crate::error::{RetainError, Result};
use super::Value;

/// A parsed client command
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Health check, optionally echoing a message
    Ping { message: Option<Vec<u8>> },

    /// Echo a message (empty if none given)
    Echo { message: Option<Vec<u8>> },

    /// Set a key to a value
    Set { key: String, value: Vec<u8> },

    /// Get a value by key
    Get { key: String },

    /// Delete a key
    Del { key: String },

    /// Set several key/value pairs
    MSet { pairs: Vec<(String, Vec<u8>)> },

    /// Get several keys
    MGet { keys: Vec<String> },

    /// Write a snapshot to disk
    Save,
}

impl Command {
    /// The command keyword as sent on the wire
    pub fn name(&self) -> &'static str {
        match self {
            Command::Ping { .. } => "PING",
            Command::Echo { .. } => "ECHO",
            Command::Set { .. } => "SET",
            Command::Get { .. } => "GET",
            Command::Del { .. } => "DEL",
            Command::MSet { .. } => "MSET",
            Command::MGet { .. } => "MGET",
            Command::Save => "SAVE",
        }
    }

    /// Parse a command from its keyword followed by its arguments
    ///
    /// Keywords are case-sensitive. Unknown keywords, wrong arity and
    /// non-UTF-8 keys all yield `RetainError::InvalidCommand`.
    pub fn from_args(args: Vec<Vec<u8>>) -> Result<Self> {
        let mut args = args.into_iter();
        let keyword = args.next().ok_or(RetainError::InvalidCommand)?;
        let args: Vec<Vec<u8>> = args.collect();

        match (keyword.as_slice(), args.len()) {
            (b"PING", 0 | 1) => Ok(Command::Ping {
                message: args.into_iter().next(),
            }),
            (b"ECHO", 0 | 1) => Ok(Command::Echo {
                message: args.into_iter().next(),
            }),
            (b"SET", 2) => {
                let [key, value] = into_array::<2>(args)?;
                Ok(Command::Set {
                    key: into_key(key)?,
                    value,
                })
            }
            (b"GET", 1) => {
                let [key] = into_array::<1>(args)?;
                Ok(Command::Get { key: into_key(key)? })
            }
            (b"DEL", 1) => {
                let [key] = into_array::<1>(args)?;
                Ok(Command::Del { key: into_key(key)? })
            }
            (b"MSET", n) if n > 0 && n % 2 == 0 => {
                let mut pairs = Vec::with_capacity(n / 2);
                let mut args = args.into_iter();
                while let (Some(key), Some(value)) = (args.next(), args.next()) {
                    pairs.push((into_key(key)?, value));
                }
                Ok(Command::MSet { pairs })
            }
            (b"MGET", n) if n > 0 => Ok(Command::MGet {
                keys: args.into_iter().map(into_key).collect::<Result<_>>()?,
            }),
            (b"SAVE", 0) => Ok(Command::Save),
            _ => Err(RetainError::InvalidCommand),
        }
    }

    /// Build the request frame for this command: an array of bulk strings
    pub fn to_value(&self) -> Value {
        let mut args: Vec<Vec<u8>> = vec![self.name().as_bytes().to_vec()];

        match self {
            Command::Ping { message } | Command::Echo { message } => {
                args.extend(message.iter().cloned());
            }
            Command::Set { key, value } => {
                args.push(key.as_bytes().to_vec());
                args.push(value.clone());
            }
            Command::Get { key } | Command::Del { key } => {
                args.push(key.as_bytes().to_vec());
            }
            Command::MSet { pairs } => {
                for (key, value) in pairs {
                    args.push(key.as_bytes().to_vec());
                    args.push(value.clone());
                }
            }
            Command::MGet { keys } => {
                args.extend(keys.iter().map(|k| k.as_bytes().to_vec()));
            }
            Command::Save => {}
        }

        Value::array(args.into_iter().map(Value::bulk).collect())
    }
}

/// Requests must be a non-null array of non-null bulk strings
impl TryFrom<Value> for Command {
    type Error = RetainError;

    fn try_from(value: Value) -> Result<Self> {
        let items = match value {
            Value::Array(Some(items)) => items,
            _ => return Err(RetainError::InvalidCommand),
        };

        let args = items
            .into_iter()
            .map(|item| match item {
                Value::BulkString(Some(bytes)) => Ok(bytes),
                _ => Err(RetainError::InvalidCommand),
            })
            .collect::<Result<Vec<_>>>()?;

        Command::from_args(args)
    }
}

fn into_array<const N: usize>(args: Vec<Vec<u8>>) -> Result<[Vec<u8>; N]> {
    args.try_into().map_err(|_| RetainError::InvalidCommand)
}

fn into_key(bytes: Vec<u8>) -> Result<String> {
    String::from_utf8(bytes).map_err(|_| RetainError::InvalidCommand)
}
