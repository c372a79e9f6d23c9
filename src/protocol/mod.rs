//! Protocol Module
//!
//! RESP wire protocol shared by the server and the client.
//!
//! ## Request Format
//! Every request is an array of bulk strings: the command keyword followed by
//! its arguments.
//! ```text
//! *3\r\n$3\r\nSET\r\n$1\r\nk\r\n$1\r\nv\r\n
//! ```
//!
//! ## Replies
//! - `+OK` / `+PONG` / echoed text: simple strings
//! - GET hit: bulk string
//! - GET miss: `-(nil)`
//! - MGET: array of bulk strings, misses carry the literal payload `(nil)`
//! - Malformed or unknown requests: `-invalid command syntax`

mod codec;
mod command;
mod stream;
mod value;

pub use codec::{
    decode, decode_frame, encode, encode_into, write_value, MAX_ARRAY_LEN, MAX_BULK_LEN,
    MAX_DEPTH, MAX_LINE_LEN,
};
pub use command::Command;
pub use stream::FrameReader;
pub use value::{is_line_safe, Value};

/// Reply text for a single-key lookup miss, and the MGET placeholder payload
pub const NIL_REPLY: &str = "(nil)";

/// Reply text for malformed requests, unknown commands and wrong arity
pub const INVALID_COMMAND_REPLY: &str = "invalid command syntax";
