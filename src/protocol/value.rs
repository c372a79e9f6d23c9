//! Wire value definitions
//!
//! The closed set of RESP value kinds moved across the wire.

/// A single RESP value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// `+text\r\n`, text never contains CR or LF
    SimpleString(String),

    /// `-text\r\n`
    Error(String),

    /// `:n\r\n`
    Integer(i64),

    /// `,f\r\n`
    Double(f64),

    /// `$len\r\n<bytes>\r\n`, `None` is the null bulk string `$-1\r\n`
    BulkString(Option<Vec<u8>>),

    /// `*count\r\n<values>`, `None` is the null array `*-1\r\n`
    Array(Option<Vec<Value>>),
}

impl Value {
    pub fn simple(text: impl Into<String>) -> Self {
        Value::SimpleString(text.into())
    }

    pub fn error(text: impl Into<String>) -> Self {
        Value::Error(text.into())
    }

    pub fn bulk(bytes: impl Into<Vec<u8>>) -> Self {
        Value::BulkString(Some(bytes.into()))
    }

    pub fn null_bulk() -> Self {
        Value::BulkString(None)
    }

    pub fn array(items: Vec<Value>) -> Self {
        Value::Array(Some(items))
    }

    /// The `+OK` reply
    pub fn ok() -> Self {
        Value::simple("OK")
    }

    /// Reply carrying client-supplied bytes back to the client.
    ///
    /// Text that fits on a line becomes a simple string; anything else
    /// (non-UTF-8, or containing CR/LF) falls back to a bulk string.
    pub fn from_message(bytes: Vec<u8>) -> Self {
        match String::from_utf8(bytes) {
            Ok(text) if is_line_safe(&text) => Value::SimpleString(text),
            Ok(text) => Value::BulkString(Some(text.into_bytes())),
            Err(e) => Value::BulkString(Some(e.into_bytes())),
        }
    }

    /// Bulk payload, if this is a non-null bulk string
    pub fn as_bulk(&self) -> Option<&[u8]> {
        match self {
            Value::BulkString(Some(bytes)) => Some(bytes),
            _ => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Value::Error(_))
    }
}

/// True if `text` can be carried by a line type (`+` or `-`)
pub fn is_line_safe(text: &str) -> bool {
    !text.bytes().any(|b| b == b'\r' || b == b'\n')
}
