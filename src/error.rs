//! Error types for RetainKV
//!
//! Provides a unified error type for all operations.

use thiserror::Error;

/// Result type alias using RetainError
pub type Result<T> = std::result::Result<T, RetainError>;

/// Unified error type for RetainKV operations
#[derive(Debug, Error)]
pub enum RetainError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // Protocol Errors
    // -------------------------------------------------------------------------
    /// A value could not be encoded (line text containing CR or LF)
    #[error("Encode error: {0}")]
    Encode(String),

    /// Malformed wire bytes
    #[error("Decode error: {0}")]
    Decode(String),

    /// The buffer ends before the frame does; more bytes are needed
    #[error("Incomplete frame")]
    Incomplete,

    /// A decoded request is not a well-formed command
    #[error("invalid command syntax")]
    InvalidCommand,

    // -------------------------------------------------------------------------
    // Persistence Errors
    // -------------------------------------------------------------------------
    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl RetainError {
    /// True for errors caused by the bytes a peer sent rather than by the transport
    pub fn is_protocol_error(&self) -> bool {
        matches!(
            self,
            RetainError::Decode(_) | RetainError::Incomplete | RetainError::InvalidCommand
        )
    }
}
