//! # RetainKV
//!
//! A small key-value server speaking RESP with:
//! - A binary-safe RESP codec
//! - A concurrent in-memory record set
//! - Full-snapshot persistence (SAVE / load on startup)
//! - One thread per TCP connection
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      TCP Server                              │
//! │              (one thread per connection)                     │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │  FrameReader / encode
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                 Connection Dispatcher                        │
//! │          (Value → Command → Engine → Value)                  │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!                       ▼
//!                ┌─────────────┐        ┌─────────────┐
//!                │   Engine    │──SAVE─▶│  Snapshot   │
//!                │ (MemTable,  │◀─load──│   (file)    │
//!                │   RwLock)   │        └─────────────┘
//!                └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod protocol;
pub mod memtable;
pub mod storage;
pub mod engine;
pub mod network;
pub mod client;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{RetainError, Result};
pub use config::Config;
pub use engine::Engine;
pub use client::Client;
pub use protocol::{Command, Value};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of RetainKV
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
