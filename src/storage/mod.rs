//! Storage Module
//!
//! Persistent storage layer: full snapshots of the record set.
//!
//! ## Responsibilities
//! - Write the entire record set to one file, replacing the previous one
//! - Read it back wholesale on startup or on demand
//! - Detect truncated or corrupted files
//!
//! ## File Format (V1)
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │ Header (14 bytes)                                        │
//! │   Magic: "RTKV" (4) | Version: u16 (2) | BodyLen: u64 (8)│
//! ├──────────────────────────────────────────────────────────┤
//! │ Body (BodyLen bytes)                                     │
//! │   bincode Vec<(String key, Vec<u8> value)>, key order    │
//! ├──────────────────────────────────────────────────────────┤
//! │ Footer (4 bytes)                                         │
//! │   BodyCRC: u32                                           │
//! └──────────────────────────────────────────────────────────┘
//! ```
//! All integers are little-endian.

pub mod snapshot;

pub use snapshot::{read_snapshot, write_snapshot};
