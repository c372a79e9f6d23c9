//! Network Module
//!
//! TCP server and client connection handling.
//!
//! ## Architecture
//! - Accept loop on the caller's thread
//! - One thread per client connection
//! - Commands executed directly against the shared `Arc<Engine>`

mod connection;
mod server;

pub use connection::Connection;
pub use server::{Server, ShutdownHandle, MAX_CLIENTS_REPLY};
