//! Configuration for RetainKV
//!
//! Centralized configuration with sensible defaults.

use std::net::{SocketAddr, ToSocketAddrs};
use std::path::PathBuf;

use crate::error::{RetainError, Result};

/// Main configuration for a RetainKV server
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// Host to listen on
    pub host: String,

    /// TCP port to listen on (0 picks an ephemeral port)
    pub port: u16,

    /// Max concurrent client connections
    pub max_connections: usize,

    // -------------------------------------------------------------------------
    // Persistence Configuration
    // -------------------------------------------------------------------------
    /// Snapshot file written by SAVE and loaded at startup
    pub snapshot_path: PathBuf,

    /// Write a final snapshot when the server is asked to shut down
    pub save_on_shutdown: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            max_connections: 1024,
            snapshot_path: PathBuf::from("retain.db"),
            save_on_shutdown: true,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// `host:port` as a string
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Resolve the listen address
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        let addr = self.listen_addr();
        addr.to_socket_addrs()
            .map_err(|e| RetainError::Config(format!("invalid listen address {}: {}", addr, e)))?
            .next()
            .ok_or_else(|| RetainError::Config(format!("no address resolved for {}", addr)))
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the listen host
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// Set the listen port
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Set the maximum number of concurrent connections
    pub fn max_connections(mut self, count: usize) -> Self {
        self.config.max_connections = count;
        self
    }

    /// Set the snapshot file path
    pub fn snapshot_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.snapshot_path = path.into();
        self
    }

    pub fn save_on_shutdown(mut self, enabled: bool) -> Self {
        self.config.save_on_shutdown = enabled;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
