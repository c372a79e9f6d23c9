//! TCP Server
//!
//! Accepts connections and gives each one its own thread.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use crate::config::Config;
use crate::engine::Engine;
use crate::error::Result;
use crate::protocol::{write_value, Value};

use super::Connection;

/// Reply sent to connections refused because the server is full
pub const MAX_CLIENTS_REPLY: &str = "max number of clients reached";

/// TCP server for RetainKV
pub struct Server {
    config: Config,
    engine: Arc<Engine>,
    listener: TcpListener,
    local_addr: SocketAddr,
    shutdown: ShutdownHandle,

    /// Connections currently being served
    active: Arc<AtomicUsize>,
}

impl Server {
    /// Bind the listener described by `config`
    pub fn bind(config: Config, engine: Arc<Engine>) -> Result<Self> {
        let listener = TcpListener::bind(config.socket_addr()?)?;
        let local_addr = listener.local_addr()?;

        Ok(Self {
            config,
            engine,
            listener,
            local_addr,
            shutdown: ShutdownHandle::new(local_addr),
            active: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Address actually bound (useful when the configured port is 0)
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Handle that stops [`Server::run`] from another thread
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Run the accept loop (blocking) until shutdown is requested
    ///
    /// When the loop stops and `save_on_shutdown` is set, a final snapshot is
    /// written. Open connections keep being served by their own threads.
    pub fn run(&self) -> Result<()> {
        tracing::info!("Listening on {}", self.local_addr);

        for stream in self.listener.incoming() {
            if self.shutdown.is_shutdown() {
                break;
            }

            match stream {
                Ok(stream) => self.spawn_connection(stream),
                Err(e) => tracing::warn!("Failed to accept connection: {}", e),
            }
        }

        tracing::info!("Accept loop stopped");

        if self.config.save_on_shutdown {
            self.engine.save()?;
            tracing::info!(
                "Final snapshot written to {}",
                self.engine.snapshot_path().display()
            );
        }

        Ok(())
    }

    fn spawn_connection(&self, mut stream: TcpStream) {
        let guard = ActiveGuard::new(Arc::clone(&self.active));

        if guard.count > self.config.max_connections {
            tracing::warn!(
                "Refusing connection from {:?}: {} connections open",
                stream.peer_addr().ok(),
                guard.count - 1
            );
            if let Err(e) = write_value(&mut stream, &Value::error(MAX_CLIENTS_REPLY)) {
                tracing::debug!("Could not notify refused client: {}", e);
            }
            return;
        }

        let engine = Arc::clone(&self.engine);
        let spawned = thread::Builder::new()
            .name("retainkv-conn".to_string())
            .spawn(move || {
                let _guard = guard;
                match Connection::new(stream, engine) {
                    Ok(mut connection) => {
                        if let Err(e) = connection.handle() {
                            tracing::debug!(
                                "Connection {} closed with error: {}",
                                connection.peer_addr(),
                                e
                            );
                        }
                    }
                    Err(e) => tracing::warn!("Failed to set up connection: {}", e),
                }
            });

        if let Err(e) = spawned {
            tracing::warn!("Failed to spawn connection thread: {}", e);
        }
    }
}

/// Counts a connection as active for as long as it lives
struct ActiveGuard {
    active: Arc<AtomicUsize>,
    count: usize,
}

impl ActiveGuard {
    fn new(active: Arc<AtomicUsize>) -> Self {
        let count = active.fetch_add(1, Ordering::SeqCst) + 1;
        Self { active, count }
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Cloneable handle that stops a running server's accept loop
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    flag: Arc<AtomicBool>,
    wake_addr: SocketAddr,
}

impl ShutdownHandle {
    fn new(local_addr: SocketAddr) -> Self {
        // A wildcard bind can't be connected to; wake it through loopback
        let wake_ip = match local_addr.ip() {
            IpAddr::V4(ip) if ip.is_unspecified() => IpAddr::V4(Ipv4Addr::LOCALHOST),
            IpAddr::V6(ip) if ip.is_unspecified() => IpAddr::V6(Ipv6Addr::LOCALHOST),
            ip => ip,
        };

        Self {
            flag: Arc::new(AtomicBool::new(false)),
            wake_addr: SocketAddr::new(wake_ip, local_addr.port()),
        }
    }

    /// Request shutdown and wake the blocked `accept`
    pub fn shutdown(&self) {
        if !self.flag.swap(true, Ordering::SeqCst) {
            if let Err(e) = TcpStream::connect(self.wake_addr) {
                tracing::debug!("Wake-up connection failed: {}", e);
            }
        }
    }

    pub fn is_shutdown(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}
