//! RetainKV Server Binary
//!
//! Starts the TCP server for RetainKV.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use retainkv::network::Server;
use retainkv::{Config, Engine};
use tracing_subscriber::{fmt, EnvFilter};

/// RetainKV Server
#[derive(Parser, Debug)]
#[command(name = "retainkv-server")]
#[command(about = "RESP key-value server with snapshot persistence")]
#[command(version)]
struct Args {
    /// Host to listen on
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on
    #[arg(short, long, default_value = "8000")]
    port: u16,

    /// Snapshot file written by SAVE and loaded at startup
    #[arg(short, long, default_value = "retain.db")]
    snapshot: PathBuf,

    /// Maximum concurrent connections
    #[arg(short, long, default_value = "1024")]
    max_connections: usize,

    /// Skip the final snapshot on Ctrl+C
    #[arg(long)]
    no_save_on_shutdown: bool,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,retainkv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("RetainKV Server v{}", retainkv::VERSION);
    tracing::info!("Snapshot file: {}", args.snapshot.display());

    // Build config from args
    let config = Config::builder()
        .host(&args.host)
        .port(args.port)
        .snapshot_path(&args.snapshot)
        .max_connections(args.max_connections)
        .save_on_shutdown(!args.no_save_on_shutdown)
        .build();

    // Open engine (restores the snapshot if there is one)
    let engine = match Engine::open(&config) {
        Ok(e) => Arc::new(e),
        Err(e) => {
            tracing::error!("Failed to open engine: {}", e);
            std::process::exit(1);
        }
    };

    let server = match Server::bind(config, engine) {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("Failed to bind {}:{}: {}", args.host, args.port, e);
            std::process::exit(1);
        }
    };

    // Ctrl+C stops the accept loop; run() then writes the final snapshot
    let shutdown = server.shutdown_handle();
    if let Err(e) = ctrlc::set_handler(move || {
        tracing::info!("Received Ctrl+C, initiating shutdown...");
        shutdown.shutdown();
    }) {
        tracing::warn!("Could not install Ctrl+C handler: {}", e);
    }

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Server stopped");
}
