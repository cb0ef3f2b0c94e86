//! respkv server entry point.
//!
//! Parses the configuration, installs logging, binds the listener and serves
//! until Ctrl+C.

use anyhow::Context;
use clap::Parser;
use respkv::config::ServerConfig;
use respkv::connection::ConnectionStats;
use respkv::server::serve;
use respkv::storage::StorageEngine;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn print_banner(config: &ServerConfig) {
    println!(
        r#"
respkv v{} - In-Memory Key-Value Server
──────────────────────────────────────────────────────────────
Server started on {}
Ready to accept connections.

Use Ctrl+C to shutdown.
"#,
        respkv::VERSION,
        config.bind_address()
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::parse();

    // RUST_LOG wins over --log-level
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .with_context(|| format!("invalid log filter {:?}", config.log_level))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    let listener = TcpListener::bind(config.bind_address())
        .await
        .with_context(|| format!("failed to bind {}", config.bind_address()))?;

    print_banner(&config);
    info!("Listening on {}", config.bind_address());

    let storage = Arc::new(StorageEngine::new());
    let stats = Arc::new(ConnectionStats::new());

    tokio::select! {
        _ = serve(listener, storage, Arc::clone(&stats)) => {}
        result = signal::ctrl_c() => {
            if let Err(e) = result {
                error!(error = %e, "Failed to listen for Ctrl+C");
            }
            info!("Shutdown signal received, stopping server...");
        }
    }

    info!(
        commands = stats.commands_processed.load(std::sync::atomic::Ordering::Relaxed),
        connections = stats.connections_accepted.load(std::sync::atomic::Ordering::Relaxed),
        "Server shutdown complete"
    );
    Ok(())
}
