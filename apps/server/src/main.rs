//! Lockstep Server - standalone relay for shared playback sessions.
//!
//! Hosts the session topics that keep remote viewers in lock-step: browser
//! and native clients connect over WebSocket, join a `video:<streamId>`
//! room, and the relay fans their sync messages out (answering latency
//! probes itself). There is no GUI; it is designed to run as a background
//! daemon.

mod config;

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use lockstep_core::{start_server, AppState};
use tokio::signal;

use crate::config::ServerConfig;

/// Lockstep Server - headless relay for synchronized viewing sessions.
#[derive(Parser, Debug)]
#[command(name = "lockstep-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file (YAML).
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(short, long, default_value = "info", env = "LOCKSTEP_LOG_LEVEL")]
    log_level: log::LevelFilter,

    /// Bind port (overrides config file).
    #[arg(short = 'p', long, env = "LOCKSTEP_BIND_PORT")]
    port: Option<u16>,

    /// Maximum members per session topic (overrides config file).
    #[arg(long, env = "LOCKSTEP_MAX_PEERS")]
    max_peers: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    env_logger::Builder::new()
        .filter_level(args.log_level)
        .format_timestamp_millis()
        .init();

    log::info!("Lockstep Server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let mut config =
        ServerConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    // Apply CLI overrides
    if let Some(port) = args.port {
        config.bind_port = port;
    }
    if let Some(max_peers) = args.max_peers {
        config.max_peers_per_topic = max_peers;
    }

    let core_config = config.to_core_config();
    core_config
        .validate()
        .map_err(anyhow::Error::msg)
        .context("Invalid configuration")?;

    log::info!(
        "Configuration: bind={}:{}, max_peers_per_topic={}",
        config.bind_addr,
        config.bind_port,
        config.max_peers_per_topic
    );

    let addr = SocketAddr::new(config.bind_addr, config.bind_port);
    let state = AppState::new(core_config);

    // Spawn the relay server on the main tokio runtime.
    let server_handle = tokio::spawn(async move {
        if let Err(e) = start_server(addr, state).await {
            log::error!("Server error: {}", e);
        }
    });

    log::info!("Relay server started on port {}", config.bind_port);

    // Wait for shutdown signal
    shutdown_signal().await;

    log::info!("Shutdown signal received, cleaning up...");

    server_handle.abort();

    log::info!("Shutdown complete");
    Ok(())
}

/// Waits for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
