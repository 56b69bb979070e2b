//! Transparent auditing proxy (v1)
//!
//! A forwarding layer for a single upstream HTTP API, built with Tokio and
//! Axum.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌──────────────────────────────────────────────┐
//!                      │               AUDITING PROXY                  │
//!                      │                                               │
//!   Client Request     │  ┌─────────┐     ┌──────────────────────┐    │
//!   ──────────────────►│  │  http   │────►│  forwarding engine   │────┼──► Upstream
//!                      │  │ server  │     │  (retry + passthrough)│    │     API
//!                      │  └─────────┘     └──────────┬───────────┘    │
//!                      │                             │ fire-and-forget │
//!   Client Response    │                             ▼                 │
//!   ◄──────────────────┼──── streamed body   ┌──────────────┐         │
//!                      │                      │  audit sink  │         │
//!                      │                      │   (SQLite)   │         │
//!                      │                      └──────────────┘         │
//!                      │                                               │
//!                      │  Cross-cutting: config, lifecycle, tracing    │
//!                      └──────────────────────────────────────────────┘
//! ```

// Core subsystems
pub mod audit;
pub mod config;
pub mod http;
pub mod proxy;

// Cross-cutting concerns
pub mod lifecycle;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::audit::AuditStore;
use crate::config::loader::load_config;
use crate::config::GatewayConfig;
use crate::http::HttpServer;
use crate::lifecycle::Shutdown;

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(name = "audit-proxy", about = "Transparent auditing proxy for a single upstream API")]
struct Cli {
    /// Path to a TOML configuration file. Defaults are used when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the listener bind address (e.g. "127.0.0.1:8080").
    #[arg(long)]
    listen: Option<String>,
}

/// Trace filter used when `RUST_LOG` is not set: the configured log level
/// for this crate, debug for the middleware.
fn default_filter(log_level: &str) -> String {
    format!("audit_proxy={},tower_http=debug", log_level)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Load configuration (file + environment overrides)
    let mut config: GatewayConfig = load_config(cli.config.as_deref())?;
    if let Some(listen) = cli.listen {
        config.listener.bind_address = listen;
    }

    // Initialize tracing subscriber; RUST_LOG overrides the configured level
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new(default_filter(
                    &config.observability.log_level,
                ))
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("audit-proxy v0.1.0 starting");

    tracing::info!(
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.base_url,
        max_attempts = config.retries.max_attempts,
        timeout_secs = config.upstream.timeout_secs,
        audit_db = %config.audit.db_path,
        "Configuration loaded"
    );

    // Open the audit store (creates the table on first run)
    let store = Arc::new(AuditStore::open(&config.audit.db_path)?);

    // Bind TCP listener
    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let local_addr = listener.local_addr()?;

    tracing::info!(
        address = %local_addr,
        "Listening for connections"
    );

    // Shutdown coordination: ctrl-c triggers the broadcast
    let shutdown = Shutdown::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown signal received");
            trigger.trigger();
        }
    });

    // Create and run HTTP server
    let server = HttpServer::new(config, store)?;
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
