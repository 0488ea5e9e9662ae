//! Podium server entry point.
//!
//! Wires the pieces together: configuration and logging, the singleton
//! presence service (fatal if the coordination store is unreachable), the
//! background reconciliation loop, and the HTTP/websocket listener. A
//! termination signal fans out over a broadcast channel so the reconciler
//! and the listener wind down together.

use anyhow::{Context, Result};
use api_server::AppState;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::{error, info};

mod config;
mod logging;
mod signals;

use config::AppConfig;

/// Coordination service: player presence, store-backed CRUD, websocket relay.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file path; created with defaults when missing.
    #[arg(short, long, default_value = "podium.toml")]
    config: PathBuf,

    /// Override the listen address (e.g. "0.0.0.0:8080").
    #[arg(short, long)]
    bind: Option<String>,

    /// Override the store endpoints (comma-separated).
    #[arg(short, long)]
    endpoints: Option<String>,

    /// Enable debug logging.
    #[arg(short, long)]
    debug: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load_or_create(&cli.config).await?;
    config.apply_env_overrides();

    if let Some(bind) = cli.bind {
        config.server.bind_address = bind;
    }
    if let Some(endpoints) = cli.endpoints {
        config.store.endpoints = endpoints
            .split(',')
            .map(|endpoint| endpoint.trim().to_string())
            .filter(|endpoint| !endpoint.is_empty())
            .collect();
    }
    if cli.debug {
        config.logging.level = "debug".to_string();
    }

    config.validate()?;
    logging::setup(&config.logging, cli.json_logs)?;

    info!("🚀 Podium v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "📂 Config: {} | Store: {:?} | Namespace: {}",
        cli.config.display(),
        config.store.endpoints,
        config.store.namespace
    );

    if let Err(err) = run(config).await {
        error!("❌ {err:?}");
        std::process::exit(1);
    }

    Ok(())
}

async fn run(config: AppConfig) -> Result<()> {
    // No degraded mode: a process that cannot reach the store is useless.
    let service = presence::init(&config.store)
        .await
        .context("Cannot connect to coordination store")?;
    info!("✅ Connected to coordination store");

    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    // The reconciliation loop is the sole writer to the presence registry
    // and runs for the lifetime of the process.
    let reconciler = {
        let service = service.clone();
        let shutdown = shutdown_tx.subscribe();
        tokio::spawn(async move { service.run(shutdown).await })
    };

    let state = AppState::new(service.registry(), Arc::new(service.store()));
    let listener = TcpListener::bind(&config.server.bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind_address))?;
    info!("🌐 Listening on {}", config.server.bind_address);

    let server = {
        let mut shutdown = shutdown_tx.subscribe();
        tokio::spawn(api_server::serve(listener, state, async move {
            let _ = shutdown.recv().await;
        }))
    };

    info!("🛑 Press Ctrl+C to gracefully shutdown");
    signals::wait_for_shutdown().await;

    let _ = shutdown_tx.send(());
    let drain = async {
        if let Ok(Err(err)) = server.await {
            error!("Server error during shutdown: {err}");
        }
        let _ = reconciler.await;
    };
    if tokio::time::timeout(Duration::from_secs(10), drain).await.is_err() {
        error!("Shutdown timed out; exiting with tasks still running");
    }

    info!("👋 Podium shutdown complete");
    Ok(())
}
