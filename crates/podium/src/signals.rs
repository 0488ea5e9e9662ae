//! Graceful shutdown signal handling.
//!
//! Cross-platform: SIGINT/SIGTERM on Unix, Ctrl+C on Windows.

use tracing::info;

/// Resolve once a termination signal arrives.
pub async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigint =
            signal(SignalKind::interrupt()).expect("Failed to create SIGINT handler");
        let mut sigterm =
            signal(SignalKind::terminate()).expect("Failed to create SIGTERM handler");

        tokio::select! {
            _ = sigint.recv() => {
                info!("SIGINT received - initiating graceful shutdown");
            }
            _ = sigterm.recv() => {
                info!("SIGTERM received - initiating graceful shutdown");
            }
        }
    }

    #[cfg(windows)]
    {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
        info!("Ctrl+C received - initiating graceful shutdown");
    }
}
