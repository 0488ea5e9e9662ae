//! Logging setup.
//!
//! Structured logging via tracing; `RUST_LOG` overrides the configured
//! level, and JSON output is available for log aggregation.

use crate::config::LoggingSettings;
use anyhow::Result;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the global tracing subscriber.
pub fn setup(config: &LoggingSettings, json_override: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_str()));

    let registry = tracing_subscriber::registry().with(filter);

    if json_override || config.json_format {
        registry
            .with(fmt::layer().json().with_target(false))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(false).with_ansi(true))
            .init();
    }

    Ok(())
}
