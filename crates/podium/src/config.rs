//! Application configuration.
//!
//! Loaded from a TOML file (created with defaults on first run), then
//! overridden by `PODIUM_*` environment variables and CLI flags, then
//! validated before anything starts.

use anyhow::{Context, Result};
use coordination_store::StoreConfig;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use tracing::info;

/// Complete configuration for one podium process.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerSettings,
    pub store: StoreConfig,
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Address the HTTP/websocket listener binds to.
    pub bind_address: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level filter (trace, debug, info, warn, error).
    pub level: String,
    /// Emit JSON-formatted logs.
    pub json_format: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from `path`, creating a default file when none
    /// exists so a fresh checkout starts with something editable.
    pub async fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            let config = toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
            Ok(config)
        } else {
            let config = AppConfig::default();
            let content =
                toml::to_string_pretty(&config).context("Failed to serialize default config")?;
            tokio::fs::write(path, content)
                .await
                .with_context(|| format!("Failed to write config file: {}", path.display()))?;
            info!("Created default configuration file: {}", path.display());
            Ok(config)
        }
    }

    /// Apply `PODIUM_*` environment variable overrides.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(bind) = std::env::var("PODIUM_BIND_ADDRESS") {
            self.server.bind_address = bind;
        }
        if let Ok(endpoints) = std::env::var("PODIUM_STORE_ENDPOINTS") {
            self.store.endpoints = endpoints
                .split(',')
                .map(|endpoint| endpoint.trim().to_string())
                .filter(|endpoint| !endpoint.is_empty())
                .collect();
        }
        if let Ok(namespace) = std::env::var("PODIUM_STORE_NAMESPACE") {
            self.store.namespace = namespace;
        }
        if let Ok(level) = std::env::var("PODIUM_LOG_LEVEL") {
            self.logging.level = level;
        }
    }

    /// Reject configurations the process cannot run with.
    pub fn validate(&self) -> Result<()> {
        self.server
            .bind_address
            .parse::<SocketAddr>()
            .with_context(|| format!("Invalid bind address: {}", self.server.bind_address))?;

        if self.store.endpoints.is_empty() {
            anyhow::bail!("At least one store endpoint must be configured");
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            anyhow::bail!(
                "Invalid log level: {}. Must be one of: {:?}",
                self.logging.level,
                valid_levels
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.store.namespace, "podium");
    }

    #[test]
    fn validation_rejects_bad_values() {
        let mut config = AppConfig::default();
        config.server.bind_address = "not-an-address".to_string();
        assert!(config.validate().is_err());

        config.server.bind_address = "127.0.0.1:8080".to_string();
        config.store.endpoints.clear();
        assert!(config.validate().is_err());

        config.store.endpoints = vec!["http://127.0.0.1:2379".to_string()];
        config.logging.level = "loud".to_string();
        assert!(config.validate().is_err());
    }

    #[tokio::test]
    async fn load_or_create_round_trips_through_a_file() {
        let dir = tempfile::tempdir().expect("tempdir should be creatable");
        let path = dir.path().join("podium.toml");

        // First load creates the file with defaults.
        let created = AppConfig::load_or_create(&path).await.expect("create");
        assert!(path.exists());

        // Second load reads it back identically.
        let loaded = AppConfig::load_or_create(&path).await.expect("load");
        assert_eq!(loaded.server.bind_address, created.server.bind_address);
        assert_eq!(loaded.store.endpoints, created.store.endpoints);
    }
}
