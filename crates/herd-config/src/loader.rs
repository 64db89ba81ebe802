//! Configuration loader with layered sources.

use crate::HerdConfig;
use config::{Config, ConfigError, Environment, File};
use herd_core::HerdError;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Configuration loader with runtime refresh support.
#[derive(Clone)]
pub struct ConfigLoader {
    config: Arc<RwLock<HerdConfig>>,
    config_dir: String,
}

impl ConfigLoader {
    /// Creates a new configuration loader.
    ///
    /// Configuration is loaded from multiple sources in order:
    /// 1. `config/default.toml` - Default values
    /// 2. `config/{environment}.toml` - Environment-specific overrides
    /// 3. `config/local.toml` - Local overrides (not committed)
    /// 4. Environment variables with `HERD_` prefix
    pub fn new(config_dir: impl Into<String>) -> Result<Self, HerdError> {
        let config_dir = config_dir.into();
        let config = Self::load_config(&config_dir)?;

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            config_dir,
        })
    }

    /// Loads configuration from the default location (`./config`).
    pub fn from_default_location() -> Result<Self, HerdError> {
        Self::new("./config")
    }

    /// Returns the current configuration.
    pub async fn get(&self) -> HerdConfig {
        self.config.read().await.clone()
    }

    /// Reloads the configuration from disk.
    pub async fn reload(&self) -> Result<(), HerdError> {
        let new_config = Self::load_config(&self.config_dir)?;
        let mut config = self.config.write().await;
        *config = new_config;
        info!("Configuration reloaded successfully");
        Ok(())
    }

    /// Loads configuration from the specified directory.
    fn load_config(config_dir: &str) -> Result<HerdConfig, HerdError> {
        // Load .env file if present
        if let Err(e) = dotenvy::dotenv() {
            debug!("No .env file found or error loading it: {}", e);
        }

        let environment =
            std::env::var("HERD_ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        info!("Loading configuration for environment: {}", environment);

        let mut builder = Config::builder();

        // 1. Load default configuration
        let default_path = format!("{}/default.toml", config_dir);
        if Path::new(&default_path).exists() {
            debug!("Loading default config from: {}", default_path);
            builder = builder.add_source(File::with_name(&default_path).required(false));
        }

        // 2. Load environment-specific configuration
        let env_path = format!("{}/{}.toml", config_dir, environment);
        if Path::new(&env_path).exists() {
            debug!("Loading environment config from: {}", env_path);
            builder = builder.add_source(File::with_name(&env_path).required(false));
        }

        // 3. Load local overrides (not committed to version control)
        let local_path = format!("{}/local.toml", config_dir);
        if Path::new(&local_path).exists() {
            debug!("Loading local config from: {}", local_path);
            builder = builder.add_source(File::with_name(&local_path).required(false));
        }

        // 4. Override with environment variables (HERD_ prefix)
        builder = builder.add_source(
            Environment::with_prefix("HERD")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build().map_err(config_error_to_herd_error)?;

        let herd_config: HerdConfig = config
            .try_deserialize()
            .map_err(config_error_to_herd_error)?;

        herd_config.validate()?;

        Ok(herd_config)
    }
}

fn config_error_to_herd_error(err: ConfigError) -> HerdError {
    HerdError::Configuration(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_loader_without_files_yields_defaults() {
        let loader = ConfigLoader::new("./does-not-exist").expect("loader should build");
        let config = loader.get().await;
        assert_eq!(config.redis.port, 6379);
        assert_eq!(config.cache.key_prefix, "herd:cache");
    }

    #[tokio::test]
    async fn test_reload_keeps_valid_config() {
        let loader = ConfigLoader::new("./does-not-exist").expect("loader should build");
        loader.reload().await.expect("reload should succeed");
        let config = loader.get().await;
        assert_eq!(config.cache.lock.max_attempts, 10);
    }
}
