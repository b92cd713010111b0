//! Configuration module for posbridge-console.
//!
//! Handles loading configuration from TOML files and CLI overrides, and
//! turns the file sections into the runtime settings the coordinator and
//! gateway client take.

pub mod file;

use crate::config::file::FileConfig;
use posbridge_core::channel::normalize_origin;
use posbridge_core::config::CoordinatorConfig;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Upper bound for `timing.host_reply_timeout_secs` (one day).
const MAX_HOST_REPLY_TIMEOUT_SECS: u64 = 86_400;

/// Upper bound for the dwell delays (ten minutes).
const MAX_DELAY_MS: u64 = 600_000;

/// Errors that can occur during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    ValidationError(String),
}

/// Gateway client settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewaySettings {
    pub base_url: Url,
    pub request_timeout: Option<Duration>,
}

/// Simulated host page settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostSettings {
    /// Already normalized to `scheme://host[:port]`.
    pub default_origin: Option<String>,
    pub embedded: bool,
}

/// Loaded configuration result containing all parts.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub gateway: GatewaySettings,
    pub coordinator: CoordinatorConfig,
    pub host: HostSettings,
    pub templates_dir: Option<PathBuf>,
}

/// Configuration loader that handles the complete loading process.
pub struct ConfigLoader {
    config_path: PathBuf,
    gateway_override: Option<Url>,
    force_not_embedded: bool,
}

impl ConfigLoader {
    /// Create a new config loader.
    pub fn new(
        config_path: impl AsRef<Path>,
        gateway_override: Option<Url>,
        force_not_embedded: bool,
    ) -> Self {
        Self {
            config_path: config_path.as_ref().to_path_buf(),
            gateway_override,
            force_not_embedded,
        }
    }

    /// Load and process the configuration.
    ///
    /// This will:
    /// 1. Read the TOML file
    /// 2. Apply CLI overrides
    /// 3. Validate the configuration
    /// 4. Build the loaded configuration
    pub fn load(&self) -> Result<LoadedConfig, ConfigError> {
        let config_content = std::fs::read_to_string(&self.config_path)?;
        self.load_str(&config_content)
    }

    fn load_str(&self, config_content: &str) -> Result<LoadedConfig, ConfigError> {
        let mut file_config: FileConfig = toml::from_str(config_content)?;

        // Apply CLI overrides
        if let Some(base_url) = &self.gateway_override {
            file_config.gateway.base_url = base_url.clone();
        }
        if self.force_not_embedded {
            file_config.host.embedded = false;
        }

        self.validate(&file_config)?;
        build_loaded_config(file_config)
    }

    fn validate(&self, config: &FileConfig) -> Result<(), ConfigError> {
        let scheme = config.gateway.base_url.scheme();
        if scheme != "http" && scheme != "https" {
            return Err(ConfigError::ValidationError(format!(
                "gateway.base_url must be http or https, got {scheme}"
            )));
        }
        if config.gateway.request_timeout_secs == Some(0) {
            return Err(ConfigError::ValidationError(
                "gateway.request_timeout_secs must be positive".to_string(),
            ));
        }
        if config.timing.decline_delay_ms == 0 {
            return Err(ConfigError::ValidationError(
                "timing.decline_delay_ms must be positive".to_string(),
            ));
        }
        if config.timing.exit_delay_ms == 0 {
            return Err(ConfigError::ValidationError(
                "timing.exit_delay_ms must be positive".to_string(),
            ));
        }
        for (name, value) in [
            ("timing.decline_delay_ms", config.timing.decline_delay_ms),
            ("timing.exit_delay_ms", config.timing.exit_delay_ms),
        ] {
            if value > MAX_DELAY_MS {
                return Err(ConfigError::ValidationError(format!(
                    "{name} must be at most {MAX_DELAY_MS}, got {value}"
                )));
            }
        }
        let reply_timeout_secs = config.timing.host_reply_timeout_secs;
        if reply_timeout_secs > MAX_HOST_REPLY_TIMEOUT_SECS {
            return Err(ConfigError::ValidationError(format!(
                "timing.host_reply_timeout_secs must be at most {}, got {}",
                MAX_HOST_REPLY_TIMEOUT_SECS, reply_timeout_secs
            )));
        }
        Ok(())
    }
}

fn build_loaded_config(file_config: FileConfig) -> Result<LoadedConfig, ConfigError> {
    let default_origin = file_config
        .host
        .default_origin
        .as_deref()
        .map(normalize_origin)
        .transpose()
        .map_err(|e| ConfigError::ValidationError(format!("host.default_origin: {e}")))?;

    let timing = &file_config.timing;
    let reply_timeout = match timing.host_reply_timeout_secs {
        0 => None,
        secs => Some(Duration::from_secs(secs)),
    };

    Ok(LoadedConfig {
        gateway: GatewaySettings {
            base_url: file_config.gateway.base_url,
            request_timeout: file_config
                .gateway
                .request_timeout_secs
                .map(Duration::from_secs),
        },
        coordinator: CoordinatorConfig {
            decline_delay: Duration::from_millis(timing.decline_delay_ms),
            exit_delay: Duration::from_millis(timing.exit_delay_ms),
            reply_timeout,
        },
        host: HostSettings {
            default_origin,
            embedded: file_config.host.embedded,
        },
        templates_dir: file_config.ui.templates_dir,
    })
}
