//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use crate::config::schema::{GatewayConfig, Mode};
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable overriding `server.mode`.
pub const MODE_ENV: &str = "APP_MODE";

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid APP_MODE: {0}")]
    Mode(String),

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: GatewayConfig = toml::from_str(&content)?;
    finalize(config)
}

/// Apply environment overrides and validate.
pub fn finalize(mut config: GatewayConfig) -> Result<GatewayConfig, ConfigError> {
    if let Ok(mode) = std::env::var(MODE_ENV) {
        config.server.mode = mode.parse::<Mode>().map_err(ConfigError::Mode)?;
    }

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}
