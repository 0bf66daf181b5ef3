//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (limits > 0, addresses parse)
//! - Check that resources are mounted below the API prefix
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use crate::config::schema::GatewayConfig;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("invalid {field} '{value}'")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("{field} must start with '/': '{value}'")]
    RelativePath { field: &'static str, value: String },

    #[error("resource base path '{base}' is not below api prefix '{prefix}'")]
    BaseOutsidePrefix { base: String, prefix: String },

    #[error("invalid resource name '{0}'")]
    ResourceName(String),

    #[error("credentialed CORS needs explicit origins or '*', got none")]
    NoOrigins,
}

pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "server.bind_address",
            value: config.server.bind_address.clone(),
        });
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    if config.server.request_timeout_secs == 0 {
        errors.push(ValidationError::Zero("server.request_timeout_secs"));
    }
    if config.rate_limit.max_requests == 0 {
        errors.push(ValidationError::Zero("rate_limit.max_requests"));
    }
    if config.rate_limit.window_secs == 0 {
        errors.push(ValidationError::Zero("rate_limit.window_secs"));
    }
    if config.rate_limit.cleanup_interval_secs == 0 {
        errors.push(ValidationError::Zero("rate_limit.cleanup_interval_secs"));
    }
    if config.body.max_bytes == 0 {
        errors.push(ValidationError::Zero("body.max_bytes"));
    }

    for (field, value) in [
        ("server.api_prefix", &config.server.api_prefix),
        ("resources.base_path", &config.resources.base_path),
    ] {
        if !value.starts_with('/') {
            errors.push(ValidationError::RelativePath { field, value: value.clone() });
        }
    }
    if !config.resources.base_path.starts_with(&config.server.api_prefix) {
        errors.push(ValidationError::BaseOutsidePrefix {
            base: config.resources.base_path.clone(),
            prefix: config.server.api_prefix.clone(),
        });
    }

    for name in &config.resources.names {
        let valid = !name.is_empty()
            && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            errors.push(ValidationError::ResourceName(name.clone()));
        }
    }

    if config.cors.allow_credentials && config.cors.allowed_origins.is_empty() {
        errors.push(ValidationError::NoOrigins);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(validate_config(&GatewayConfig::default()), Ok(()));
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = GatewayConfig::default();
        config.server.bind_address = "not an address".into();
        config.rate_limit.max_requests = 0;
        config.body.max_bytes = 0;
        config.resources.names.push("../etc".into());

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.contains(&ValidationError::Zero("body.max_bytes")));
        assert!(errors.contains(&ValidationError::ResourceName("../etc".into())));
    }

    #[test]
    fn test_base_path_must_sit_under_prefix() {
        let mut config = GatewayConfig::default();
        config.resources.base_path = "/v1".into();
        let errors = validate_config(&config).unwrap_err();
        assert!(matches!(errors[0], ValidationError::BaseOutsidePrefix { .. }));
    }
}
