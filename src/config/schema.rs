//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener, run mode and API prefix.
    pub server: ServerConfig,

    /// Static asset serving.
    pub static_files: StaticFilesConfig,

    /// Cross-origin policy.
    pub cors: CorsConfig,

    /// Content-Security-Policy external source lists.
    pub csp: CspConfig,

    /// Rate limiting configuration.
    pub rate_limit: RateLimitConfig,

    /// Request body ingestion.
    pub body: BodyConfig,

    /// Parameter-pollution defense.
    pub pollution: PollutionConfig,

    /// Registered resource collections.
    pub resources: ResourcesConfig,

    /// Development store settings.
    pub store: StoreConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Run mode. Development enables the diagnostic request log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Development,
    Production,
}

impl Mode {
    pub fn is_development(&self) -> bool {
        matches!(self, Mode::Development)
    }
}

impl std::str::FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Mode::Development),
            "production" | "prod" => Ok(Mode::Production),
            other => Err(format!("unknown mode '{other}'")),
        }
    }
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    pub bind_address: String,

    /// Development or production.
    pub mode: Mode,

    /// Prefix of every API path; rate limiting, body and pollution stages
    /// only run below it.
    pub api_prefix: String,

    /// Request timeout (total time for request/response) in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:3000".to_string(),
            mode: Mode::Development,
            api_prefix: "/api".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// Static asset configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StaticFilesConfig {
    pub enabled: bool,

    /// Directory served at the site root.
    pub dir: String,
}

impl Default for StaticFilesConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dir: "public".to_string(),
        }
    }
}

/// Cross-origin configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Allowed origins; `"*"` reflects any origin.
    pub allowed_origins: Vec<String>,

    pub allowed_methods: Vec<String>,

    /// Allow cookies and authorization headers cross-origin.
    pub allow_credentials: bool,

    /// Preflight cache lifetime in seconds.
    pub max_age_secs: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["http://127.0.0.1:3000".to_string()],
            allowed_methods: ["GET", "HEAD", "PUT", "PATCH", "POST", "DELETE"]
                .iter()
                .map(|m| m.to_string())
                .collect(),
            allow_credentials: true,
            max_age_secs: 600,
        }
    }
}

/// External sources added to the fixed CSP base, per resource type.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CspConfig {
    pub script_src: Vec<String>,
    pub style_src: Vec<String>,
    pub connect_src: Vec<String>,
    pub worker_src: Vec<String>,
    pub img_src: Vec<String>,
    pub font_src: Vec<String>,

    /// Add the per-request nonce to `script-src`.
    pub nonce_scripts: bool,

    /// Emit `upgrade-insecure-requests`.
    pub upgrade_insecure_requests: bool,
}

impl Default for CspConfig {
    fn default() -> Self {
        let owned = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        Self {
            script_src: owned(&[
                "https://unpkg.com/",
                "https://tile.openstreetmap.org",
                "https://cdnjs.cloudflare.com/ajax/libs/axios/1.7.7/axios.min.js",
            ]),
            style_src: owned(&[
                "https://unpkg.com/",
                "https://tile.openstreetmap.org",
                "https://fonts.googleapis.com/",
            ]),
            connect_src: owned(&[
                "https://unpkg.com",
                "https://tile.openstreetmap.org",
                "https://cdnjs.cloudflare.com/ajax/libs/axios/1.7.7/axios.min.js",
            ]),
            worker_src: owned(&[
                "http://127.0.0.1:3000",
                "https://cdnjs.cloudflare.com/ajax/libs/axios/1.7.7/axios.min.js",
                "https://tile.openstreetmap.org",
            ]),
            img_src: owned(&["https:"]),
            font_src: owned(&["fonts.googleapis.com", "fonts.gstatic.com"]),
            nonce_scripts: true,
            upgrade_insecure_requests: true,
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Maximum requests per client within one window.
    pub max_requests: u32,

    /// Window length in seconds.
    pub window_secs: u64,

    /// Message returned with 429 responses.
    pub message: String,

    /// Use the first `X-Forwarded-For` address as the client key.
    pub trust_forwarded_for: bool,

    /// How often expired windows are swept, in seconds.
    pub cleanup_interval_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_requests: 100,
            window_secs: 60 * 60,
            message: "Too many requests from this IP, please try again in an hour!".to_string(),
            trust_forwarded_for: false,
            cleanup_interval_secs: 300,
        }
    }
}

/// Body ingestion configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BodyConfig {
    /// Maximum body size in bytes.
    pub max_bytes: usize,
}

impl Default for BodyConfig {
    fn default() -> Self {
        Self {
            max_bytes: 10 * 1024,
        }
    }
}

/// Parameter-pollution defense configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PollutionConfig {
    /// Parameters allowed to repeat; everything else keeps its last value.
    pub whitelist: Vec<String>,
}

impl Default for PollutionConfig {
    fn default() -> Self {
        Self {
            whitelist: [
                "duration",
                "ratingsQuantity",
                "ratingsAverage",
                "maxGroupSize",
                "difficulty",
                "price",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

/// Resource routing configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ResourcesConfig {
    /// Path under which resources are mounted, e.g. "/api/v1".
    pub base_path: String,

    /// Collection names served as `<base_path>/<name>`.
    pub names: Vec<String>,
}

impl Default for ResourcesConfig {
    fn default() -> Self {
        Self {
            base_path: "/api/v1".to_string(),
            names: vec!["tours".to_string(), "users".to_string(), "reviews".to_string()],
        }
    }
}

/// Development store configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct StoreConfig {
    /// Optional JSON file loaded into the in-memory store at startup.
    pub seed_path: Option<String>,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_reference_deployment() {
        let config = GatewayConfig::default();
        assert_eq!(config.rate_limit.max_requests, 100);
        assert_eq!(config.rate_limit.window_secs, 3600);
        assert_eq!(config.body.max_bytes, 10240);
        assert_eq!(config.server.api_prefix, "/api");
        assert!(config.pollution.whitelist.contains(&"price".to_string()));
    }

    #[test]
    fn test_partial_toml() {
        let config: GatewayConfig = toml::from_str(
            r#"
            [server]
            mode = "production"

            [rate_limit]
            max_requests = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.server.mode, Mode::Production);
        assert_eq!(config.rate_limit.max_requests, 5);
        assert_eq!(config.rate_limit.window_secs, 3600);
        assert_eq!(config.server.bind_address, "127.0.0.1:3000");
    }

    #[test]
    fn test_mode_from_str() {
        assert_eq!("PROD".parse::<Mode>(), Ok(Mode::Production));
        assert!("staging".parse::<Mode>().is_err());
    }
}
