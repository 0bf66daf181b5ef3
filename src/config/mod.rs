//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize, APP_MODE override)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → shared with the pipeline stages at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the CSP built from it never changes
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    BodyConfig, CorsConfig, CspConfig, GatewayConfig, Mode, ObservabilityConfig, PollutionConfig,
    RateLimitConfig, ResourcesConfig, ServerConfig, StaticFilesConfig, StoreConfig,
};
