//! Origin policy stage.
//!
//! Wrapper around tower-http CORS with gateway configuration. Preflight
//! requests are answered by the layer itself for every route and never reach
//! later stages.

use std::time::Duration;

use axum::http::{HeaderValue, Method};
use tower_http::cors::{AllowHeaders, AllowOrigin, Any, CorsLayer};

use crate::config::CorsConfig;

/// Create the CORS layer from gateway config.
pub fn create_cors_layer(config: &CorsConfig) -> CorsLayer {
    let wildcard = config.allowed_origins.iter().any(|o| o == "*");

    let origin = if wildcard && config.allow_credentials {
        // Credentialed responses cannot carry `*`; echo the caller instead.
        AllowOrigin::mirror_request()
    } else if wildcard {
        AllowOrigin::from(Any)
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|o| match o.parse() {
                Ok(v) => Some(v),
                Err(_) => {
                    tracing::warn!(origin = %o, "Ignoring unparsable CORS origin");
                    None
                }
            })
            .collect();
        AllowOrigin::list(origins)
    };

    let methods: Vec<Method> = config
        .allowed_methods
        .iter()
        .filter_map(|m| m.parse().ok())
        .collect();

    let headers = if config.allow_credentials {
        AllowHeaders::mirror_request()
    } else {
        AllowHeaders::from(Any)
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods(methods)
        .allow_headers(headers)
        .allow_credentials(config.allow_credentials)
        .max_age(Duration::from_secs(config.max_age_secs))
}
