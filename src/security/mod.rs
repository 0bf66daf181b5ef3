//! Request security pipeline.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → cors.rs (origin policy, answers preflight)
//!     → nonce.rs (request context, per-request nonce)
//!     → headers.rs (CSP and hardening headers on the way out)
//!     → rate_limit.rs (fixed window per client, API paths only)
//!     → limits.rs (body cap, JSON body, cookies)
//!     → pollution.rs (collapse repeated query params)
//!     → Resource handlers
//! ```
//!
//! # Design Decisions
//! - Every stage either continues the chain or produces the response itself
//! - Fail closed: a stage that cannot decide rejects the request
//! - Static files are served ahead of the pipeline

pub mod cors;
pub mod csp;
pub mod headers;
pub mod limits;
pub mod nonce;
pub mod pollution;
pub mod rate_limit;

/// Whether `path` lies under `prefix` on a segment boundary: `/api` and
/// `/api/v1/tours` do, `/apiary` does not.
pub fn is_api_path(path: &str, prefix: &str) -> bool {
    let prefix = prefix.trim_end_matches('/');
    if prefix.is_empty() {
        return true;
    }
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}
