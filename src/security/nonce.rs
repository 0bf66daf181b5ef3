//! Request context and nonce generation stage.
//!
//! # Responsibilities
//! - Create the per-request context (client address)
//! - Generate a fresh 128-bit nonce for inline-script trust
//!
//! # Design Decisions
//! - Nonce is hex encoded; hex is a subset of the CSP nonce alphabet
//! - Generated from the thread-local CSPRNG, never reused across requests

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use rand::RngCore;

use crate::http::context::{client_ip, RequestContext};

/// Nonce length in bytes before encoding.
pub const NONCE_BYTES: usize = 16;

pub fn generate_nonce() -> String {
    let mut bytes = [0u8; NONCE_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// State for the context stage.
#[derive(Debug, Clone, Copy)]
pub struct ContextStage {
    pub trust_forwarded_for: bool,
}

/// Insert a fresh [`RequestContext`] for every request.
pub async fn attach_context(
    State(stage): State<ContextStage>,
    mut request: Request,
    next: Next,
) -> Response {
    let client_addr = client_ip(&request, stage.trust_forwarded_for);
    let context = RequestContext::new(client_addr, generate_nonce());
    request.extensions_mut().insert(context);
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nonce_shape() {
        let nonce = generate_nonce();
        assert_eq!(nonce.len(), NONCE_BYTES * 2);
        assert!(nonce.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_nonces_differ() {
        assert_ne!(generate_nonce(), generate_nonce());
    }
}
