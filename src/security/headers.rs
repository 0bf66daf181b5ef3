//! Security response headers.
//!
//! # Responsibilities
//! - Attach the Content-Security-Policy to every non-static response
//! - Attach the hardening headers browsers expect from a hardened app
//! - Strip headers that advertise the stack
//!
//! # Design Decisions
//! - Headers are set after the inner stages ran, so error responses get them too
//! - The policy is immutable; only the nonce varies per response

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};

use crate::http::context::RequestContext;
use crate::security::csp::ContentSecurityPolicy;

/// Static hardening headers sent with every non-static response.
pub const HARDENING_HEADERS: [(&str, &str); 11] = [
    ("cross-origin-opener-policy", "same-origin"),
    ("cross-origin-resource-policy", "same-origin"),
    ("origin-agent-cluster", "?1"),
    ("referrer-policy", "no-referrer"),
    ("strict-transport-security", "max-age=15552000; includeSubDomains"),
    ("x-content-type-options", "nosniff"),
    ("x-dns-prefetch-control", "off"),
    ("x-download-options", "noopen"),
    ("x-frame-options", "SAMEORIGIN"),
    ("x-permitted-cross-domain-policies", "none"),
    ("x-xss-protection", "0"),
];

/// State for the security headers stage.
#[derive(Debug, Clone)]
pub struct SecurityHeaders {
    policy: Arc<ContentSecurityPolicy>,
    nonce_scripts: bool,
    /// Pre-rendered policy for responses without a nonce.
    static_value: HeaderValue,
}

impl SecurityHeaders {
    pub fn new(policy: ContentSecurityPolicy, nonce_scripts: bool) -> Self {
        let static_value = HeaderValue::from_str(&policy.render(None))
            .unwrap_or_else(|_| HeaderValue::from_static("default-src 'self'"));
        Self {
            policy: Arc::new(policy),
            nonce_scripts,
            static_value,
        }
    }

    fn csp_value(&self, nonce: Option<&str>) -> HeaderValue {
        match nonce.filter(|_| self.nonce_scripts) {
            Some(nonce) => HeaderValue::from_str(&self.policy.render(Some(nonce)))
                .unwrap_or_else(|_| self.static_value.clone()),
            None => self.static_value.clone(),
        }
    }

    /// Write the policy and hardening headers into a response.
    pub fn apply(&self, response: &mut Response, nonce: Option<&str>) {
        let headers = response.headers_mut();
        headers.insert(header::CONTENT_SECURITY_POLICY, self.csp_value(nonce));
        for (name, value) in HARDENING_HEADERS {
            headers.insert(HeaderName::from_static(name), HeaderValue::from_static(value));
        }
        headers.remove("x-powered-by");
    }
}

/// Middleware attaching [`SecurityHeaders`] to the outgoing response.
pub async fn apply_security_headers(
    State(headers): State<SecurityHeaders>,
    request: Request,
    next: Next,
) -> Response {
    let nonce = request
        .extensions()
        .get::<RequestContext>()
        .map(|ctx| ctx.nonce.clone());

    let mut response = next.run(request).await;
    headers.apply(&mut response, nonce.as_deref());
    response
}
