//! Per-request context threaded through the pipeline.
//!
//! The context stage inserts a [`RequestContext`] into the request extensions;
//! later stages fill in their part and handlers extract it. Nothing here is
//! shared between requests.

use std::collections::BTreeMap;
use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};

use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{request::Parts, HeaderMap, Request},
};
use cookie::Cookie;
use serde_json::Value;

use crate::http::error::AppError;
use crate::query::RawQueryParams;

/// Request-scoped data owned by the pipeline for the request's lifetime.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Address used as the rate limiting key.
    pub client_addr: IpAddr,
    /// Cookies parsed by the body ingestion stage.
    pub cookies: BTreeMap<String, String>,
    /// Parsed JSON body, when the request carried one.
    pub body: Option<Value>,
    /// Fresh random token for inline-script trust.
    pub nonce: String,
}

impl RequestContext {
    pub fn new(client_addr: IpAddr, nonce: String) -> Self {
        Self {
            client_addr,
            cookies: BTreeMap::new(),
            body: None,
            nonce,
        }
    }

    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }
}

impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<RequestContext>()
            .cloned()
            .ok_or_else(|| AppError::unexpected("request context missing from extensions"))
    }
}

/// Query parameters after pollution defense, or parsed fresh from the URI when
/// that stage did not run.
#[derive(Debug, Clone)]
pub struct QueryParams(pub RawQueryParams);

impl<S> FromRequestParts<S> for QueryParams
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let params = parts
            .extensions
            .get::<RawQueryParams>()
            .cloned()
            .unwrap_or_else(|| RawQueryParams::from_uri(&parts.uri));
        Ok(QueryParams(params))
    }
}

/// Resolve the client address.
///
/// `X-Forwarded-For` is only honoured when the deployment sits behind a
/// trusted proxy; otherwise the socket peer is used.
pub fn client_ip<B>(req: &Request<B>, trust_forwarded_for: bool) -> IpAddr {
    if trust_forwarded_for {
        if let Some(ip) = forwarded_for(req.headers()) {
            return ip;
        }
    }

    if let Some(ConnectInfo(addr)) = req.extensions().get::<ConnectInfo<SocketAddr>>() {
        return addr.ip();
    }

    IpAddr::from([127, 0, 0, 1])
}

fn forwarded_for(headers: &HeaderMap) -> Option<IpAddr> {
    headers
        .get("x-forwarded-for")?
        .to_str()
        .ok()?
        .split(',')
        .next()?
        .trim()
        .parse()
        .ok()
}

/// Parse `Cookie` headers into name/value pairs with percent-decoded values.
/// Later duplicates and unparsable pairs are ignored.
pub fn parse_cookies(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut cookies = BTreeMap::new();
    for header in headers.get_all(axum::http::header::COOKIE) {
        let Ok(raw) = header.to_str() else { continue };
        for cookie in Cookie::split_parse_encoded(raw).filter_map(Result::ok) {
            cookies
                .entry(cookie.name().to_string())
                .or_insert_with(|| cookie.value_trimmed().to_string());
        }
    }
    cookies
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::HeaderValue;

    #[test]
    fn test_parse_cookies() {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::COOKIE,
            HeaderValue::from_static("jwt=abc.def; theme=\"dark\"; broken; jwt=second"),
        );
        let cookies = parse_cookies(&headers);
        assert_eq!(cookies.get("jwt").map(String::as_str), Some("abc.def"));
        assert_eq!(cookies.get("theme").map(String::as_str), Some("dark"));
        assert_eq!(cookies.len(), 2);
    }

    #[test]
    fn test_parse_cookies_decodes_values() {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::COOKIE,
            HeaderValue::from_static("jwt=a%20b%3Dc; plain=x"),
        );
        let cookies = parse_cookies(&headers);
        assert_eq!(cookies.get("jwt").map(String::as_str), Some("a b=c"));
        assert_eq!(cookies.get("plain").map(String::as_str), Some("x"));
    }

    #[test]
    fn test_client_ip_prefers_connect_info() {
        let mut req = Request::builder()
            .header("x-forwarded-for", "203.0.113.9, 10.0.0.1")
            .body(Body::empty())
            .unwrap();
        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([192, 0, 2, 7], 5555))));

        assert_eq!(client_ip(&req, false), IpAddr::from([192, 0, 2, 7]));
        assert_eq!(client_ip(&req, true), IpAddr::from([203, 0, 113, 9]));
    }

    #[test]
    fn test_client_ip_default() {
        let req = Request::builder().body(Body::empty()).unwrap();
        assert_eq!(client_ip(&req, true), IpAddr::from([127, 0, 0, 1]));
    }
}
