//! Fixed-window rate limiting per client address.
//!
//! # Design Decisions
//! - A window starts on the first request and resets exactly at
//!   `window_start + window`, not before
//! - Increment-and-compare happens under the map's per-key entry lock, so two
//!   concurrent requests from one client never both see a stale count
//! - Only paths below the API prefix are counted

use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;

use crate::config::RateLimitConfig;
use crate::http::context::{client_ip, RequestContext};
use crate::http::error::{AppError, OperationalError};
use crate::security::is_api_path;
use crate::observability::metrics;

/// Outcome of a single rate limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    /// Time until the current window resets.
    pub reset_after: Duration,
}

/// Narrow interface so a shared external counter can replace the in-process one.
pub trait RateLimiter: Send + Sync {
    fn check(&self, key: &str) -> RateDecision;
}

/// Per-client counter for the current window.
#[derive(Debug, Clone, Copy)]
struct RateWindow {
    count: u32,
    window_start: Instant,
}

/// In-process fixed-window limiter.
pub struct FixedWindowLimiter {
    windows: DashMap<String, RateWindow>,
    max_requests: u32,
    window: Duration,
}

impl FixedWindowLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            windows: DashMap::new(),
            max_requests,
            window,
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.max_requests, Duration::from_secs(config.window_secs))
    }

    /// Count one request for `key` at time `now`.
    pub fn check_at(&self, key: &str, now: Instant) -> RateDecision {
        let mut entry = self
            .windows
            .entry(key.to_string())
            .or_insert(RateWindow { count: 0, window_start: now });
        let window = entry.value_mut();

        let expires = window.window_start + self.window;
        if window.count == 0 || now >= expires {
            window.count = 1;
            window.window_start = now;
        } else {
            window.count = window.count.saturating_add(1);
        }

        RateDecision {
            allowed: window.count <= self.max_requests,
            limit: self.max_requests,
            remaining: self.max_requests.saturating_sub(window.count),
            reset_after: (window.window_start + self.window).saturating_duration_since(now),
        }
    }

    /// Drop windows that have expired at `now`.
    pub fn cleanup_at(&self, now: Instant) {
        let window = self.window;
        self.windows
            .retain(|_, w| now < w.window_start + window);
    }

    /// Number of clients with a tracked window.
    pub fn tracked_clients(&self) -> usize {
        self.windows.len()
    }
}

impl RateLimiter for FixedWindowLimiter {
    fn check(&self, key: &str) -> RateDecision {
        self.check_at(key, Instant::now())
    }
}

/// State for the rate limiting stage.
#[derive(Clone)]
pub struct RateLimitStage {
    pub limiter: Arc<dyn RateLimiter>,
    pub api_prefix: String,
    pub message: String,
    pub trust_forwarded_for: bool,
}

/// Middleware function for per-client rate limiting.
pub async fn rate_limit(
    State(stage): State<RateLimitStage>,
    request: Request,
    next: Next,
) -> Response {
    if !is_api_path(request.uri().path(), &stage.api_prefix) {
        return next.run(request).await;
    }

    let client: IpAddr = match request.extensions().get::<RequestContext>() {
        Some(ctx) => ctx.client_addr,
        None => client_ip(&request, stage.trust_forwarded_for),
    };
    let decision = stage.limiter.check(&client.to_string());

    if !decision.allowed {
        tracing::warn!(client = %client, limit = decision.limit, "Rate limit exceeded");
        metrics::record_rate_limited();
        let mut response =
            AppError::from(OperationalError::too_many_requests(stage.message.clone())).into_response();
        let headers = response.headers_mut();
        write_headers(headers, &decision);
        headers.insert("retry-after", HeaderValue::from(decision.reset_after.as_secs().max(1)));
        return response;
    }

    let mut response = next.run(request).await;
    write_headers(response.headers_mut(), &decision);
    response
}

fn write_headers(headers: &mut HeaderMap, decision: &RateDecision) {
    headers.insert("x-ratelimit-limit", HeaderValue::from(decision.limit));
    headers.insert("x-ratelimit-remaining", HeaderValue::from(decision.remaining));
    headers.insert(
        "x-ratelimit-reset",
        HeaderValue::from(decision.reset_after.as_secs()),
    );
}

/// Background task sweeping expired windows.
pub async fn cleanup_task(limiter: Arc<FixedWindowLimiter>, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        limiter.cleanup_at(Instant::now());
        metrics::record_rate_windows(limiter.tracked_clients());
    }
}
