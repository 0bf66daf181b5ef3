//! Logging and metrics.
//!
//! `logging` installs the tracing subscriber and the development request log;
//! `metrics` records request, error and rate limit counters for the optional
//! Prometheus endpoint. Request IDs reach every log line through the
//! tower-http trace span.

pub mod logging;
pub mod metrics;
