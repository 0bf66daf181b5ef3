//! Resource API gateway library.
//!
//! Translates untrusted query strings into structured store queries and puts
//! every request through a fixed security pipeline before it reaches a
//! resource handler.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod query;
pub mod security;
pub mod store;

pub use config::schema::GatewayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
