//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, static assets, security pipeline)
//!     → context.rs (per-request context and sanitized query extractors)
//!     → timeout.rs (request deadline answered by the error responder)
//!     → handlers.rs (query translation, store access)
//!     → error.rs (terminal error responder)
//!     → Send to client
//! ```

pub mod context;
pub mod error;
pub mod handlers;
pub mod server;
pub mod timeout;

pub use context::{QueryParams, RequestContext};
pub use error::{AppError, OperationalError};
pub use server::HttpServer;
