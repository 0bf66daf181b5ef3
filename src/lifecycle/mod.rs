//! Process lifecycle: stop signals and graceful shutdown.
//!
//! ```text
//! SIGINT / SIGTERM (signals.rs)
//!     → Shutdown::trigger (shutdown.rs)
//!     → server stops accepting, drains in-flight requests
//!     → rate limit cleanup task exits
//! ```

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
