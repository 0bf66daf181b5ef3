//! Document store interface.
//!
//! The gateway never executes queries itself; resource handlers hand a
//! [`StructuredQuery`] to whatever implements [`DocumentStore`].

pub mod memory;

use async_trait::async_trait;
use serde_json::Value;

use crate::query::StructuredQuery;

pub use memory::MemoryStore;

/// Failure inside the store. Always surfaced to clients as an unexpected error.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("unknown collection: {0}")]
    UnknownCollection(String),

    #[error("document must be a JSON object")]
    InvalidDocument,

    #[error("store backend failure: {0}")]
    Backend(String),
}

/// Query execution collaborator.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Run a structured query against a collection.
    async fn find(&self, collection: &str, query: &StructuredQuery) -> Result<Vec<Value>, StoreError>;

    /// Insert a document and return it as stored.
    async fn create(&self, collection: &str, document: Value) -> Result<Value, StoreError>;
}
