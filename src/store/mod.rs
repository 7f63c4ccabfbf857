//! Document store - keyed JSON documents grouped by collection

pub mod memory;
pub mod postgres;

use std::future::Future;
use std::time::Duration;

use serde_json::Value;

pub use memory::MemoryDocumentStore;
pub use postgres::PgDocumentStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("document {collection}/{id} already exists")]
    Conflict { collection: String, id: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("store call did not finish within {0:?}")]
    TimedOut(Duration),
}

/// A document as read back from the store
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub id: String,
    pub data: Value,
}

#[axum::async_trait]
pub trait DocumentStore: Send + Sync {
    /// Backend name for logs and the health endpoint
    fn backend(&self) -> &'static str;

    /// Write a new document. Documents are immutable; an existing id is a conflict.
    async fn put(&self, collection: &str, id: &str, document: Value) -> Result<(), StoreError>;

    /// All documents of a collection, oldest first
    async fn get_all(&self, collection: &str) -> Result<Vec<StoredDocument>, StoreError>;
}

/// Bound a store call in time
pub async fn bounded<T, F>(limit: Duration, call: F) -> Result<T, StoreError>
where
    F: Future<Output = Result<T, StoreError>>,
{
    tokio::time::timeout(limit, call)
        .await
        .map_err(|_| StoreError::TimedOut(limit))?
}
