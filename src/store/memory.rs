//! In-memory document store
//!
//! Used when no database is configured, and by tests.

use std::collections::HashMap;

use parking_lot::RwLock;
use serde_json::Value;

use super::{DocumentStore, StoreError, StoredDocument};

#[derive(Default)]
pub struct MemoryDocumentStore {
    collections: RwLock<HashMap<String, Vec<StoredDocument>>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents in a collection
    pub fn len(&self, collection: &str) -> usize {
        self.collections
            .read()
            .get(collection)
            .map(Vec::len)
            .unwrap_or(0)
    }

    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }
}

#[axum::async_trait]
impl DocumentStore for MemoryDocumentStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn put(&self, collection: &str, id: &str, document: Value) -> Result<(), StoreError> {
        let mut collections = self.collections.write();
        let docs = collections.entry(collection.to_string()).or_default();

        if docs.iter().any(|d| d.id == id) {
            return Err(StoreError::Conflict {
                collection: collection.to_string(),
                id: id.to_string(),
            });
        }

        docs.push(StoredDocument {
            id: id.to_string(),
            data: document,
        });
        Ok(())
    }

    async fn get_all(&self, collection: &str) -> Result<Vec<StoredDocument>, StoreError> {
        Ok(self
            .collections
            .read()
            .get(collection)
            .cloned()
            .unwrap_or_default())
    }
}
