//! Prediction record model

use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::pipeline::{Diagnosis, Verdict};
use crate::store::{self, DocumentStore, StoreError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionRecord {
    pub id: String,
    pub result: Diagnosis,
    pub suggestion: String,
    pub created_at: String,
}

/// One row of the history listing
#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntry {
    pub id: String,
    pub history: PredictionRecord,
}

impl PredictionRecord {
    /// Wrap a verdict with a fresh id and the current time
    pub fn assemble(verdict: &Verdict) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            result: verdict.diagnosis,
            suggestion: verdict.suggestion().to_string(),
            created_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }

    pub async fn save(
        &self,
        store: &dyn DocumentStore,
        collection: &str,
        limit: Duration,
    ) -> Result<(), StoreError> {
        let document = serde_json::to_value(self)?;
        store::bounded(limit, store.put(collection, &self.id, document)).await
    }

    /// All stored predictions, newest first. Unreadable documents are skipped.
    pub async fn list(
        store: &dyn DocumentStore,
        collection: &str,
        limit: Duration,
    ) -> Result<Vec<Self>, StoreError> {
        let docs = store::bounded(limit, store.get_all(collection)).await?;

        let mut records: Vec<Self> = docs
            .into_iter()
            .filter_map(|doc| match serde_json::from_value::<Self>(doc.data) {
                Ok(record) => Some(record),
                Err(e) => {
                    tracing::warn!("Skipping unreadable prediction {}: {}", doc.id, e);
                    None
                }
            })
            .collect();

        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }
}

impl From<PredictionRecord> for HistoryEntry {
    fn from(record: PredictionRecord) -> Self {
        Self {
            id: record.id.clone(),
            history: record,
        }
    }
}
