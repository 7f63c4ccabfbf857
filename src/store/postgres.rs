//! PostgreSQL document store backed by a JSONB table

use serde_json::Value;
use sqlx::{FromRow, PgPool};

use super::{DocumentStore, StoreError, StoredDocument};

#[derive(Debug, FromRow)]
struct DocumentRow {
    id: String,
    data: Value,
}

pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[axum::async_trait]
impl DocumentStore for PgDocumentStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn put(&self, collection: &str, id: &str, document: Value) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO documents (collection, id, data)
            VALUES ($1, $2, $3)
            "#
        )
        .bind(collection)
        .bind(id)
        .bind(&document)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(StoreError::Conflict {
                    collection: collection.to_string(),
                    id: id.to_string(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn get_all(&self, collection: &str) -> Result<Vec<StoredDocument>, StoreError> {
        let rows = sqlx::query_as::<_, DocumentRow>(
            r#"
            SELECT id, data FROM documents
            WHERE collection = $1
            ORDER BY created_at ASC, id ASC
            "#
        )
        .bind(collection)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| StoredDocument { id: r.id, data: r.data })
            .collect())
    }
}
