use crate::Result as DbErrorResult;

use ie_core::{ProgressEntry, ProgressStore, RecordId, StoreResult};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

pub struct ProgressEntryRepository {
    pool: SqlitePool,
}

impl ProgressEntryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn exists(&self, importable_id: RecordId, data: &str) -> DbErrorResult<bool> {
        let found: Option<i64> = sqlx::query_scalar(
            r#"
              SELECT 1
              FROM ie_import_progress_entries
              WHERE importable_id = ? AND data = ?
              "#,
        )
        .bind(importable_id)
        .bind(data)
        .fetch_optional(&self.pool)
        .await?;

        Ok(found.is_some())
    }

    /// Insert one checkpoint; a duplicate is silently ignored.
    pub async fn create(&self, importable_id: RecordId, data: &str) -> DbErrorResult<()> {
        let created_at = Utc::now().timestamp();

        sqlx::query(
            r#"
              INSERT INTO ie_import_progress_entries (importable_id, data, created_at)
              VALUES (?, ?, ?)
              ON CONFLICT(importable_id, data) DO NOTHING
              "#,
        )
        .bind(importable_id)
        .bind(data)
        .bind(created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn find_by_importable(&self, importable_id: RecordId) -> DbErrorResult<Vec<ProgressEntry>> {
        let rows: Vec<(String, i64)> = sqlx::query_as(
            r#"
              SELECT data, created_at
              FROM ie_import_progress_entries
              WHERE importable_id = ?
              ORDER BY created_at ASC, data ASC
              "#,
        )
        .bind(importable_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(data, created_at)| ProgressEntry {
                importable_id,
                data,
                created_at: DateTime::from_timestamp(created_at, 0).unwrap_or_default(),
            })
            .collect())
    }
}

#[async_trait]
impl ProgressStore for ProgressEntryRepository {
    async fn processed_entry(&self, importable_id: RecordId, data: &str) -> StoreResult<bool> {
        Ok(self.exists(importable_id, data).await?)
    }

    async fn save_processed_entry(&self, importable_id: RecordId, data: &str) -> StoreResult<()> {
        Ok(self.create(importable_id, data).await?)
    }
}
