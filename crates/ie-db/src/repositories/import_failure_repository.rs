use crate::{DbError, Result as DbErrorResult};

use ie_core::{ErrorLocation, FailureLog, ImportFailure, RecordId, StoreResult};

use std::panic::Location;

use async_trait::async_trait;
use chrono::DateTime;
use sqlx::SqlitePool;
use uuid::Uuid;

#[derive(sqlx::FromRow)]
struct FailureRow {
    importable_id: i64,
    source: String,
    relation_key: Option<String>,
    relation_index: Option<i64>,
    exception_class: String,
    exception_message: String,
    retry_count: i64,
    correlation_id: String,
    external_identifiers: String,
    created_at: i64,
}

impl FailureRow {
    fn decode(self) -> DbErrorResult<ImportFailure> {
        let correlation_id = Uuid::parse_str(&self.correlation_id).map_err(|e| DbError::Decode {
            column: "correlation_id",
            message: e.to_string(),
            location: ErrorLocation::from(Location::caller()),
        })?;

        Ok(ImportFailure {
            importable_id: self.importable_id,
            source: self.source,
            relation_key: self.relation_key,
            relation_index: self
                .relation_index
                .and_then(|index| usize::try_from(index).ok()),
            exception_class: self.exception_class,
            exception_message: self.exception_message,
            retry_count: u32::try_from(self.retry_count).unwrap_or(u32::MAX),
            correlation_id,
            external_identifiers: serde_json::from_str(&self.external_identifiers)?,
            created_at: DateTime::from_timestamp(self.created_at, 0).unwrap_or_default(),
        })
    }
}

pub struct ImportFailureRepository {
    pool: SqlitePool,
}

impl ImportFailureRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, failure: &ImportFailure) -> DbErrorResult<()> {
        let relation_index = failure
            .relation_index
            .and_then(|index| i64::try_from(index).ok());
        let correlation_id = failure.correlation_id.to_string();
        let external_identifiers = serde_json::to_string(&failure.external_identifiers)?;

        sqlx::query(
            r#"
              INSERT INTO ie_import_failures (
                  importable_id, source, relation_key, relation_index,
                  exception_class, exception_message, retry_count,
                  correlation_id, external_identifiers, created_at
              ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
              "#,
        )
        .bind(failure.importable_id)
        .bind(&failure.source)
        .bind(&failure.relation_key)
        .bind(relation_index)
        .bind(&failure.exception_class)
        .bind(&failure.exception_message)
        .bind(i64::from(failure.retry_count))
        .bind(correlation_id)
        .bind(external_identifiers)
        .bind(failure.created_at.timestamp())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn find_by_importable(&self, importable_id: RecordId) -> DbErrorResult<Vec<ImportFailure>> {
        let rows = sqlx::query_as::<_, FailureRow>(
            r#"
              SELECT importable_id, source, relation_key, relation_index,
                     exception_class, exception_message, retry_count,
                     correlation_id, external_identifiers, created_at
              FROM ie_import_failures
              WHERE importable_id = ?
              ORDER BY id ASC
              "#,
        )
        .bind(importable_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(FailureRow::decode).collect()
    }
}

#[async_trait]
impl FailureLog for ImportFailureRepository {
    async fn log_import_failure(&self, failure: &ImportFailure) -> StoreResult<()> {
        Ok(self.create(failure).await?)
    }

    async fn failures_for(&self, importable_id: RecordId) -> StoreResult<Vec<ImportFailure>> {
        Ok(self.find_by_importable(importable_id).await?)
    }
}
