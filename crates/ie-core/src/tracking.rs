use crate::store::StoreResult;
use crate::{ImportFailure, RecordId};

use async_trait::async_trait;

/// Checkpoints keyed by `(importable_id, data)`. Never removed by the engine.
#[async_trait]
pub trait ProgressStore: Send + Sync {
    async fn processed_entry(&self, importable_id: RecordId, data: &str) -> StoreResult<bool>;

    /// Writing an entry that already exists is a no-op.
    async fn save_processed_entry(&self, importable_id: RecordId, data: &str) -> StoreResult<()>;
}

#[async_trait]
pub trait FailureLog: Send + Sync {
    async fn log_import_failure(&self, failure: &ImportFailure) -> StoreResult<()>;

    async fn failures_for(&self, importable_id: RecordId) -> StoreResult<Vec<ImportFailure>>;
}
