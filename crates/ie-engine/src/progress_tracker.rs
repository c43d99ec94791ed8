use ie_core::{
    FailureLog, ImportExportError, ImportFailure, JobContext, ProgressStore, RecordId, Result,
};

use std::sync::Arc;

use chrono::Utc;
use log::{debug, error};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Checkpoints and failure rows for one importable root.
pub struct ProgressTracker {
    progress: Arc<dyn ProgressStore>,
    failures: Arc<dyn FailureLog>,
    importable_id: RecordId,
    correlation_id: Uuid,
}

impl ProgressTracker {
    pub fn new(
        progress: Arc<dyn ProgressStore>,
        failures: Arc<dyn FailureLog>,
        ctx: &JobContext,
    ) -> Self {
        Self {
            progress,
            failures,
            importable_id: ctx.target.id,
            correlation_id: ctx.correlation_id,
        }
    }

    /// `"{relation_key}/{relation_index}"`
    pub fn entry_key(relation_key: &str, relation_index: usize) -> String {
        format!("{}/{}", relation_key, relation_index)
    }

    pub async fn processed(&self, data: &str) -> Result<bool> {
        Ok(self.progress.processed_entry(self.importable_id, data).await?)
    }

    pub async fn save(&self, data: &str) -> Result<()> {
        self.progress
            .save_processed_entry(self.importable_id, data)
            .await?;
        debug!("Checkpoint saved: {}", data);
        Ok(())
    }

    /// Record a failure. A failure to record is logged, never raised.
    pub async fn log_failure(
        &self,
        source: &str,
        relation_key: Option<&str>,
        relation_index: Option<usize>,
        failure: &ImportExportError,
        retry_count: u32,
        raw: Option<&Map<String, Value>>,
    ) {
        let mut external_identifiers = Map::new();
        if let Some(iid) = raw.and_then(|raw| raw.get("iid")) {
            external_identifiers.insert("iid".to_string(), iid.clone());
        }

        let row = ImportFailure {
            importable_id: self.importable_id,
            source: source.to_string(),
            relation_key: relation_key.map(str::to_string),
            relation_index,
            exception_class: failure.kind().to_string(),
            exception_message: failure.to_string(),
            retry_count,
            correlation_id: self.correlation_id,
            external_identifiers,
            created_at: Utc::now(),
        };

        if let Err(e) = self.failures.log_import_failure(&row).await {
            error!("Failed to record import failure: {}", e);
        }
    }

    pub async fn failures(&self) -> Result<Vec<ImportFailure>> {
        Ok(self.failures.failures_for(self.importable_id).await?)
    }
}
