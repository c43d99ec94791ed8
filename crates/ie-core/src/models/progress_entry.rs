use crate::RecordId;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Checkpoint for one completed unit of restore work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressEntry {
    pub importable_id: RecordId,
    pub data: String,
    pub created_at: DateTime<Utc>,
}

impl ProgressEntry {
    pub fn new<S: Into<String>>(importable_id: RecordId, data: S) -> Self {
        Self {
            importable_id,
            data: data.into(),
            created_at: Utc::now(),
        }
    }
}
