use ie_core::{ImportExportError, RelationCounts};

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Serialize;

/// What a caller learns about a finished job.
///
/// `errors` only ever holds redacted messages.
#[derive(Debug, Clone, Default, Serialize)]
pub struct JobReport {
    pub success: bool,
    pub errors: Vec<String>,
    pub counts: BTreeMap<String, RelationCounts>,
    /// Written archive, exports only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archive: Option<PathBuf>,
}

impl JobReport {
    pub fn failed(error: &ImportExportError) -> Self {
        Self {
            success: false,
            errors: vec![error.user_message()],
            ..Self::default()
        }
    }

    pub fn total_created(&self) -> usize {
        self.counts.values().map(|c| c.created).sum()
    }

    pub fn total_failed(&self) -> usize {
        self.counts.values().map(|c| c.failed).sum()
    }
}
