use crate::{RecordId, User};

use serde_json::{Map, Value};
use uuid::Uuid;

/// Everything a job needs to know about who imports into what.
///
/// Passed explicitly to every component; nothing reads ambient state.
#[derive(Debug, Clone)]
pub struct JobContext {
    pub importing_user: User,
    pub target: TargetRoot,
    pub correlation_id: Uuid,
    pub options: ImportOptions,
}

impl JobContext {
    pub fn new(importing_user: User, target: TargetRoot) -> Self {
        Self {
            importing_user,
            target,
            correlation_id: Uuid::new_v4(),
            options: ImportOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ImportOptions) -> Self {
        self.options = options;
        self
    }
}

/// The destination project or group, created before the import starts.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetRoot {
    pub id: RecordId,
    pub class: String,
    pub namespace_id: Option<RecordId>,
    /// Visibility ceiling inherited from the destination namespace
    pub namespace_visibility: Option<i64>,
}

#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    /// Root attributes that win over the archived ones (still permitted first)
    pub override_params: Map<String, Value>,
    /// Name used in the missing-author note appended to notes
    pub source_name: Option<String>,
}
