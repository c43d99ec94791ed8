use crate::RecordId;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportFailure {
    pub importable_id: RecordId,
    /// Step that failed, e.g. `relation_factory_create` or `persist`
    pub source: String,
    pub relation_key: Option<String>,
    pub relation_index: Option<usize>,
    pub exception_class: String,
    pub exception_message: String,
    pub retry_count: u32,
    pub correlation_id: Uuid,
    /// Identifiers an operator can match against the source instance (`iid`)
    pub external_identifiers: Map<String, Value>,
    pub created_at: DateTime<Utc>,
}
