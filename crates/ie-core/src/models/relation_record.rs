use serde::Serialize;
use serde_json::{Map, Value};

/// A sanitized, not yet persisted unit produced by the relation factory.
///
/// Carries no source-environment identifiers: only permitted attributes
/// and references already rewritten for the destination.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RelationRecord {
    pub relation_name: String,
    pub attributes: Map<String, Value>,
    pub target_class: String,
}
