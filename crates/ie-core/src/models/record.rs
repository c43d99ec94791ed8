use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub type RecordId = i64;

/// Where a child record hangs in the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParentLink {
    pub id: RecordId,
    pub relation: String,
}

/// A domain object as the object store hands it out.
///
/// `id` is None until the store has persisted the record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: Option<RecordId>,
    pub class: String,
    pub attributes: Map<String, Value>,
    pub parent: Option<ParentLink>,
    pub root_id: Option<RecordId>,
}

impl Record {
    pub fn new<S: Into<String>>(class: S, attributes: Map<String, Value>) -> Self {
        Self {
            id: None,
            class: class.into(),
            attributes,
            parent: None,
            root_id: None,
        }
    }

    pub fn with_parent<S: Into<String>>(
        mut self,
        parent_id: RecordId,
        relation: S,
        root_id: RecordId,
    ) -> Self {
        self.parent = Some(ParentLink {
            id: parent_id,
            relation: relation.into(),
        });
        self.root_id = Some(root_id);
        self
    }

    pub fn attribute_i64(&self, name: &str) -> Option<i64> {
        self.attributes.get(name).and_then(Value::as_i64)
    }

    pub fn attribute_str(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).and_then(Value::as_str)
    }
}
