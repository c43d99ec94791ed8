use ie_core::{ObjectStore, Record, RecordId};
use ie_db::SqliteObjectStore;

use serde_json::{Map, Value, json};

pub fn attrs(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => panic!("fixture attributes must be an object"),
    }
}

/// Persists a root project and returns its id
pub async fn create_test_project(store: &SqliteObjectStore, name: &str) -> RecordId {
    let record = Record::new("Project", attrs(json!({"name": name, "path": name})));
    store.persist(&record).await.expect("Failed to persist project")
}

/// Persists a child record under `parent_id`
pub async fn create_test_child(
    store: &SqliteObjectStore,
    root_id: RecordId,
    parent_id: RecordId,
    relation: &str,
    class: &str,
    attributes: Value,
) -> RecordId {
    let record = Record::new(class, attrs(attributes)).with_parent(parent_id, relation, root_id);
    store.persist(&record).await.expect("Failed to persist child")
}
