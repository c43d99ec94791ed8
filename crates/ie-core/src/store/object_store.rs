use crate::store::{Association, StoreResult};
use crate::{Record, RecordId};

use async_trait::async_trait;
use serde_json::{Map, Value};

/// Opaque persistence for the domain graph.
///
/// Export walks associations through it; import builds and persists
/// records through it. Implementations decide how relations map onto
/// their storage.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn find_record(&self, class: &str, id: RecordId) -> StoreResult<Option<Record>>;

    /// Whole association, used for has-one relations.
    async fn get_association(&self, record: &Record, name: &str) -> StoreResult<Association>;

    /// One keyset page of a has-many association, ordered by id ascending.
    ///
    /// Rows that cannot be decoded come back as `StoreError::Encoding` so the
    /// caller can skip them without losing the rest of the page.
    async fn get_association_page(
        &self,
        record: &Record,
        name: &str,
        after: Option<RecordId>,
        limit: usize,
    ) -> StoreResult<Vec<StoreResult<Record>>>;

    async fn get_attribute(&self, record: &Record, name: &str) -> StoreResult<Option<Value>> {
        Ok(record.attributes.get(name).cloned())
    }

    async fn new_instance(&self, class: &str, attributes: Map<String, Value>) -> StoreResult<Record> {
        Ok(Record::new(class, attributes))
    }

    /// Insert a new record. The store assigns the id.
    async fn persist(&self, record: &Record) -> StoreResult<RecordId>;

    /// Overwrite the attributes of an already persisted record.
    async fn update(&self, record: &Record) -> StoreResult<()>;

    /// Find a record of `class` under `root_id` whose attributes match `keys`.
    async fn find_existing(
        &self,
        root_id: RecordId,
        class: &str,
        keys: &Map<String, Value>,
    ) -> StoreResult<Option<Record>>;

    /// Hint that `names` will be read for every record in `records`.
    async fn preload(&self, _records: &[Record], _names: &[String]) -> StoreResult<()> {
        Ok(())
    }
}
