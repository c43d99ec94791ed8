use ie_core::{
    Association, FailureLog, ImportFailure, ObjectStore, ProgressStore, Record, RecordId,
    StoreError, StoreResult, User, UserDirectory,
};

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{Map, Value, json};

const USER_ASSOCIATIONS: [&str; 2] = ["author", "user"];

#[derive(Default)]
struct StoreState {
    records: BTreeMap<RecordId, Record>,
    users: BTreeMap<i64, User>,
    next_id: RecordId,
    corrupt: BTreeSet<RecordId>,
    transient: HashMap<String, u32>,
    rejected: HashSet<String>,
    persist_calls: usize,
}

impl StoreState {
    fn check_writable(&mut self, class: &str) -> StoreResult<()> {
        if self.rejected.contains(class) {
            return Err(StoreError::rejected(format!("{} is not valid", class)));
        }
        if let Some(remaining) = self.transient.get_mut(class)
            && *remaining > 0
        {
            *remaining -= 1;
            return Err(StoreError::transient("database is locked"));
        }
        Ok(())
    }

    fn children(&self, parent_id: RecordId, relation: &str) -> Vec<&Record> {
        self.records
            .values()
            .filter(|r| {
                r.parent
                    .as_ref()
                    .is_some_and(|p| p.id == parent_id && p.relation == relation)
            })
            .collect()
    }

    fn decode(&self, record: &Record) -> StoreResult<Record> {
        let id = record.id.unwrap_or_default();
        if self.corrupt.contains(&id) {
            return Err(StoreError::encoding(id, "invalid byte sequence for encoding UTF8"));
        }
        Ok(record.clone())
    }

    fn user_record(&self, id: i64) -> Option<Record> {
        self.users.get(&id).map(|user| {
            let attributes = json!({
                "id": user.id,
                "email": user.email,
                "username": user.username,
                "name": user.name,
            });
            let mut record = Record::new("User", attributes.as_object().cloned().unwrap_or_default());
            record.id = Some(user.id);
            record
        })
    }
}

/// Object store over an in-memory map with injectable write failures.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<StoreState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let store = Self::default();
        store.state.lock().unwrap().next_id = 1000;
        store
    }

    pub fn add_user(&self, user: User) {
        self.state.lock().unwrap().users.insert(user.id, user);
    }

    /// A root record; its `root_id` is its own id.
    pub fn seed_root(&self, class: &str, attributes: Value) -> Record {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = state.next_id;
        let mut record = Record::new(class, attributes.as_object().cloned().unwrap_or_default());
        record.id = Some(id);
        record.root_id = Some(id);
        state.records.insert(id, record.clone());
        record
    }

    pub fn seed_child(&self, parent: &Record, relation: &str, class: &str, attributes: Value) -> Record {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = state.next_id;
        let parent_id = parent.id.unwrap();
        let root_id = parent.root_id.unwrap_or(parent_id);
        let mut record = Record::new(class, attributes.as_object().cloned().unwrap_or_default())
            .with_parent(parent_id, relation, root_id);
        record.id = Some(id);
        state.records.insert(id, record.clone());
        record
    }

    pub fn set_attribute(&self, id: RecordId, key: &str, value: Value) {
        let mut state = self.state.lock().unwrap();
        if let Some(record) = state.records.get_mut(&id) {
            record.attributes.insert(key.to_string(), value);
        }
    }

    pub fn corrupt(&self, id: RecordId) {
        self.state.lock().unwrap().corrupt.insert(id);
    }

    /// The next `times` writes of `class` fail as busy.
    pub fn fail_transiently(&self, class: &str, times: u32) {
        self.state
            .lock()
            .unwrap()
            .transient
            .insert(class.to_string(), times);
    }

    pub fn reject(&self, class: &str) {
        self.state.lock().unwrap().rejected.insert(class.to_string());
    }

    pub fn record(&self, id: RecordId) -> Option<Record> {
        self.state.lock().unwrap().records.get(&id).cloned()
    }

    pub fn children_of(&self, parent_id: RecordId, relation: &str) -> Vec<Record> {
        let state = self.state.lock().unwrap();
        state.children(parent_id, relation).into_iter().cloned().collect()
    }

    pub fn under_root(&self, root_id: RecordId, class: &str) -> Vec<Record> {
        self.state
            .lock()
            .unwrap()
            .records
            .values()
            .filter(|r| r.root_id == Some(root_id) && r.class == class && r.id != Some(root_id))
            .cloned()
            .collect()
    }

    pub fn record_count(&self) -> usize {
        self.state.lock().unwrap().records.len()
    }

    pub fn persist_calls(&self) -> usize {
        self.state.lock().unwrap().persist_calls
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn find_record(&self, class: &str, id: RecordId) -> StoreResult<Option<Record>> {
        let state = self.state.lock().unwrap();
        Ok(state.records.get(&id).filter(|r| r.class == class).cloned())
    }

    async fn get_association(&self, record: &Record, name: &str) -> StoreResult<Association> {
        let state = self.state.lock().unwrap();
        let Some(id) = record.id else {
            return Ok(Association::Many(Vec::new()));
        };

        if let Some(target) = record.attribute_i64(&format!("{}_id", name)) {
            let found = if USER_ASSOCIATIONS.contains(&name) {
                state.user_record(target)
            } else {
                match state.records.get(&target) {
                    Some(found) => Some(state.decode(found)?),
                    None => None,
                }
            };
            return Ok(Association::One(found));
        }

        let records = state
            .children(id, name)
            .into_iter()
            .map(|r| state.decode(r))
            .collect::<StoreResult<Vec<Record>>>()?;
        Ok(Association::Many(records))
    }

    async fn get_association_page(
        &self,
        record: &Record,
        name: &str,
        after: Option<RecordId>,
        limit: usize,
    ) -> StoreResult<Vec<StoreResult<Record>>> {
        let state = self.state.lock().unwrap();
        let Some(id) = record.id else {
            return Ok(Vec::new());
        };
        let after = after.unwrap_or(0);

        Ok(state
            .children(id, name)
            .into_iter()
            .filter(|r| r.id.unwrap_or_default() > after)
            .take(limit)
            .map(|r| state.decode(r))
            .collect())
    }

    async fn persist(&self, record: &Record) -> StoreResult<RecordId> {
        let mut state = self.state.lock().unwrap();
        state.persist_calls += 1;
        state.check_writable(&record.class)?;

        state.next_id += 1;
        let id = state.next_id;
        let mut saved = record.clone();
        saved.id = Some(id);
        state.records.insert(id, saved);
        Ok(id)
    }

    async fn update(&self, record: &Record) -> StoreResult<()> {
        let mut state = self.state.lock().unwrap();
        let Some(id) = record.id else {
            return Err(StoreError::rejected("cannot update an unsaved record"));
        };
        state.check_writable(&record.class)?;

        match state.records.get_mut(&id) {
            Some(existing) => {
                existing.attributes = record.attributes.clone();
                Ok(())
            }
            None => Err(StoreError::not_found(record.class.clone(), id)),
        }
    }

    async fn find_existing(
        &self,
        root_id: RecordId,
        class: &str,
        keys: &Map<String, Value>,
    ) -> StoreResult<Option<Record>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .records
            .values()
            .filter(|r| r.root_id == Some(root_id) && r.class == class)
            .find(|r| keys.iter().all(|(k, v)| r.attributes.get(k) == Some(v)))
            .cloned())
    }
}

/// Destination users, with an optional ghost account.
#[derive(Default)]
pub struct MemoryUsers {
    pub users: Vec<User>,
    pub ghost: Option<User>,
}

#[async_trait]
impl UserDirectory for MemoryUsers {
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self.users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        Ok(self.users.iter().find(|u| u.username == username).cloned())
    }

    async fn ghost_user(&self) -> StoreResult<Option<User>> {
        Ok(self.ghost.clone())
    }
}

#[derive(Default)]
pub struct MemoryProgress {
    entries: Mutex<BTreeSet<(RecordId, String)>>,
}

impl MemoryProgress {
    pub fn entries(&self) -> Vec<String> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .map(|(_, data)| data.clone())
            .collect()
    }
}

#[async_trait]
impl ProgressStore for MemoryProgress {
    async fn processed_entry(&self, importable_id: RecordId, data: &str) -> StoreResult<bool> {
        Ok(self
            .entries
            .lock()
            .unwrap()
            .contains(&(importable_id, data.to_string())))
    }

    async fn save_processed_entry(&self, importable_id: RecordId, data: &str) -> StoreResult<()> {
        self.entries
            .lock()
            .unwrap()
            .insert((importable_id, data.to_string()));
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryFailures {
    rows: Mutex<Vec<ImportFailure>>,
}

impl MemoryFailures {
    pub fn rows(&self) -> Vec<ImportFailure> {
        self.rows.lock().unwrap().clone()
    }
}

#[async_trait]
impl FailureLog for MemoryFailures {
    async fn log_import_failure(&self, failure: &ImportFailure) -> StoreResult<()> {
        self.rows.lock().unwrap().push(failure.clone());
        Ok(())
    }

    async fn failures_for(&self, importable_id: RecordId) -> StoreResult<Vec<ImportFailure>> {
        Ok(self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|row| row.importable_id == importable_id)
            .cloned()
            .collect())
    }
}
