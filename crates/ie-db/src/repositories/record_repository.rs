use crate::{DbError, Result as DbErrorResult};

use ie_core::{Association, ObjectStore, ParentLink, Record, RecordId, StoreError, StoreResult};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value, json};
use sqlx::SqlitePool;

/// Associations that point into the user table rather than at records.
const USER_ASSOCIATIONS: [&str; 4] = ["author", "user", "owner", "assignee"];
const USER_CLASS: &str = "User";

#[derive(sqlx::FromRow)]
struct RecordRow {
    id: i64,
    class: String,
    root_id: Option<i64>,
    parent_id: Option<i64>,
    relation: Option<String>,
    attributes: String,
}

impl RecordRow {
    fn decode(self) -> StoreResult<Record> {
        let attributes: Map<String, Value> = serde_json::from_str(&self.attributes)
            .map_err(|e| StoreError::encoding(self.id, e.to_string()))?;

        let parent = match (self.parent_id, self.relation) {
            (Some(id), Some(relation)) => Some(ParentLink { id, relation }),
            _ => None,
        };

        Ok(Record {
            id: Some(self.id),
            class: self.class,
            attributes,
            parent,
            root_id: self.root_id,
        })
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    username: String,
    email: String,
    name: String,
}

/// Generic record table implementing the object store.
///
/// Children hang off `parent_id` + `relation`; belongs-to style
/// associations resolve through a `<name>_id` attribute.
#[derive(Clone)]
pub struct SqliteObjectStore {
    pool: SqlitePool,
}

impl SqliteObjectStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn find_by_id(&self, id: RecordId) -> DbErrorResult<Option<RecordRow>> {
        let row = sqlx::query_as::<_, RecordRow>(
            r#"
              SELECT id, class, root_id, parent_id, relation, attributes
              FROM ie_records
              WHERE id = ?
              "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn find_user_record(&self, id: i64) -> DbErrorResult<Option<Record>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, username, email, name FROM ie_users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|user| {
            let attributes = json!({
                "id": user.id,
                "username": user.username,
                "email": user.email,
                "name": user.name,
            });
            let mut record = Record::new(USER_CLASS, attributes.as_object().cloned().unwrap_or_default());
            record.id = Some(user.id);
            record
        }))
    }

    async fn children(
        &self,
        parent_id: RecordId,
        relation: &str,
        after: RecordId,
        limit: i64,
    ) -> DbErrorResult<Vec<RecordRow>> {
        let rows = sqlx::query_as::<_, RecordRow>(
            r#"
              SELECT id, class, root_id, parent_id, relation, attributes
              FROM ie_records
              WHERE parent_id = ? AND relation = ? AND id > ?
              ORDER BY id ASC
              LIMIT ?
              "#,
        )
        .bind(parent_id)
        .bind(relation)
        .bind(after)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn insert(&self, record: &Record) -> DbErrorResult<RecordId> {
        let attributes = serde_json::to_string(&record.attributes)?;
        let now = Utc::now().timestamp();
        let (parent_id, relation) = match &record.parent {
            Some(link) => (Some(link.id), Some(link.relation.as_str())),
            None => (None, None),
        };

        let result = sqlx::query(
            r#"
              INSERT INTO ie_records (class, root_id, parent_id, relation, attributes, created_at, updated_at)
              VALUES (?, ?, ?, ?, ?, ?, ?)
              "#,
        )
        .bind(&record.class)
        .bind(record.root_id)
        .bind(parent_id)
        .bind(relation)
        .bind(attributes)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    async fn update_attributes(&self, id: RecordId, attributes: &Map<String, Value>) -> DbErrorResult<u64> {
        let attributes = serde_json::to_string(attributes)?;
        let now = Utc::now().timestamp();

        let result = sqlx::query("UPDATE ie_records SET attributes = ?, updated_at = ? WHERE id = ?")
            .bind(attributes)
            .bind(now)
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    async fn by_root_and_class(&self, root_id: RecordId, class: &str) -> DbErrorResult<Vec<RecordRow>> {
        let rows = sqlx::query_as::<_, RecordRow>(
            r#"
              SELECT id, class, root_id, parent_id, relation, attributes
              FROM ie_records
              WHERE root_id = ? AND class = ?
              ORDER BY id ASC
              "#,
        )
        .bind(root_id)
        .bind(class)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Every record under `root_id` for `relation`, in insertion order.
    pub async fn records_for_relation(
        &self,
        root_id: RecordId,
        relation: &str,
    ) -> StoreResult<Vec<Record>> {
        let rows = sqlx::query_as::<_, RecordRow>(
            r#"
              SELECT id, class, root_id, parent_id, relation, attributes
              FROM ie_records
              WHERE root_id = ? AND relation = ?
              ORDER BY id ASC
              "#,
        )
        .bind(root_id)
        .bind(relation)
        .fetch_all(&self.pool)
        .await
        .map_err(DbError::from)?;

        rows.into_iter().map(RecordRow::decode).collect()
    }
}

#[async_trait]
impl ObjectStore for SqliteObjectStore {
    async fn find_record(&self, class: &str, id: RecordId) -> StoreResult<Option<Record>> {
        match self.find_by_id(id).await? {
            Some(row) if row.class == class => row.decode().map(Some),
            _ => Ok(None),
        }
    }

    async fn get_association(&self, record: &Record, name: &str) -> StoreResult<Association> {
        let Some(id) = record.id else {
            return Ok(Association::Many(Vec::new()));
        };

        if let Some(target) = record.attribute_i64(&format!("{}_id", name)) {
            let found = if USER_ASSOCIATIONS.contains(&name) {
                self.find_user_record(target).await?
            } else {
                match self.find_by_id(target).await? {
                    Some(row) => Some(row.decode()?),
                    None => None,
                }
            };
            return Ok(Association::One(found));
        }

        let rows = self.children(id, name, 0, i64::MAX).await?;
        let records = rows
            .into_iter()
            .map(RecordRow::decode)
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
        let Some(id) = record.id else {
            return Ok(Vec::new());
        };

        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = self.children(id, name, after.unwrap_or(0), limit).await?;
        Ok(rows.into_iter().map(RecordRow::decode).collect())
    }

    async fn persist(&self, record: &Record) -> StoreResult<RecordId> {
        Ok(self.insert(record).await?)
    }

    async fn update(&self, record: &Record) -> StoreResult<()> {
        let Some(id) = record.id else {
            return Err(StoreError::rejected(format!(
                "cannot update unsaved {}",
                record.class
            )));
        };

        match self.update_attributes(id, &record.attributes).await? {
            0 => Err(StoreError::not_found(record.class.clone(), id)),
            _ => Ok(()),
        }
    }

    async fn find_existing(
        &self,
        root_id: RecordId,
        class: &str,
        keys: &Map<String, Value>,
    ) -> StoreResult<Option<Record>> {
        for row in self.by_root_and_class(root_id, class).await? {
            let record = row.decode()?;
            if keys
                .iter()
                .all(|(key, value)| record.attributes.get(key) == Some(value))
            {
                return Ok(Some(record));
            }
        }
        Ok(None)
    }
}
