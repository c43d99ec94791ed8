use crate::Result as DbErrorResult;

use ie_core::{StoreResult, User, UserDirectory};

use async_trait::async_trait;
use sqlx::SqlitePool;

const GHOST_USERNAME: &str = "ghost";
const GHOST_EMAIL: &str = "ghost@example.invalid";
const GHOST_NAME: &str = "Ghost User";

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    username: String,
    email: String,
    name: String,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            username: row.username,
            email: row.email,
            name: row.name,
        }
    }
}

pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, username: &str, email: &str, name: &str) -> DbErrorResult<User> {
        let result = sqlx::query("INSERT INTO ie_users (username, email, name) VALUES (?, ?, ?)")
            .bind(username)
            .bind(email)
            .bind(name)
            .execute(&self.pool)
            .await?;

        Ok(User {
            id: result.last_insert_rowid(),
            username: username.to_string(),
            email: email.to_string(),
            name: name.to_string(),
        })
    }

    /// Create the ghost account unless it already exists.
    pub async fn ensure_ghost(&self) -> DbErrorResult<User> {
        sqlx::query(
            r#"
              INSERT INTO ie_users (username, email, name, ghost)
              VALUES (?, ?, ?, 1)
              ON CONFLICT(username) DO NOTHING
              "#,
        )
        .bind(GHOST_USERNAME)
        .bind(GHOST_EMAIL)
        .bind(GHOST_NAME)
        .execute(&self.pool)
        .await?;

        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, username, email, name FROM ie_users WHERE username = ?",
        )
        .bind(GHOST_USERNAME)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    pub async fn find_by_id(&self, id: i64) -> DbErrorResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, username, email, name FROM ie_users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(User::from))
    }

    pub async fn find_by_email(&self, email: &str) -> DbErrorResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, username, email, name FROM ie_users WHERE lower(email) = lower(?) AND ghost = 0",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(User::from))
    }

    pub async fn find_by_username(&self, username: &str) -> DbErrorResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, username, email, name FROM ie_users WHERE username = ? AND ghost = 0",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(User::from))
    }

    async fn find_ghost(&self) -> DbErrorResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, username, email, name FROM ie_users WHERE ghost = 1 LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(User::from))
    }
}

#[async_trait]
impl UserDirectory for UserRepository {
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        Ok(self.find_by_email(email).await?)
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        Ok(self.find_by_username(username).await?)
    }

    async fn ghost_user(&self) -> StoreResult<Option<User>> {
        Ok(self.find_ghost().await?)
    }
}
