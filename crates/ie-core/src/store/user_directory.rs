use crate::User;
use crate::store::StoreResult;

use async_trait::async_trait;

/// Destination-instance user lookup.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>>;

    /// Placeholder account for authors deleted on the source instance.
    async fn ghost_user(&self) -> StoreResult<Option<User>> {
        Ok(None)
    }
}
