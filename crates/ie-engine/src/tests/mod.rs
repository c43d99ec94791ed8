mod member_mapper;

use ie_core::{StoreResult, TargetRoot, User, UserDirectory};

use async_trait::async_trait;

pub(crate) fn user(id: i64, username: &str, email: &str) -> User {
    User {
        id,
        username: username.to_string(),
        email: email.to_string(),
        name: username.to_string(),
    }
}

pub(crate) fn target(id: i64) -> TargetRoot {
    TargetRoot {
        id,
        class: "Project".to_string(),
        namespace_id: Some(7),
        namespace_visibility: None,
    }
}

/// Fixed destination users.
pub(crate) struct StaticUsers {
    pub users: Vec<User>,
    pub ghost: Option<User>,
}

#[async_trait]
impl UserDirectory for StaticUsers {
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
