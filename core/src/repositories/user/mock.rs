//! Mock implementation of UserLookup for testing

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::entities::user::UserAccount;
use crate::domain::value_objects::identifiers::UserId;
use crate::errors::DomainResult;

use super::trait_::UserLookup;

/// Mock user lookup for testing
pub struct MockUserLookup {
    users: Arc<RwLock<HashMap<UserId, UserAccount>>>,
    invited_lookup: bool,
}

impl MockUserLookup {
    /// Create a new mock lookup
    pub fn new() -> Self {
        Self {
            users: Arc::new(RwLock::new(HashMap::new())),
            invited_lookup: false,
        }
    }

    /// Create a mock that also answers invited-user lookups
    pub fn with_invited_lookup() -> Self {
        Self {
            invited_lookup: true,
            ..Self::new()
        }
    }

    pub async fn add_user(&self, account: UserAccount) {
        self.users.write().await.insert(account.id, account);
    }
}

impl Default for MockUserLookup {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserLookup for MockUserLookup {
    async fn get_user_by_id(&self, id: &UserId) -> DomainResult<Option<UserAccount>> {
        let users = self.users.read().await;
        Ok(users.get(id).cloned())
    }

    fn supports_invited_lookup(&self) -> bool {
        self.invited_lookup
    }

    async fn get_new_user_by_id(&self, id: &UserId) -> DomainResult<Option<UserAccount>> {
        if !self.invited_lookup {
            return Err(crate::errors::DomainError::Unsupported {
                operation: "get_new_user_by_id".to_string(),
            });
        }
        let users = self.users.read().await;
        Ok(users.get(id).filter(|account| account.is_pending()).cloned())
    }
}
