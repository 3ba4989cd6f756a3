//! Mock implementation of RefreshTokenStore for testing
//!
//! Lacks user-wide invalidation and can be told to fail, which the in-memory
//! store never does.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::entities::token::RefreshTokenRecord;
use crate::domain::value_objects::identifiers::{FamilyId, TokenId, UserId};
use crate::errors::{DomainError, DomainResult};

use super::r#trait::RefreshTokenStore;

/// Mock token store for testing
pub struct MockTokenStore {
    tokens: Arc<RwLock<HashMap<TokenId, RefreshTokenRecord>>>,
    fail_storage: AtomicBool,
}

impl MockTokenStore {
    /// Create a new mock store
    pub fn new() -> Self {
        Self {
            tokens: Arc::new(RwLock::new(HashMap::new())),
            fail_storage: AtomicBool::new(false),
        }
    }

    /// Make every following call return a storage error
    pub fn set_unavailable(&self, unavailable: bool) {
        self.fail_storage.store(unavailable, Ordering::SeqCst);
    }

    /// Number of stored records
    pub async fn len(&self) -> usize {
        self.tokens.read().await.len()
    }

    fn check_available(&self) -> DomainResult<()> {
        if self.fail_storage.load(Ordering::SeqCst) {
            return Err(DomainError::Storage {
                message: "connection refused".to_string(),
            });
        }
        Ok(())
    }
}

impl Default for MockTokenStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RefreshTokenStore for MockTokenStore {
    async fn insert(&self, record: RefreshTokenRecord) -> DomainResult<()> {
        self.check_available()?;
        let mut tokens = self.tokens.write().await;

        // Check for duplicate
        if tokens.contains_key(&record.token_id) {
            return Err(DomainError::Conflict {
                token_id: record.token_id.to_string(),
            });
        }

        tokens.insert(record.token_id, record);
        Ok(())
    }

    async fn find(&self, token_id: &TokenId) -> DomainResult<Option<RefreshTokenRecord>> {
        self.check_available()?;
        let tokens = self.tokens.read().await;
        Ok(tokens.get(token_id).cloned())
    }

    async fn invalidate_token(
        &self,
        user_id: &UserId,
        family_id: &FamilyId,
        token_id: &TokenId,
    ) -> DomainResult<usize> {
        self.check_available()?;
        let mut tokens = self.tokens.write().await;

        match tokens.get_mut(token_id) {
            Some(record) if record.matches(user_id, family_id, token_id) => {
                Ok(usize::from(record.invalidate()))
            }
            _ => Ok(0),
        }
    }

    async fn invalidate_family(
        &self,
        user_id: &UserId,
        family_id: &FamilyId,
    ) -> DomainResult<usize> {
        self.check_available()?;
        let mut tokens = self.tokens.write().await;

        let mut flipped = 0;
        for record in tokens.values_mut() {
            if record.belongs_to_family(user_id, family_id) && record.invalidate() {
                flipped += 1;
            }
        }
        Ok(flipped)
    }

    async fn find_family(
        &self,
        user_id: &UserId,
        family_id: &FamilyId,
    ) -> DomainResult<Vec<RefreshTokenRecord>> {
        self.check_available()?;
        let tokens = self.tokens.read().await;
        let mut members: Vec<_> = tokens
            .values()
            .filter(|record| record.belongs_to_family(user_id, family_id))
            .cloned()
            .collect();
        members.sort_by_key(|record| record.created_at);
        Ok(members)
    }

    async fn find_active_by_user(
        &self,
        user_id: &UserId,
        now: DateTime<Utc>,
    ) -> DomainResult<Vec<RefreshTokenRecord>> {
        self.check_available()?;
        let tokens = self.tokens.read().await;
        Ok(tokens
            .values()
            .filter(|record| record.user_id == *user_id)
            .filter(|record| !record.is_invalidated && !record.is_expired_at(now))
            .cloned()
            .collect())
    }

    async fn delete_reclaimable(&self, cutoff: DateTime<Utc>) -> DomainResult<usize> {
        self.check_available()?;
        let mut tokens = self.tokens.write().await;
        let before = tokens.len();
        tokens.retain(|_, record| !record.is_expired_at(cutoff));
        Ok(before - tokens.len())
    }
}
