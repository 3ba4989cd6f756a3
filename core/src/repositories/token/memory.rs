//! In-memory refresh token store backed by sharded concurrent maps.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{debug, info, warn};

use crate::domain::entities::token::RefreshTokenRecord;
use crate::domain::value_objects::identifiers::{FamilyId, TokenId, UserId};
use crate::errors::{DomainError, DomainResult};

use super::r#trait::RefreshTokenStore;

/// Process-local store
///
/// Records live in a `DashMap` keyed by token id; the entry API makes the
/// uniqueness check and the insert a single step under one shard lock.
/// Families and users are derived groupings kept in two secondary indexes.
///
/// Lock order is `records` before the indexes: `insert` and the sweep update
/// the indexes while holding a `records` shard, and no index guard is ever
/// held while `records` is locked.
#[derive(Debug, Default)]
pub struct InMemoryTokenStore {
    records: DashMap<TokenId, RefreshTokenRecord>,
    families: DashMap<(UserId, FamilyId), Vec<TokenId>>,
    users: DashMap<UserId, Vec<TokenId>>,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of retained records, invalidated and expired included
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn family_ids(&self, user_id: &UserId, family_id: &FamilyId) -> Vec<TokenId> {
        self.families
            .get(&(*user_id, *family_id))
            .map(|ids| ids.value().clone())
            .unwrap_or_default()
    }

    fn user_ids(&self, user_id: &UserId) -> Vec<TokenId> {
        self.users
            .get(user_id)
            .map(|ids| ids.value().clone())
            .unwrap_or_default()
    }

    /// Flip every listed record that still satisfies `owned`
    fn invalidate_where<F>(&self, ids: &[TokenId], owned: F) -> usize
    where
        F: Fn(&RefreshTokenRecord) -> bool,
    {
        ids.iter()
            .filter(|id| {
                self.records
                    .get_mut(*id)
                    .map(|mut record| owned(record.value()) && record.invalidate())
                    .unwrap_or(false)
            })
            .count()
    }

    fn unindex(&self, record: &RefreshTokenRecord) {
        let family_key = (record.user_id, record.family_id);
        if let Some(mut ids) = self.families.get_mut(&family_key) {
            ids.retain(|id| *id != record.token_id);
        }
        self.families.remove_if(&family_key, |_, ids| ids.is_empty());

        if let Some(mut ids) = self.users.get_mut(&record.user_id) {
            ids.retain(|id| *id != record.token_id);
        }
        self.users.remove_if(&record.user_id, |_, ids| ids.is_empty());
    }
}

#[async_trait]
impl RefreshTokenStore for InMemoryTokenStore {
    async fn insert(&self, record: RefreshTokenRecord) -> DomainResult<()> {
        let token_id = record.token_id;
        let family_key = (record.user_id, record.family_id);
        let user_id = record.user_id;

        match self.records.entry(token_id) {
            Entry::Occupied(_) => {
                warn!(token_id = %token_id, "Refresh token id already in use");
                return Err(DomainError::Conflict {
                    token_id: token_id.to_string(),
                });
            }
            Entry::Vacant(slot) => {
                // Index before publishing: once the record is visible, family
                // and user invalidation must already be able to reach it.
                self.families.entry(family_key).or_default().push(token_id);
                self.users.entry(user_id).or_default().push(token_id);
                slot.insert(record);
            }
        }

        debug!(
            token_id = %token_id,
            family_id = %family_key.1,
            user_id = %user_id,
            "Stored refresh token"
        );
        Ok(())
    }

    async fn find(&self, token_id: &TokenId) -> DomainResult<Option<RefreshTokenRecord>> {
        Ok(self.records.get(token_id).map(|record| record.value().clone()))
    }

    async fn is_valid(
        &self,
        user_id: &UserId,
        family_id: &FamilyId,
        token_id: &TokenId,
        now: DateTime<Utc>,
    ) -> DomainResult<bool> {
        Ok(self
            .records
            .get(token_id)
            .map(|record| record.is_valid_for(user_id, family_id, token_id, now))
            .unwrap_or(false))
    }

    async fn invalidate_token(
        &self,
        user_id: &UserId,
        family_id: &FamilyId,
        token_id: &TokenId,
    ) -> DomainResult<usize> {
        let flipped = self.invalidate_where(std::slice::from_ref(token_id), |record| {
            record.matches(user_id, family_id, token_id)
        });
        debug!(token_id = %token_id, flipped, "Invalidated refresh token");
        Ok(flipped)
    }

    async fn invalidate_family(
        &self,
        user_id: &UserId,
        family_id: &FamilyId,
    ) -> DomainResult<usize> {
        let ids = self.family_ids(user_id, family_id);
        let flipped = self.invalidate_where(&ids, |record| record.belongs_to_family(user_id, family_id));
        info!(
            user_id = %user_id,
            family_id = %family_id,
            flipped,
            "Invalidated refresh token family"
        );
        Ok(flipped)
    }

    fn supports_user_invalidation(&self) -> bool {
        true
    }

    async fn invalidate_user_tokens(&self, user_id: &UserId) -> DomainResult<usize> {
        let ids = self.user_ids(user_id);
        let flipped = self.invalidate_where(&ids, |record| record.user_id == *user_id);
        info!(user_id = %user_id, flipped, "Invalidated all refresh tokens of user");
        Ok(flipped)
    }

    async fn find_family(
        &self,
        user_id: &UserId,
        family_id: &FamilyId,
    ) -> DomainResult<Vec<RefreshTokenRecord>> {
        let mut members: Vec<RefreshTokenRecord> = self
            .family_ids(user_id, family_id)
            .iter()
            .filter_map(|id| self.records.get(id).map(|record| record.value().clone()))
            .collect();
        members.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.token_id.cmp(&b.token_id))
        });
        Ok(members)
    }

    async fn find_active_by_user(
        &self,
        user_id: &UserId,
        now: DateTime<Utc>,
    ) -> DomainResult<Vec<RefreshTokenRecord>> {
        Ok(self
            .user_ids(user_id)
            .iter()
            .filter_map(|id| self.records.get(id).map(|record| record.value().clone()))
            .filter(|record| !record.is_invalidated && !record.is_expired_at(now))
            .collect())
    }

    async fn delete_reclaimable(&self, cutoff: DateTime<Utc>) -> DomainResult<usize> {
        let mut removed = Vec::new();
        self.records.retain(|_, record| {
            if record.is_expired_at(cutoff) {
                removed.push(record.clone());
                false
            } else {
                true
            }
        });

        for record in &removed {
            // An insert reusing the freed id indexes under the same shard lock
            if let Entry::Vacant(_) = self.records.entry(record.token_id) {
                self.unindex(record);
            }
        }

        if !removed.is_empty() {
            info!(deleted = removed.len(), cutoff = %cutoff, "Reclaimed expired refresh tokens");
        }
        Ok(removed.len())
    }
}
