//! Refresh token record entity.

use chrono::{DateTime, Duration, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::identifiers::{FamilyId, TokenId, UserId};

/// One link of a refresh token rotation chain, as persisted
///
/// `user_id` and `family_id` are fixed at creation. `is_invalidated` only ever
/// goes from `false` to `true`. Expiry is evaluated at read time; nothing
/// rewrites a record when it expires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshTokenRecord {
    /// Primary key, unique across the whole store
    pub token_id: TokenId,

    /// Rotation chain this record belongs to
    pub family_id: FamilyId,

    /// Owning user (non-owning reference into the external user store)
    pub user_id: UserId,

    /// Stored representation of the token secret
    pub secret_hash: String,

    /// Timestamp when the record was created
    pub created_at: DateTime<Utc>,

    /// Absolute expiry
    pub expires_at: DateTime<Utc>,

    /// Revocation marker
    pub is_invalidated: bool,
}

impl RefreshTokenRecord {
    /// Creates a record valid from `now` for `ttl`
    ///
    /// Both timestamps are truncated to whole milliseconds, the precision
    /// every backend persists, so a stored record never outlives the value
    /// computed here.
    pub fn new(
        user_id: UserId,
        family_id: FamilyId,
        token_id: TokenId,
        secret_hash: String,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Self {
        Self {
            token_id,
            family_id,
            user_id,
            secret_hash,
            created_at: now.trunc_subsecs(3),
            expires_at: (now + ttl).trunc_subsecs(3),
            is_invalidated: false,
        }
    }

    /// Whether this record is the first link of its chain
    pub fn is_family_root(&self) -> bool {
        self.token_id == self.family_id
    }

    /// Expired when `now` has reached `expires_at`
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    /// Exact match on the full (user, family, token) triple
    pub fn matches(&self, user_id: &UserId, family_id: &FamilyId, token_id: &TokenId) -> bool {
        self.token_id == *token_id && self.belongs_to_family(user_id, family_id)
    }

    /// Match on (user, family) regardless of token id
    pub fn belongs_to_family(&self, user_id: &UserId, family_id: &FamilyId) -> bool {
        self.user_id == *user_id && self.family_id == *family_id
    }

    /// Authorises a refresh: exact triple, not invalidated, not expired
    pub fn is_valid_for(
        &self,
        user_id: &UserId,
        family_id: &FamilyId,
        token_id: &TokenId,
        now: DateTime<Utc>,
    ) -> bool {
        self.matches(user_id, family_id, token_id) && !self.is_invalidated && !self.is_expired_at(now)
    }

    /// Marks the record invalidated. Returns `true` if this call flipped it.
    pub fn invalidate(&mut self) -> bool {
        let flipped = !self.is_invalidated;
        self.is_invalidated = true;
        flipped
    }

    /// Time left before expiry, zero once expired
    pub fn time_until_expiration(&self, now: DateTime<Utc>) -> Duration {
        if self.expires_at > now {
            self.expires_at - now
        } else {
            Duration::zero()
        }
    }
}
