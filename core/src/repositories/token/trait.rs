//! Store contract for refresh token rotation records.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::entities::token::RefreshTokenRecord;
use crate::domain::value_objects::identifiers::{FamilyId, TokenId, UserId};
use crate::errors::{DomainError, DomainResult};

/// Persistence contract for refresh token records
///
/// Implementations own atomicity of the id uniqueness check; everything else
/// is plain keyed reads and monotonic flag updates. Unknown users, families
/// and tokens are never errors: reads resolve to `false`/empty and
/// invalidations to a count of zero.
///
/// # Example
/// ```no_run
/// # use rk_core::repositories::token::RefreshTokenStore;
/// # use rk_core::domain::{RefreshTokenRecord, TokenId, UserId};
/// # async fn example(store: &impl RefreshTokenStore) -> Result<(), Box<dyn std::error::Error>> {
/// let user = UserId::Numeric(42);
/// let token = TokenId::generate();
/// let record = RefreshTokenRecord::new(
///     user,
///     token,
///     token,
///     "secret".to_string(),
///     chrono::Utc::now(),
///     chrono::Duration::days(14),
/// );
/// store.insert(record).await?;
/// assert!(store.is_valid(&user, &token, &token, chrono::Utc::now()).await?);
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    /// Persist a new record
    ///
    /// The existence check and the write must be one atomic step.
    ///
    /// # Returns
    /// * `Ok(())` - Record stored
    /// * `Err(DomainError::Conflict)` - `token_id` already present (expired or
    ///   invalidated records included); the existing record is left untouched
    /// * `Err(DomainError::Storage)` - Backend failure
    async fn insert(&self, record: RefreshTokenRecord) -> DomainResult<()>;

    /// Fetch a record by token id
    async fn find(&self, token_id: &TokenId) -> DomainResult<Option<RefreshTokenRecord>>;

    /// Whether the exact triple currently authorises a refresh
    ///
    /// Pure read. Backends able to answer in one query should override this.
    async fn is_valid(
        &self,
        user_id: &UserId,
        family_id: &FamilyId,
        token_id: &TokenId,
        now: DateTime<Utc>,
    ) -> DomainResult<bool> {
        Ok(self
            .find(token_id)
            .await?
            .map(|record| record.is_valid_for(user_id, family_id, token_id, now))
            .unwrap_or(false))
    }

    /// Invalidate the record matching the exact triple
    ///
    /// # Returns
    /// Number of records flipped by this call (0 or 1)
    async fn invalidate_token(
        &self,
        user_id: &UserId,
        family_id: &FamilyId,
        token_id: &TokenId,
    ) -> DomainResult<usize>;

    /// Invalidate every record of `(user_id, family_id)`
    ///
    /// # Returns
    /// Number of records flipped by this call
    async fn invalidate_family(&self, user_id: &UserId, family_id: &FamilyId)
        -> DomainResult<usize>;

    /// Whether [`invalidate_user_tokens`](Self::invalidate_user_tokens) is implemented
    fn supports_user_invalidation(&self) -> bool {
        false
    }

    /// Invalidate every record owned by `user_id`, across all families
    async fn invalidate_user_tokens(&self, user_id: &UserId) -> DomainResult<usize> {
        let _ = user_id;
        Err(DomainError::Unsupported {
            operation: "invalidate_user_tokens".to_string(),
        })
    }

    /// Every record of a rotation chain, oldest first
    ///
    /// Invalidated and expired members are included.
    async fn find_family(
        &self,
        user_id: &UserId,
        family_id: &FamilyId,
    ) -> DomainResult<Vec<RefreshTokenRecord>>;

    /// Records of `user_id` that would pass a validity check at `now`
    async fn find_active_by_user(
        &self,
        user_id: &UserId,
        now: DateTime<Utc>,
    ) -> DomainResult<Vec<RefreshTokenRecord>>;

    /// Number of records of `user_id` that are still valid at `now`
    async fn count_active_by_user(&self, user_id: &UserId, now: DateTime<Utc>) -> DomainResult<usize> {
        Ok(self.find_active_by_user(user_id, now).await?.len())
    }

    /// Physically remove records with `expires_at <= cutoff`
    ///
    /// Removal frees the token id. Callers keep `cutoff` well in the past so
    /// that ids are not released while a client could still present them.
    ///
    /// # Returns
    /// Number of records deleted
    async fn delete_reclaimable(&self, cutoff: DateTime<Utc>) -> DomainResult<usize>;
}
