//! Refresh token facade consumed by the authentication service

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::domain::entities::token::RefreshTokenRecord;
use crate::domain::value_objects::identifiers::{FamilyId, TokenId, UserId};
use crate::errors::{DomainError, DomainResult, ValidationError};
use crate::repositories::RefreshTokenStore;

use super::config::RefreshTokenServiceConfig;
use super::secret::{encode_secret, secret_matches};

/// Mechanism layer over a [`RefreshTokenStore`]
///
/// Accepts identifiers as raw strings, the way they come out of decoded token
/// claims, and validates them before the store is touched. It makes no policy
/// decisions: when to rotate and what counts as reuse belong to the caller.
pub struct RefreshTokenService<S: RefreshTokenStore + ?Sized> {
    store: Arc<S>,
    config: RefreshTokenServiceConfig,
}

impl<S: RefreshTokenStore + ?Sized> Clone for RefreshTokenService<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            config: self.config.clone(),
        }
    }
}

impl<S: RefreshTokenStore + ?Sized> RefreshTokenService<S> {
    /// Creates a new refresh token service
    ///
    /// # Arguments
    ///
    /// * `store` - Backing record store
    /// * `config` - Identifier kind, secret representation and default TTL
    pub fn new(store: Arc<S>, config: RefreshTokenServiceConfig) -> Self {
        Self { store, config }
    }

    /// Backing store
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn config(&self) -> &RefreshTokenServiceConfig {
        &self.config
    }

    /// Mint a fresh token identifier
    ///
    /// Never touches the store and never blocks.
    pub fn create_token_id(&self) -> TokenId {
        TokenId::generate()
    }

    /// Persist a new rotation record
    ///
    /// Passing `family_id == token_id` starts a new chain; any other family id
    /// appends to (or implicitly creates) that chain. The family does not have
    /// to exist beforehand.
    ///
    /// # Arguments
    ///
    /// * `user_id` - Owning user, in the configured identifier kind
    /// * `family_id` - Rotation chain identifier
    /// * `token_id` - Identifier of the new record
    /// * `secret` - Token secret, stored per the configured representation
    /// * `ttl` - Lifetime from now; zero yields a record that is never valid
    ///
    /// # Returns
    ///
    /// * `Ok(())` - Record stored
    /// * `Err(DomainError::Validation)` - Malformed identifier or unrepresentable TTL
    /// * `Err(DomainError::Conflict)` - `token_id` already used; mint a new one
    /// * `Err(DomainError::Storage)` - Backend failure, not retried
    pub async fn save_refresh_token(
        &self,
        user_id: &str,
        family_id: &str,
        token_id: &str,
        secret: &str,
        ttl: Duration,
    ) -> DomainResult<()> {
        let (user_id, family_id, token_id) = self.parse_triple(user_id, family_id, token_id)?;
        let ttl = chrono::Duration::from_std(ttl).map_err(|_| ttl_out_of_range())?;
        let now = Utc::now();
        if now.checked_add_signed(ttl).is_none() {
            return Err(ttl_out_of_range().into());
        }

        let record = RefreshTokenRecord::new(
            user_id,
            family_id,
            token_id,
            encode_secret(self.config.secret_storage, secret),
            now,
            ttl,
        );
        let expires_at = record.expires_at;

        match self.store.insert(record).await {
            Ok(()) => {
                info!(
                    user_id = %user_id,
                    family_id = %family_id,
                    token_id = %token_id,
                    expires_at = %expires_at,
                    "Saved refresh token"
                );
                Ok(())
            }
            Err(e) => Err(log_failure("save refresh token", e)),
        }
    }

    /// Persist a new rotation record using the configured default TTL
    pub async fn save_with_default_ttl(
        &self,
        user_id: &str,
        family_id: &str,
        token_id: &str,
        secret: &str,
    ) -> DomainResult<()> {
        self.save_refresh_token(user_id, family_id, token_id, secret, self.config.default_ttl)
            .await
    }

    /// Whether the exact triple currently authorises a refresh
    ///
    /// Unknown identifiers and any field mismatch yield `false`; malformed
    /// identifiers are a validation error.
    pub async fn is_refresh_token_valid(
        &self,
        user_id: &str,
        family_id: &str,
        token_id: &str,
    ) -> DomainResult<bool> {
        let (user_id, family_id, token_id) = self.parse_triple(user_id, family_id, token_id)?;
        let valid = self
            .store
            .is_valid(&user_id, &family_id, &token_id, Utc::now())
            .await
            .map_err(|e| log_failure("check refresh token", e))?;

        debug!(token_id = %token_id, valid, "Checked refresh token");
        Ok(valid)
    }

    /// Validity check plus comparison of the presented secret
    ///
    /// The comparison is constant-time. A mismatch is reported as `false`,
    /// indistinguishable from an unknown token.
    pub async fn verify_refresh_token(
        &self,
        user_id: &str,
        family_id: &str,
        token_id: &str,
        presented_secret: &str,
    ) -> DomainResult<bool> {
        let (user_id, family_id, token_id) = self.parse_triple(user_id, family_id, token_id)?;
        let record = self
            .store
            .find(&token_id)
            .await
            .map_err(|e| log_failure("verify refresh token", e))?;

        let verified = record
            .filter(|record| record.is_valid_for(&user_id, &family_id, &token_id, Utc::now()))
            .map(|record| {
                secret_matches(self.config.secret_storage, &record.secret_hash, presented_secret)
            })
            .unwrap_or(false);

        debug!(token_id = %token_id, verified, "Verified refresh token");
        Ok(verified)
    }

    /// Invalidate one record; absent or already invalidated is a no-op
    pub async fn invalidate_refresh_token(
        &self,
        user_id: &str,
        family_id: &str,
        token_id: &str,
    ) -> DomainResult<()> {
        let (user_id, family_id, token_id) = self.parse_triple(user_id, family_id, token_id)?;
        let flipped = self
            .store
            .invalidate_token(&user_id, &family_id, &token_id)
            .await
            .map_err(|e| log_failure("invalidate refresh token", e))?;

        info!(token_id = %token_id, flipped, "Invalidated refresh token");
        Ok(())
    }

    /// Invalidate a whole rotation chain; unknown families are a no-op
    pub async fn invalidate_refresh_token_family(
        &self,
        user_id: &str,
        family_id: &str,
    ) -> DomainResult<()> {
        let (user_id, family_id) = self.parse_scope(user_id, family_id)?;
        let flipped = self
            .store
            .invalidate_family(&user_id, &family_id)
            .await
            .map_err(|e| log_failure("invalidate refresh token family", e))?;

        info!(
            user_id = %user_id,
            family_id = %family_id,
            flipped,
            "Invalidated refresh token family"
        );
        Ok(())
    }

    /// Whether user-wide invalidation is available on the backing store
    pub fn supports_user_invalidation(&self) -> bool {
        self.store.supports_user_invalidation()
    }

    /// Invalidate every record of a user
    ///
    /// # Returns
    ///
    /// * `Ok(())` - Done, including when the user has no records
    /// * `Err(DomainError::Unsupported)` - Backing store lacks the capability;
    ///   check [`supports_user_invalidation`](Self::supports_user_invalidation) first
    pub async fn invalidate_user_refresh_tokens(&self, user_id: &str) -> DomainResult<()> {
        let user_id = self.parse_user(user_id)?;

        if !self.store.supports_user_invalidation() {
            warn!(user_id = %user_id, "User-wide invalidation not supported by store");
            return Err(DomainError::Unsupported {
                operation: "invalidate_user_refresh_tokens".to_string(),
            });
        }

        let flipped = self
            .store
            .invalidate_user_tokens(&user_id)
            .await
            .map_err(|e| log_failure("invalidate user refresh tokens", e))?;

        info!(user_id = %user_id, flipped, "Invalidated all refresh tokens of user");
        Ok(())
    }

    /// Every record of a rotation chain, oldest first
    pub async fn family_members(
        &self,
        user_id: &str,
        family_id: &str,
    ) -> DomainResult<Vec<RefreshTokenRecord>> {
        let (user_id, family_id) = self.parse_scope(user_id, family_id)?;
        self.store
            .find_family(&user_id, &family_id)
            .await
            .map_err(|e| log_failure("list refresh token family", e))
    }

    /// Records of a user that are currently valid
    pub async fn active_tokens(&self, user_id: &str) -> DomainResult<Vec<RefreshTokenRecord>> {
        let user_id = self.parse_user(user_id)?;
        self.store
            .find_active_by_user(&user_id, Utc::now())
            .await
            .map_err(|e| log_failure("list active refresh tokens", e))
    }

    fn parse_user(&self, raw: &str) -> Result<UserId, ValidationError> {
        UserId::parse(raw, self.config.user_id_kind)
    }

    fn parse_scope(&self, user_id: &str, family_id: &str) -> Result<(UserId, FamilyId), ValidationError> {
        Ok((self.parse_user(user_id)?, TokenId::parse(family_id, "family_id")?))
    }

    fn parse_triple(
        &self,
        user_id: &str,
        family_id: &str,
        token_id: &str,
    ) -> Result<(UserId, FamilyId, TokenId), ValidationError> {
        let (user_id, family_id) = self.parse_scope(user_id, family_id)?;
        Ok((user_id, family_id, TokenId::parse(token_id, "token_id")?))
    }
}

fn ttl_out_of_range() -> ValidationError {
    ValidationError::OutOfRange {
        field: "ttl".to_string(),
        max: "representable timestamp".to_string(),
    }
}

/// Log a store failure at the level its kind deserves and hand it back
fn log_failure(action: &str, err: DomainError) -> DomainError {
    match &err {
        DomainError::Conflict { token_id } => {
            warn!(token_id = %token_id, "Failed to {}: id already in use", action)
        }
        DomainError::Unsupported { operation } => {
            warn!(operation = %operation, "Failed to {}: unsupported", action)
        }
        _ => error!("Failed to {}: {}", action, err),
    }
    err
}
