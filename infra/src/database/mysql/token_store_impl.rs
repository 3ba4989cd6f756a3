//! MySQL implementation of the RefreshTokenStore trait.
//!
//! Uniqueness of token ids is enforced by the table's primary key, so the
//! insert is a single statement and a duplicate surfaces as MySQL error 1062.
//! Invalidation statements only touch rows that are still valid, which makes
//! `rows_affected` the number of records flipped by the call.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::mysql::{MySqlDatabaseError, MySqlRow};
use sqlx::{MySqlPool, Row};

use rk_core::domain::{FamilyId, RefreshTokenRecord, TokenId, UserId};
use rk_core::errors::{DomainError, DomainResult};
use rk_core::repositories::RefreshTokenStore;

const RECORD_COLUMNS: &str =
    "token_id, family_id, user_id, secret_hash, created_at, expires_at, is_invalidated";

/// MySQL implementation of RefreshTokenStore
pub struct MySqlRefreshTokenStore {
    /// Database connection pool
    pool: MySqlPool,
}

impl MySqlRefreshTokenStore {
    /// Create a new MySQL token store
    ///
    /// # Arguments
    /// * `pool` - MySQL connection pool from SQLx
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Convert database row to RefreshTokenRecord entity
    fn row_to_record(row: &MySqlRow) -> DomainResult<RefreshTokenRecord> {
        let token_id: String = row
            .try_get("token_id")
            .map_err(|e| DomainError::storage("Failed to get token_id", e))?;
        let family_id: String = row
            .try_get("family_id")
            .map_err(|e| DomainError::storage("Failed to get family_id", e))?;
        let user_id: String = row
            .try_get("user_id")
            .map_err(|e| DomainError::storage("Failed to get user_id", e))?;

        Ok(RefreshTokenRecord {
            token_id: TokenId::parse(&token_id, "token_id")
                .map_err(|e| DomainError::storage("Invalid stored token_id", e))?,
            family_id: TokenId::parse(&family_id, "family_id")
                .map_err(|e| DomainError::storage("Invalid stored family_id", e))?,
            user_id: user_id
                .parse::<UserId>()
                .map_err(|e| DomainError::storage("Invalid stored user_id", e))?,
            secret_hash: row
                .try_get("secret_hash")
                .map_err(|e| DomainError::storage("Failed to get secret_hash", e))?,
            created_at: row
                .try_get::<DateTime<Utc>, _>("created_at")
                .map_err(|e| DomainError::storage("Failed to get created_at", e))?,
            expires_at: row
                .try_get::<DateTime<Utc>, _>("expires_at")
                .map_err(|e| DomainError::storage("Failed to get expires_at", e))?,
            is_invalidated: row
                .try_get("is_invalidated")
                .map_err(|e| DomainError::storage("Failed to get is_invalidated", e))?,
        })
    }

    fn rows_to_records(rows: &[MySqlRow]) -> DomainResult<Vec<RefreshTokenRecord>> {
        rows.iter().map(Self::row_to_record).collect()
    }
}

/// Whether a statement failed on a unique or primary key
fn is_dup_key(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db) = err {
        if let Some(mysql_err) = db.try_downcast_ref::<MySqlDatabaseError>() {
            return mysql_err.number() == 1062; // ER_DUP_ENTRY
        }
    }

    false
}

#[async_trait]
impl RefreshTokenStore for MySqlRefreshTokenStore {
    async fn insert(&self, record: RefreshTokenRecord) -> DomainResult<()> {
        let query = r#"
            INSERT INTO refresh_tokens (
                token_id, family_id, user_id, secret_hash, created_at, expires_at, is_invalidated
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
        "#;

        let result = sqlx::query(query)
            .bind(record.token_id.to_string())
            .bind(record.family_id.to_string())
            .bind(record.user_id.to_string())
            .bind(&record.secret_hash)
            .bind(record.created_at)
            .bind(record.expires_at)
            .bind(record.is_invalidated)
            .execute(&self.pool)
            .await;

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_dup_key(&e) => {
                tracing::warn!(token_id = %record.token_id, "Refresh token id already in use");
                Err(DomainError::Conflict {
                    token_id: record.token_id.to_string(),
                })
            }
            Err(e) => Err(DomainError::storage("Failed to save refresh token", e)),
        }
    }

    async fn find(&self, token_id: &TokenId) -> DomainResult<Option<RefreshTokenRecord>> {
        let query = format!(
            "SELECT {} FROM refresh_tokens WHERE token_id = ? LIMIT 1",
            RECORD_COLUMNS
        );

        let result = sqlx::query(&query)
            .bind(token_id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::storage("Failed to find refresh token", e))?;

        match result {
            Some(row) => Ok(Some(Self::row_to_record(&row)?)),
            None => Ok(None),
        }
    }

    async fn is_valid(
        &self,
        user_id: &UserId,
        family_id: &FamilyId,
        token_id: &TokenId,
        now: DateTime<Utc>,
    ) -> DomainResult<bool> {
        let query = r#"
            SELECT EXISTS(
                SELECT 1 FROM refresh_tokens
                WHERE token_id = ?
                  AND family_id = ?
                  AND user_id = ?
                  AND is_invalidated = FALSE
                  AND expires_at > ?
            ) AS is_valid
        "#;

        let row = sqlx::query(query)
            .bind(token_id.to_string())
            .bind(family_id.to_string())
            .bind(user_id.to_string())
            .bind(now)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DomainError::storage("Failed to check refresh token", e))?;

        let valid: i64 = row
            .try_get("is_valid")
            .map_err(|e| DomainError::storage("Failed to get validity result", e))?;

        Ok(valid == 1)
    }

    async fn invalidate_token(
        &self,
        user_id: &UserId,
        family_id: &FamilyId,
        token_id: &TokenId,
    ) -> DomainResult<usize> {
        let query = r#"
            UPDATE refresh_tokens
            SET is_invalidated = TRUE
            WHERE token_id = ? AND family_id = ? AND user_id = ? AND is_invalidated = FALSE
        "#;

        let result = sqlx::query(query)
            .bind(token_id.to_string())
            .bind(family_id.to_string())
            .bind(user_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::storage("Failed to invalidate refresh token", e))?;

        Ok(result.rows_affected() as usize)
    }

    async fn invalidate_family(
        &self,
        user_id: &UserId,
        family_id: &FamilyId,
    ) -> DomainResult<usize> {
        let query = r#"
            UPDATE refresh_tokens
            SET is_invalidated = TRUE
            WHERE user_id = ? AND family_id = ? AND is_invalidated = FALSE
        "#;

        let result = sqlx::query(query)
            .bind(user_id.to_string())
            .bind(family_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::storage("Failed to invalidate refresh token family", e))?;

        Ok(result.rows_affected() as usize)
    }

    fn supports_user_invalidation(&self) -> bool {
        true
    }

    async fn invalidate_user_tokens(&self, user_id: &UserId) -> DomainResult<usize> {
        let query = r#"
            UPDATE refresh_tokens
            SET is_invalidated = TRUE
            WHERE user_id = ? AND is_invalidated = FALSE
        "#;

        let result = sqlx::query(query)
            .bind(user_id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::storage("Failed to invalidate user refresh tokens", e))?;

        Ok(result.rows_affected() as usize)
    }

    async fn find_family(
        &self,
        user_id: &UserId,
        family_id: &FamilyId,
    ) -> DomainResult<Vec<RefreshTokenRecord>> {
        let query = format!(
            "SELECT {} FROM refresh_tokens WHERE user_id = ? AND family_id = ? \
             ORDER BY created_at ASC, token_id ASC",
            RECORD_COLUMNS
        );

        let rows = sqlx::query(&query)
            .bind(user_id.to_string())
            .bind(family_id.to_string())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DomainError::storage("Failed to find refresh token family", e))?;

        Self::rows_to_records(&rows)
    }

    async fn find_active_by_user(
        &self,
        user_id: &UserId,
        now: DateTime<Utc>,
    ) -> DomainResult<Vec<RefreshTokenRecord>> {
        let query = format!(
            "SELECT {} FROM refresh_tokens \
             WHERE user_id = ? AND is_invalidated = FALSE AND expires_at > ? \
             ORDER BY created_at ASC",
            RECORD_COLUMNS
        );

        let rows = sqlx::query(&query)
            .bind(user_id.to_string())
            .bind(now)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DomainError::storage("Failed to find active refresh tokens", e))?;

        Self::rows_to_records(&rows)
    }

    async fn count_active_by_user(&self, user_id: &UserId, now: DateTime<Utc>) -> DomainResult<usize> {
        let query = r#"
            SELECT COUNT(*) AS active
            FROM refresh_tokens
            WHERE user_id = ? AND is_invalidated = FALSE AND expires_at > ?
        "#;

        let row = sqlx::query(query)
            .bind(user_id.to_string())
            .bind(now)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DomainError::storage("Failed to count active refresh tokens", e))?;

        let count: i64 = row
            .try_get("active")
            .map_err(|e| DomainError::storage("Failed to get count", e))?;

        Ok(count as usize)
    }

    async fn delete_reclaimable(&self, cutoff: DateTime<Utc>) -> DomainResult<usize> {
        let query = "DELETE FROM refresh_tokens WHERE expires_at <= ?";

        let result = sqlx::query(query)
            .bind(cutoff)
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::storage("Failed to delete expired refresh tokens", e))?;

        let deleted = result.rows_affected() as usize;
        if deleted > 0 {
            tracing::info!("Deleted {} reclaimable refresh tokens", deleted);
        }
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_database_errors_are_not_duplicates() {
        assert!(!is_dup_key(&sqlx::Error::RowNotFound));
        assert!(!is_dup_key(&sqlx::Error::PoolTimedOut));
    }

    #[test]
    fn test_record_columns_match_schema() {
        for column in RECORD_COLUMNS.split(", ") {
            assert!(
                crate::database::schema::REFRESH_TOKENS_TABLE.contains(column),
                "column {} missing from schema",
                column
            );
        }
    }
}
