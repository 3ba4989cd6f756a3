//! Schema bootstrap for the refresh token table
//!
//! Applied on startup when `database.auto_migrate` is enabled. Statements are
//! idempotent so repeated startups are harmless.

use sqlx::MySqlPool;

use crate::InfrastructureError;

/// Table holding one row per rotation record
pub const REFRESH_TOKENS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS refresh_tokens (
        token_id CHAR(36) NOT NULL,
        family_id CHAR(36) NOT NULL,
        user_id VARCHAR(64) NOT NULL,
        secret_hash TEXT NOT NULL,
        created_at DATETIME(3) NOT NULL,
        expires_at DATETIME(3) NOT NULL,
        is_invalidated BOOLEAN NOT NULL DEFAULT FALSE,
        PRIMARY KEY (token_id),
        INDEX idx_refresh_tokens_family (user_id, family_id),
        INDEX idx_refresh_tokens_expires (expires_at)
    ) ENGINE=InnoDB DEFAULT CHARSET=utf8mb4
"#;

/// Create the refresh token table when missing
pub async fn ensure_schema(pool: &MySqlPool) -> Result<(), InfrastructureError> {
    tracing::info!("Ensuring refresh_tokens table exists");

    sqlx::query(REFRESH_TOKENS_TABLE)
        .execute(pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create refresh_tokens table: {}", e);
            InfrastructureError::Database(e)
        })?;

    Ok(())
}
