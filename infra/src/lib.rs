//! # Infrastructure Layer
//!
//! This crate implements the durable refresh token stores for RotaKey.
//! It provides concrete implementations of `rk_core`'s store contract on top
//! of MySQL and Redis, and a factory selecting one from configuration.
//!
//! ## Architecture
//!
//! The infrastructure layer contains:
//! - **Database**: MySQL connection pool, schema bootstrap and token store using SQLx
//! - **Cache**: Redis client and token store using server-side Lua scripts
//!
//! ## Features
//!
//! - `mysql`: Enable the MySQL token store (default)
//! - `redis-cache`: Enable the Redis token store (default)

use std::sync::Arc;

use rk_core::repositories::{InMemoryTokenStore, RefreshTokenStore};
use rk_shared::config::{AppConfig, StoreBackend};

// Re-export core types for convenience
pub use rk_core::errors::*;

/// Database module - MySQL implementations using SQLx
#[cfg(feature = "mysql")]
pub mod database;

/// Cache module - Redis client and token store
#[cfg(feature = "redis-cache")]
pub mod cache;

/// Configuration types used by the infrastructure layer
pub mod config {
    pub use rk_shared::config::{AppConfig, CacheConfig, DatabaseConfig, TokenStoreConfig};
}

/// Build the refresh token store selected by `config.token_store.backend`
///
/// For MySQL the schema is created first when `database.auto_migrate` is set.
pub async fn connect_token_store(
    config: &AppConfig,
) -> Result<Arc<dyn RefreshTokenStore>, InfrastructureError> {
    let backend = config.token_store.backend;
    tracing::info!("Connecting refresh token store (backend: {:?})", backend);

    match backend {
        StoreBackend::Memory => Ok(Arc::new(InMemoryTokenStore::new())),
        StoreBackend::MySql => connect_mysql(config).await,
        StoreBackend::Redis => connect_redis(config).await,
    }
}

#[cfg(feature = "mysql")]
async fn connect_mysql(config: &AppConfig) -> Result<Arc<dyn RefreshTokenStore>, InfrastructureError> {
    let pool = database::DatabasePool::new(config.database.clone()).await?;
    if config.database.auto_migrate {
        database::schema::ensure_schema(pool.get_pool()).await?;
    }
    Ok(Arc::new(database::MySqlRefreshTokenStore::new(
        pool.get_pool().clone(),
    )))
}

#[cfg(not(feature = "mysql"))]
async fn connect_mysql(_config: &AppConfig) -> Result<Arc<dyn RefreshTokenStore>, InfrastructureError> {
    Err(InfrastructureError::Config(
        "MySQL token store requested but the `mysql` feature is disabled".to_string(),
    ))
}

#[cfg(feature = "redis-cache")]
async fn connect_redis(config: &AppConfig) -> Result<Arc<dyn RefreshTokenStore>, InfrastructureError> {
    let client = cache::RedisClient::new(config.cache.clone()).await?;
    Ok(Arc::new(cache::RedisRefreshTokenStore::new(client)))
}

#[cfg(not(feature = "redis-cache"))]
async fn connect_redis(_config: &AppConfig) -> Result<Arc<dyn RefreshTokenStore>, InfrastructureError> {
    Err(InfrastructureError::Config(
        "Redis token store requested but the `redis-cache` feature is disabled".to_string(),
    ))
}

/// Load application configuration from the environment
///
/// Reads a `.env` file first when one is present.
pub fn load_config() -> Result<AppConfig, InfrastructureError> {
    dotenvy::dotenv().ok(); // Load .env file if present

    AppConfig::from_env().map_err(|e| InfrastructureError::Config(e.to_string()))
}

/// Infrastructure-specific error types
#[derive(Debug, thiserror::Error)]
pub enum InfrastructureError {
    /// Database connection error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Redis connection error
    #[error("Cache error: {0}")]
    Cache(#[from] redis::RedisError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_backend_needs_no_server() {
        let config = AppConfig::default();
        let store = connect_token_store(&config).await.unwrap();
        assert!(store.supports_user_invalidation());
    }

    #[tokio::test]
    async fn test_mysql_backend_with_bad_url_fails() {
        let mut config = AppConfig::default();
        config.token_store.backend = StoreBackend::MySql;
        config.database.url = "invalid://url".to_string();

        let result = connect_token_store(&config).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_redis_backend_with_bad_url_fails() {
        let mut config = AppConfig::default();
        config.token_store.backend = StoreBackend::Redis;
        config.cache.url = "not a redis url".to_string();

        let result = connect_token_store(&config).await;
        assert!(matches!(result, Err(InfrastructureError::Config(_))));
    }
}
