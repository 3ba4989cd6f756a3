//! Token store configuration module

use serde::{Deserialize, Serialize};
use std::env;

use super::ConfigError;
use crate::types::IdKind;

/// Default refresh token lifetime (14 days)
pub const DEFAULT_TTL_SECONDS: u64 = 14 * 24 * 60 * 60;

/// Storage engine backing the refresh token store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Process-local store, lost on restart
    Memory,
    /// MySQL table with a primary key on the token id
    #[serde(rename = "mysql")]
    MySql,
    /// Redis hashes with family and user index sets
    Redis,
}

impl Default for StoreBackend {
    fn default() -> Self {
        StoreBackend::Memory
    }
}

impl std::str::FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" | "in-memory" => Ok(StoreBackend::Memory),
            "mysql" => Ok(StoreBackend::MySql),
            "redis" => Ok(StoreBackend::Redis),
            _ => Err(format!("Invalid store backend: {}", s)),
        }
    }
}

/// How the presented token secret is represented at rest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SecretStorage {
    /// Store exactly what the caller supplies
    Verbatim,
    /// Store the hex-encoded SHA-256 digest of the supplied secret
    Sha256,
}

impl Default for SecretStorage {
    fn default() -> Self {
        SecretStorage::Verbatim
    }
}

/// Reclamation sweep settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CleanupConfig {
    /// Whether the background sweep runs at all
    pub enabled: bool,

    /// Seconds between sweeps
    pub interval_seconds: u64,

    /// Seconds a record is retained past its expiry before deletion
    pub grace_period_seconds: u64,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_seconds: 3600,
            grace_period_seconds: 7 * 24 * 60 * 60,
        }
    }
}

/// Refresh token store configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TokenStoreConfig {
    /// Storage backend
    #[serde(default)]
    pub backend: StoreBackend,

    /// Accepted shape of user identifiers
    #[serde(default)]
    pub user_id_kind: IdKind,

    /// Lifetime applied by `save_with_default_ttl`
    #[serde(default = "default_ttl_seconds")]
    pub default_ttl_seconds: u64,

    /// Representation of secrets at rest
    #[serde(default)]
    pub secret_storage: SecretStorage,

    /// Background sweep settings
    #[serde(default)]
    pub cleanup: CleanupConfig,
}

impl Default for TokenStoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            user_id_kind: IdKind::default(),
            default_ttl_seconds: DEFAULT_TTL_SECONDS,
            secret_storage: SecretStorage::default(),
            cleanup: CleanupConfig::default(),
        }
    }
}

impl TokenStoreConfig {
    /// Create from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(backend) = env::var("TOKEN_STORE_BACKEND") {
            config.backend = backend.parse().map_err(|message| ConfigError::Invalid {
                key: "TOKEN_STORE_BACKEND".to_string(),
                message,
            })?;
        }
        if let Ok(kind) = env::var("TOKEN_STORE_USER_ID_KIND") {
            config.user_id_kind = kind.parse().map_err(|message| ConfigError::Invalid {
                key: "TOKEN_STORE_USER_ID_KIND".to_string(),
                message,
            })?;
        }
        if let Ok(ttl) = env::var("TOKEN_STORE_DEFAULT_TTL_SECONDS") {
            config.default_ttl_seconds = ttl.parse().map_err(|_| ConfigError::Invalid {
                key: "TOKEN_STORE_DEFAULT_TTL_SECONDS".to_string(),
                message: format!("not a number of seconds: {}", ttl),
            })?;
        }
        if let Ok(hash) = env::var("TOKEN_STORE_HASH_SECRETS") {
            if hash == "1" || hash.eq_ignore_ascii_case("true") {
                config.secret_storage = SecretStorage::Sha256;
            }
        }
        if let Ok(enabled) = env::var("TOKEN_CLEANUP_ENABLED") {
            config.cleanup.enabled = !(enabled == "0" || enabled.eq_ignore_ascii_case("false"));
        }

        Ok(config)
    }

    /// Default lifetime as a std duration
    pub fn default_ttl(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.default_ttl_seconds)
    }
}

fn default_ttl_seconds() -> u64 {
    DEFAULT_TTL_SECONDS
}
