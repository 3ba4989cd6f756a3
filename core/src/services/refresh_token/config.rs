//! Configuration for the refresh token service

use std::time::Duration;

use rk_shared::config::{SecretStorage, TokenStoreConfig};
use rk_shared::types::IdKind;

/// Configuration for the refresh token service
#[derive(Debug, Clone)]
pub struct RefreshTokenServiceConfig {
    /// Accepted shape of raw user identifiers
    pub user_id_kind: IdKind,
    /// How secrets are represented at rest
    pub secret_storage: SecretStorage,
    /// Lifetime used by `save_with_default_ttl`
    pub default_ttl: Duration,
}

impl Default for RefreshTokenServiceConfig {
    fn default() -> Self {
        Self {
            user_id_kind: IdKind::Uuid,
            secret_storage: SecretStorage::Verbatim,
            default_ttl: Duration::from_secs(rk_shared::config::DEFAULT_TTL_SECONDS),
        }
    }
}

impl RefreshTokenServiceConfig {
    /// Configuration accepting numeric user identifiers
    pub fn numeric_users() -> Self {
        Self {
            user_id_kind: IdKind::Numeric,
            ..Self::default()
        }
    }

    pub fn with_secret_storage(mut self, secret_storage: SecretStorage) -> Self {
        self.secret_storage = secret_storage;
        self
    }

    pub fn with_default_ttl(mut self, default_ttl: Duration) -> Self {
        self.default_ttl = default_ttl;
        self
    }
}

impl From<&TokenStoreConfig> for RefreshTokenServiceConfig {
    fn from(config: &TokenStoreConfig) -> Self {
        Self {
            user_id_kind: config.user_id_kind,
            secret_storage: config.secret_storage,
            default_ttl: config.default_ttl(),
        }
    }
}
