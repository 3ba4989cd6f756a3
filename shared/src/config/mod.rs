//! Configuration module with concern-specific sub-modules
//!
//! - `cache` - Redis connection settings for the Redis token store
//! - `database` - MySQL connection and pool settings
//! - `environment` - Environment detection and logging configuration
//! - `token_store` - Backend selection, identifier kind, TTL and sweeper settings

pub mod cache;
pub mod database;
pub mod environment;
pub mod token_store;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use cache::CacheConfig;
pub use database::DatabaseConfig;
pub use environment::{Environment, LogFormat, LoggingConfig};
pub use token_store::{
    CleanupConfig, SecretStorage, StoreBackend, TokenStoreConfig, DEFAULT_TTL_SECONDS,
};

/// Prefix for environment variables read by [`AppConfig::load`]
pub const ENV_PREFIX: &str = "RK";

/// Errors raised while assembling configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration value for {key}: {message}")]
    Invalid { key: String, message: String },
}

/// Complete application configuration combining all sub-configurations
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Environment configuration
    #[serde(default)]
    pub environment: Environment,

    /// MySQL configuration (used by the `mysql` backend)
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Redis configuration (used by the `redis` backend)
    #[serde(default)]
    pub cache: CacheConfig,

    /// Token store configuration
    #[serde(default)]
    pub token_store: TokenStoreConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        let env = Environment::default();
        Self {
            environment: env,
            database: DatabaseConfig::default(),
            cache: CacheConfig::default(),
            token_store: TokenStoreConfig::default(),
            logging: LoggingConfig::for_environment(env),
        }
    }
}

impl AppConfig {
    /// Create configuration for development environment
    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            database: DatabaseConfig::new("mysql://localhost:3306/rotakey_dev").with_auto_migrate(true),
            cache: CacheConfig::default(),
            token_store: TokenStoreConfig::default(),
            logging: LoggingConfig::for_environment(Environment::Development),
        }
    }

    /// Create configuration for production environment
    pub fn production() -> Self {
        Self {
            environment: Environment::Production,
            database: DatabaseConfig::new("mysql://prod-db:3306/rotakey").with_max_connections(50),
            cache: CacheConfig::new("redis://prod-cache:6379").with_prefix("rotakey"),
            token_store: TokenStoreConfig {
                backend: StoreBackend::MySql,
                ..Default::default()
            },
            logging: LoggingConfig::for_environment(Environment::Production),
        }
    }

    /// Load configuration from process environment variables
    ///
    /// A `.env` file is honoured when present. Each section reads its own
    /// variables and falls back to defaults. The result is validated the same
    /// way as [`AppConfig::load`].
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = Environment::from_env();
        let config = Self {
            environment,
            database: DatabaseConfig::from_env(),
            cache: CacheConfig::from_env(),
            token_store: TokenStoreConfig::from_env()?,
            logging: LoggingConfig::from_env(environment),
        };
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file layered with `RK__` environment variables
    ///
    /// The file is optional. Nested keys use a double underscore, e.g.
    /// `RK__TOKEN_STORE__BACKEND=mysql`.
    pub fn load(path: Option<&str>) -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = Environment::from_env();
        let path = path.unwrap_or_else(|| environment.config_file());

        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: AppConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject combinations that cannot work at runtime
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.token_store.default_ttl_seconds == 0 {
            return Err(ConfigError::Invalid {
                key: "token_store.default_ttl_seconds".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        if self.token_store.backend == StoreBackend::MySql && self.database.url.is_empty() {
            return Err(ConfigError::Invalid {
                key: "database.url".to_string(),
                message: "required by the mysql backend".to_string(),
            });
        }
        if self.token_store.backend == StoreBackend::Redis && self.cache.url.is_empty() {
            return Err(ConfigError::Invalid {
                key: "cache.url".to_string(),
                message: "required by the redis backend".to_string(),
            });
        }
        Ok(())
    }
}
