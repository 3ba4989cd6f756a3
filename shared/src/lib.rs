//! Shared utilities and common types for the RotaKey workspace
//!
//! This crate provides functionality used by every other crate:
//! - Configuration types (database, cache, token store, logging)
//! - The identifier kind selector for user identifiers
//! - Tracing subscriber initialisation

pub mod config;
pub mod logging;
pub mod types;

// Re-export commonly used items at crate root
pub use config::{
    AppConfig, CacheConfig, CleanupConfig, ConfigError, DatabaseConfig, Environment,
    LogFormat, LoggingConfig, SecretStorage, StoreBackend, TokenStoreConfig,
};
pub use logging::init_tracing;
pub use types::IdKind;
