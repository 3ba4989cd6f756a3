//! Business services built on top of the store contracts.

pub mod refresh_token;

// Re-export commonly used types
pub use refresh_token::{
    CleanupResult, RefreshTokenService, RefreshTokenServiceConfig, TokenCleanupConfig,
    TokenCleanupService,
};
