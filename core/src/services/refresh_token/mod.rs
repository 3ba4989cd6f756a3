//! Refresh token service module
//!
//! This module handles the rotation-chain operations consumed by an
//! authentication service:
//! - Token identifier minting
//! - Saving rotation records and checking their validity
//! - Single-token, family-wide and user-wide invalidation
//! - Background reclamation of long-expired records

mod cleanup;
mod config;
mod secret;
mod service;

#[cfg(test)]
mod tests;

pub use cleanup::{CleanupResult, TokenCleanupConfig, TokenCleanupService};
pub use config::RefreshTokenServiceConfig;
pub use secret::{encode_secret, secret_matches};
pub use service::RefreshTokenService;
