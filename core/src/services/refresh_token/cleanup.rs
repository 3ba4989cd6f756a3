//! Reclamation sweep for expired refresh token records
//!
//! Validity never depends on this sweep: expiry is evaluated at read time.
//! The sweep only bounds storage growth. Records are kept for a grace period
//! past expiry so their ids stay reserved while a client might still present
//! them.

use std::sync::Arc;

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use rk_shared::config::CleanupConfig;

use crate::errors::{DomainError, ValidationError};
use crate::repositories::RefreshTokenStore;

/// Configuration for the token cleanup service
#[derive(Debug, Clone)]
pub struct TokenCleanupConfig {
    /// How often to run cleanup (in seconds)
    pub interval_seconds: u64,
    /// Retention after expiry before deletion (in seconds)
    pub grace_period_seconds: u64,
    /// Whether to enable automatic cleanup
    pub enabled: bool,
}

impl Default for TokenCleanupConfig {
    fn default() -> Self {
        Self {
            interval_seconds: 3600,                 // Run every hour
            grace_period_seconds: 7 * 24 * 60 * 60, // Keep expired records for 7 days
            enabled: true,
        }
    }
}

impl From<&CleanupConfig> for TokenCleanupConfig {
    fn from(config: &CleanupConfig) -> Self {
        Self {
            interval_seconds: config.interval_seconds,
            grace_period_seconds: config.grace_period_seconds,
            enabled: config.enabled,
        }
    }
}

/// Service deleting records that expired more than a grace period ago
pub struct TokenCleanupService<S: RefreshTokenStore + ?Sized + 'static> {
    store: Arc<S>,
    config: TokenCleanupConfig,
}

impl<S: RefreshTokenStore + ?Sized + 'static> TokenCleanupService<S> {
    /// Create a new token cleanup service
    pub fn new(store: Arc<S>, config: TokenCleanupConfig) -> Self {
        Self { store, config }
    }

    /// Run a single cleanup cycle
    ///
    /// # Returns
    /// * `Ok(CleanupResult)` - Summary of the cycle; store failures are
    ///   collected in `errors` rather than aborting
    /// * `Err(DomainError)` - The grace period cannot be represented
    pub async fn run_cleanup(&self) -> Result<CleanupResult, DomainError> {
        if !self.config.enabled {
            return Ok(CleanupResult::default());
        }

        let cutoff = i64::try_from(self.config.grace_period_seconds)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .and_then(|grace| Utc::now().checked_sub_signed(grace))
            .ok_or_else(|| ValidationError::OutOfRange {
                field: "grace_period_seconds".to_string(),
                max: "representable timestamp".to_string(),
            })?;

        info!(cutoff = %cutoff, "Starting refresh token cleanup cycle");

        let mut result = CleanupResult::default();

        match self.store.delete_reclaimable(cutoff).await {
            Ok(count) => {
                result.records_deleted = count;
                info!("Deleted {} reclaimable refresh tokens", count);
            }
            Err(e) => {
                error!("Failed to cleanup expired tokens: {}", e);
                result.errors.push(format!("Token cleanup error: {}", e));
            }
        }

        Ok(result)
    }

    /// Start the cleanup service as a background task
    ///
    /// Returns `None` when cleanup is disabled; otherwise the handle of the
    /// spawned loop, which runs until aborted.
    pub fn start_background_task(self: Arc<Self>) -> Option<JoinHandle<()>> {
        if !self.config.enabled {
            warn!("Token cleanup service is disabled");
            return None;
        }

        let interval = std::time::Duration::from_secs(self.config.interval_seconds.max(1));

        Some(tokio::spawn(async move {
            info!(
                "Token cleanup service started - will run every {} seconds",
                self.config.interval_seconds
            );

            let mut interval_timer = tokio::time::interval(interval);

            loop {
                interval_timer.tick().await;

                match self.run_cleanup().await {
                    Ok(result) => {
                        if !result.errors.is_empty() {
                            warn!("Cleanup completed with errors: {:?}", result.errors);
                        }
                    }
                    Err(e) => {
                        error!("Token cleanup cycle failed: {}", e);
                    }
                }
            }
        }))
    }
}

/// Result of a cleanup operation
#[derive(Debug, Default)]
pub struct CleanupResult {
    /// Number of records physically deleted
    pub records_deleted: usize,
    /// Any errors encountered during cleanup
    pub errors: Vec<String>,
}

impl CleanupResult {
    /// Check if the cleanup was successful (no errors)
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}
