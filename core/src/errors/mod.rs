//! Domain error taxonomy for the refresh token store.
//!
//! "Not found" is deliberately absent: unknown tokens, families and users
//! resolve to `false` or a no-op, never to an error.

mod types;

pub use types::ValidationError;

use thiserror::Error;

/// Core domain errors
#[derive(Error, Debug)]
pub enum DomainError {
    /// Malformed identifier or argument, rejected before any storage access
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A record with this token id already exists; retrying with the same id
    /// will conflict again, mint a new one instead
    #[error("Token id already exists: {token_id}")]
    Conflict { token_id: String },

    /// The backing store does not provide this optional capability
    #[error("Operation not supported by this store: {operation}")]
    Unsupported { operation: String },

    /// Transient or permanent storage failure, surfaced unchanged
    #[error("Storage error: {message}")]
    Storage { message: String },
}

impl DomainError {
    /// Build a storage error from any displayable driver error
    pub fn storage(context: &str, err: impl std::fmt::Display) -> Self {
        DomainError::Storage {
            message: format!("{}: {}", context, err),
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, DomainError::Conflict { .. })
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, DomainError::Validation(_))
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self, DomainError::Unsupported { .. })
    }
}

pub type DomainResult<T> = Result<T, DomainError>;
