//! Validation error types for caller-supplied input
//!
//! A validation failure means the caller broke the protocol (sent something
//! that cannot be an identifier at all). It is never used for "no such token".

use thiserror::Error;

/// Input validation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Field required: {field}")]
    RequiredField { field: String },

    #[error("Invalid format for field: {field} (expected {expected})")]
    InvalidFormat { field: String, expected: String },

    #[error("Value out of range for field: {field} (max: {max})")]
    OutOfRange { field: String, max: String },
}

impl ValidationError {
    /// Name of the offending field
    pub fn field(&self) -> &str {
        match self {
            ValidationError::RequiredField { field }
            | ValidationError::InvalidFormat { field, .. }
            | ValidationError::OutOfRange { field, .. } => field,
        }
    }
}
