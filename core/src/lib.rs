//! # RotaKey Core
//!
//! Domain layer for rotating refresh tokens.
//! This crate contains the token record entity, identifier value objects,
//! the store contract with an in-memory implementation, the refresh token
//! facade and sweeper, and the error types shared by every backend.

pub mod domain;
pub mod errors;
pub mod repositories;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::*;
pub use errors::*;
pub use repositories::*;
pub use services::*;
