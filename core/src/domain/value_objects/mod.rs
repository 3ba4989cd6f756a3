//! Value objects representing immutable domain concepts.

pub mod identifiers;

// Re-export commonly used types
pub use identifiers::{FamilyId, TokenId, UserId};
