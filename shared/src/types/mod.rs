//! Type definitions shared across crates

pub mod identifier;

pub use identifier::IdKind;
