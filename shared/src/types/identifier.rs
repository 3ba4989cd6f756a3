//! Identifier kind selection

use serde::{Deserialize, Serialize};
use std::fmt;

/// Shape of the user identifiers a deployment accepts
///
/// The user store is external, so the token store has to be told whether
/// user ids are UUIDs or unsigned integers. Anything that does not match the
/// configured kind is rejected as malformed before it reaches storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IdKind {
    /// RFC 4122 UUID in its hyphenated textual form
    Uuid,
    /// Unsigned 64-bit integer
    Numeric,
}

impl IdKind {
    /// Human-readable description used in validation errors
    pub fn describe(&self) -> &'static str {
        match self {
            IdKind::Uuid => "uuid",
            IdKind::Numeric => "unsigned integer",
        }
    }
}

impl Default for IdKind {
    fn default() -> Self {
        IdKind::Uuid
    }
}

impl fmt::Display for IdKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdKind::Uuid => write!(f, "uuid"),
            IdKind::Numeric => write!(f, "numeric"),
        }
    }
}

impl std::str::FromStr for IdKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "uuid" => Ok(IdKind::Uuid),
            "numeric" | "integer" | "int" => Ok(IdKind::Numeric),
            _ => Err(format!("Invalid identifier kind: {}", s)),
        }
    }
}
