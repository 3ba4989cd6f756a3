//! Identifier value objects for refresh token records.
//!
//! Token identifiers double as family identifiers (a family is named after its
//! root token), and both end up embedded in bearer tokens handed to clients,
//! so they are minted from the operating system CSPRNG.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use rk_shared::types::IdKind;

use crate::errors::ValidationError;

/// Globally unique refresh token identifier (UUID v4)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenId(Uuid);

/// A family is identified by the token id of its root record.
pub type FamilyId = TokenId;

impl TokenId {
    /// Mint a new identifier
    ///
    /// Draws 122 random bits from the OS entropy source. No lock, counter or
    /// clock is involved, so concurrent callers never contend.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a caller-supplied identifier
    ///
    /// `field` names the argument in the resulting validation error.
    pub fn parse(raw: &str, field: &str) -> Result<Self, ValidationError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(ValidationError::RequiredField {
                field: field.to_string(),
            });
        }
        Uuid::parse_str(raw)
            .map(Self)
            .map_err(|_| ValidationError::InvalidFormat {
                field: field.to_string(),
                expected: IdKind::Uuid.describe().to_string(),
            })
    }

    /// Underlying UUID
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl From<Uuid> for TokenId {
    fn from(value: Uuid) -> Self {
        Self(value)
    }
}

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for TokenId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s, "token_id")
    }
}

/// Identifier of the (external) user owning a token record
///
/// The user store decides the shape; the token store only needs equality,
/// hashing and a stable textual form for persistence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserId {
    Numeric(u64),
    Uuid(Uuid),
}

impl UserId {
    /// Parse a raw user identifier according to the configured kind
    pub fn parse(raw: &str, kind: IdKind) -> Result<Self, ValidationError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(ValidationError::RequiredField {
                field: "user_id".to_string(),
            });
        }

        let parsed = match kind {
            IdKind::Uuid => Uuid::parse_str(raw).ok().map(UserId::Uuid),
            IdKind::Numeric => raw
                .parse::<u64>()
                .ok()
                .filter(|_| raw.bytes().all(|b| b.is_ascii_digit()))
                .map(UserId::Numeric),
        };

        parsed.ok_or_else(|| ValidationError::InvalidFormat {
            field: "user_id".to_string(),
            expected: kind.describe().to_string(),
        })
    }

    /// Kind of this identifier
    pub fn kind(&self) -> IdKind {
        match self {
            UserId::Numeric(_) => IdKind::Numeric,
            UserId::Uuid(_) => IdKind::Uuid,
        }
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserId::Numeric(n) => write!(f, "{}", n),
            UserId::Uuid(u) => write!(f, "{}", u.hyphenated()),
        }
    }
}

/// Recover a persisted user id without knowing the configured kind
///
/// Used by storage adapters reading back their own writes: a pure digit
/// string is numeric, anything else must be a UUID.
impl FromStr for UserId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
            Self::parse(s, IdKind::Numeric)
        } else {
            Self::parse(s, IdKind::Uuid)
        }
    }
}

impl From<u64> for UserId {
    fn from(value: u64) -> Self {
        UserId::Numeric(value)
    }
}

impl From<Uuid> for UserId {
    fn from(value: Uuid) -> Self {
        UserId::Uuid(value)
    }
}
