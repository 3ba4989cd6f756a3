//! User account as seen by the token store's collaborators.

use serde::{Deserialize, Serialize};

use crate::domain::value_objects::identifiers::UserId;

/// Account projection returned by the external user lookup
///
/// Carries only what the enclosing authentication service needs to decide
/// whether a `user_id` embedded in a refresh token still denotes a live
/// account. Credentials never leave the user store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccount {
    /// Unique identifier for the user
    pub id: UserId,

    /// Login e-mail address
    pub email: String,

    /// Whether the account finished its confirmation step.
    /// Invited users stay unconfirmed until they accept.
    pub is_confirmed: bool,
}

impl UserAccount {
    pub fn new(id: UserId, email: impl Into<String>, is_confirmed: bool) -> Self {
        Self {
            id,
            email: email.into(),
            is_confirmed,
        }
    }

    /// Whether the account is still waiting for confirmation
    pub fn is_pending(&self) -> bool {
        !self.is_confirmed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_account() {
        let invited = UserAccount::new(UserId::Numeric(7), "invited@example.com", false);
        assert!(invited.is_pending());

        let active = UserAccount::new(UserId::Numeric(8), "active@example.com", true);
        assert!(!active.is_pending());
    }

    #[test]
    fn test_serialization_has_no_credentials() {
        let account = UserAccount::new(UserId::Numeric(42), "someone@example.com", true);
        let json = serde_json::to_value(&account).unwrap();
        assert_eq!(json["id"], 42);
        assert!(json.get("password").is_none());
        assert!(json.get("password_hash").is_none());
    }
}
