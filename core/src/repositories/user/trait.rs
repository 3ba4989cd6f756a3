//! User lookup contract consumed by the enclosing authentication service.
//!
//! The token store never calls this trait. It exists so that the service
//! that owns both collaborators can check whether the `user_id` carried by a
//! refresh token still denotes a live account, against the same identifier
//! types the token store uses.

use async_trait::async_trait;

use crate::domain::entities::user::UserAccount;
use crate::domain::value_objects::identifiers::UserId;
use crate::errors::{DomainError, DomainResult};

/// Read-only view of the external user store
///
/// # Example
/// ```no_run
/// # use rk_core::repositories::UserLookup;
/// # use rk_core::domain::UserId;
/// # async fn example(users: &impl UserLookup) -> Result<(), Box<dyn std::error::Error>> {
/// match users.get_user_by_id(&UserId::Numeric(42)).await? {
///     Some(account) if account.is_confirmed => println!("Live account: {}", account.email),
///     Some(_) => println!("Account awaiting confirmation"),
///     None => println!("User no longer exists"),
/// }
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait UserLookup: Send + Sync {
    /// Find a confirmed or unconfirmed user by identifier
    ///
    /// # Returns
    /// * `Ok(Some(UserAccount))` - User found
    /// * `Ok(None)` - No such user
    /// * `Err(DomainError)` - Lookup failed
    async fn get_user_by_id(&self, id: &UserId) -> DomainResult<Option<UserAccount>>;

    /// Whether [`get_new_user_by_id`](Self::get_new_user_by_id) is implemented
    fn supports_invited_lookup(&self) -> bool {
        false
    }

    /// Find a user that was invited but has not confirmed yet
    ///
    /// Confirmed users are not returned by this lookup.
    async fn get_new_user_by_id(&self, id: &UserId) -> DomainResult<Option<UserAccount>> {
        let _ = id;
        Err(DomainError::Unsupported {
            operation: "get_new_user_by_id".to_string(),
        })
    }
}
