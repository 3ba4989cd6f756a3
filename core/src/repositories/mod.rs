pub mod token;
pub mod user;

pub use token::{InMemoryTokenStore, RefreshTokenStore};
pub use user::UserLookup;

#[cfg(test)]
pub use token::MockTokenStore;
#[cfg(test)]
pub use user::MockUserLookup;
