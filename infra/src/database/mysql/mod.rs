//! MySQL implementations of the core store contracts

pub mod token_store_impl;

pub use token_store_impl::MySqlRefreshTokenStore;
