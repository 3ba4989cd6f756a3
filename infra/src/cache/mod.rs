//! Cache module for the Redis-backed refresh token store
//!
//! This module provides the Redis connection wrapper with retrying setup and
//! the `RefreshTokenStore` implementation built on server-side Lua scripts.

pub mod redis_client;
pub mod token_store;


pub use redis_client::RedisClient;
pub use token_store::RedisRefreshTokenStore;

// Re-export commonly used types
pub use rk_shared::config::cache::CacheConfig;
