//! Redis implementation of the RefreshTokenStore trait.
//!
//! Layout, relative to the configured key prefix:
//! - `rt:token:{token_id}` - hash with the record fields
//! - `rt:family:{user_id}:{family_id}` - set of token ids in the chain
//! - `rt:user:{user_id}` - set of token ids owned by the user
//! - `rt:expiry` - sorted set of token ids scored by expiry (ms)
//!
//! Record keys carry no TTL. Letting Redis expire them would free the token id
//! as soon as the record expires; instead they stay until the reclamation
//! sweep removes them through the expiry index.
//!
//! Every write is a Lua script so the existence check and the update run as
//! one step on the server. The scripts touch keys derived at run time, which
//! ties this store to a single Redis node (no cluster slot routing).

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::{AsyncCommands, RedisError, Script};
use tracing::{debug, info, warn};

use rk_core::domain::{FamilyId, RefreshTokenRecord, TokenId, UserId};
use rk_core::errors::{DomainError, DomainResult};
use rk_core::repositories::RefreshTokenStore;

use super::redis_client::RedisClient;

/// Records removed per sweep script call
const SWEEP_BATCH_SIZE: usize = 500;

const INSERT_SCRIPT: &str = r#"
if redis.call('EXISTS', KEYS[1]) == 1 then
    return 0
end
redis.call('HSET', KEYS[1],
    'user_id', ARGV[2],
    'family_id', ARGV[3],
    'secret_hash', ARGV[4],
    'created_at', ARGV[5],
    'expires_at', ARGV[6],
    'is_invalidated', '0')
redis.call('SADD', KEYS[2], ARGV[1])
redis.call('SADD', KEYS[3], ARGV[1])
redis.call('ZADD', KEYS[4], ARGV[6], ARGV[1])
return 1
"#;

const INVALIDATE_TOKEN_SCRIPT: &str = r#"
local v = redis.call('HMGET', KEYS[1], 'user_id', 'family_id', 'is_invalidated')
if v[1] == ARGV[1] and v[2] == ARGV[2] and v[3] == '0' then
    redis.call('HSET', KEYS[1], 'is_invalidated', '1')
    return 1
end
return 0
"#;

// ARGV[3] is the family id to match, or '' to match any family of the user
const INVALIDATE_SET_SCRIPT: &str = r#"
local flipped = 0
for _, id in ipairs(redis.call('SMEMBERS', KEYS[1])) do
    local key = ARGV[1] .. id
    local v = redis.call('HMGET', key, 'user_id', 'family_id', 'is_invalidated')
    if v[1] == ARGV[2] and (ARGV[3] == '' or v[2] == ARGV[3]) and v[3] == '0' then
        redis.call('HSET', key, 'is_invalidated', '1')
        flipped = flipped + 1
    end
end
return flipped
"#;

const SWEEP_SCRIPT: &str = r#"
local ids = redis.call('ZRANGEBYSCORE', KEYS[1], '-inf', ARGV[1], 'LIMIT', 0, tonumber(ARGV[5]))
for _, id in ipairs(ids) do
    local key = ARGV[2] .. id
    local v = redis.call('HMGET', key, 'user_id', 'family_id')
    if v[1] then
        redis.call('SREM', ARGV[3] .. v[1] .. ':' .. v[2], id)
        redis.call('SREM', ARGV[4] .. v[1], id)
        redis.call('DEL', key)
    end
    redis.call('ZREM', KEYS[1], id)
end
return #ids
"#;

/// Redis implementation of RefreshTokenStore
pub struct RedisRefreshTokenStore {
    client: RedisClient,
    insert_script: Script,
    invalidate_token_script: Script,
    invalidate_set_script: Script,
    sweep_script: Script,
}

impl RedisRefreshTokenStore {
    /// Create a new Redis token store
    pub fn new(client: RedisClient) -> Self {
        Self {
            client,
            insert_script: Script::new(INSERT_SCRIPT),
            invalidate_token_script: Script::new(INVALIDATE_TOKEN_SCRIPT),
            invalidate_set_script: Script::new(INVALIDATE_SET_SCRIPT),
            sweep_script: Script::new(SWEEP_SCRIPT),
        }
    }

    fn token_key(&self, token_id: &TokenId) -> String {
        self.client.make_key(&format!("rt:token:{}", token_id))
    }

    fn token_key_prefix(&self) -> String {
        self.client.make_key("rt:token:")
    }

    fn family_key(&self, user_id: &UserId, family_id: &FamilyId) -> String {
        self.client
            .make_key(&format!("rt:family:{}:{}", user_id, family_id))
    }

    fn family_key_prefix(&self) -> String {
        self.client.make_key("rt:family:")
    }

    fn user_key(&self, user_id: &UserId) -> String {
        self.client.make_key(&format!("rt:user:{}", user_id))
    }

    fn user_key_prefix(&self) -> String {
        self.client.make_key("rt:user:")
    }

    fn expiry_key(&self) -> String {
        self.client.make_key("rt:expiry")
    }

    /// Fetch and decode every listed record, skipping ids whose hash is gone
    async fn load_records(&self, ids: Vec<String>) -> DomainResult<Vec<RefreshTokenRecord>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut token_ids = Vec::with_capacity(ids.len());
        let mut pipe = redis::pipe();
        for raw in &ids {
            let token_id = TokenId::parse(raw, "token_id")
                .map_err(|e| DomainError::storage("Invalid indexed token id", e))?;
            pipe.hgetall(self.token_key(&token_id));
            token_ids.push(token_id);
        }

        let mut conn = self.client.connection();
        let hashes: Vec<HashMap<String, String>> = pipe
            .query_async(&mut conn)
            .await
            .map_err(|e| redis_failure("Failed to load refresh tokens", e))?;

        token_ids
            .into_iter()
            .zip(hashes)
            .filter(|(_, fields)| !fields.is_empty())
            .map(|(token_id, fields)| record_from_hash(token_id, &fields))
            .collect()
    }

    async fn invalidate_set(
        &self,
        set_key: String,
        user_id: &UserId,
        family_id: Option<&FamilyId>,
    ) -> DomainResult<usize> {
        let mut conn = self.client.connection();
        let family = family_id.map(|id| id.to_string()).unwrap_or_default();

        let flipped: i64 = self
            .invalidate_set_script
            .key(set_key)
            .arg(self.token_key_prefix())
            .arg(user_id.to_string())
            .arg(family)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| redis_failure("Failed to invalidate refresh tokens", e))?;

        Ok(flipped as usize)
    }
}

fn redis_failure(context: &str, err: RedisError) -> DomainError {
    DomainError::storage(context, err)
}

fn field<'a>(fields: &'a HashMap<String, String>, name: &str) -> DomainResult<&'a str> {
    fields
        .get(name)
        .map(String::as_str)
        .ok_or_else(|| DomainError::Storage {
            message: format!("Stored refresh token is missing field {}", name),
        })
}

fn timestamp_field(fields: &HashMap<String, String>, name: &str) -> DomainResult<DateTime<Utc>> {
    let raw = field(fields, name)?;
    raw.parse::<i64>()
        .ok()
        .and_then(DateTime::from_timestamp_millis)
        .ok_or_else(|| DomainError::Storage {
            message: format!("Invalid stored {}: {}", name, raw),
        })
}

/// Decode a record hash
fn record_from_hash(
    token_id: TokenId,
    fields: &HashMap<String, String>,
) -> DomainResult<RefreshTokenRecord> {
    Ok(RefreshTokenRecord {
        token_id,
        family_id: TokenId::parse(field(fields, "family_id")?, "family_id")
            .map_err(|e| DomainError::storage("Invalid stored family_id", e))?,
        user_id: field(fields, "user_id")?
            .parse::<UserId>()
            .map_err(|e| DomainError::storage("Invalid stored user_id", e))?,
        secret_hash: field(fields, "secret_hash")?.to_string(),
        created_at: timestamp_field(fields, "created_at")?,
        expires_at: timestamp_field(fields, "expires_at")?,
        is_invalidated: field(fields, "is_invalidated")? == "1",
    })
}

#[async_trait]
impl RefreshTokenStore for RedisRefreshTokenStore {
    async fn insert(&self, record: RefreshTokenRecord) -> DomainResult<()> {
        let mut conn = self.client.connection();

        let inserted: i64 = self
            .insert_script
            .key(self.token_key(&record.token_id))
            .key(self.family_key(&record.user_id, &record.family_id))
            .key(self.user_key(&record.user_id))
            .key(self.expiry_key())
            .arg(record.token_id.to_string())
            .arg(record.user_id.to_string())
            .arg(record.family_id.to_string())
            .arg(&record.secret_hash)
            .arg(record.created_at.timestamp_millis())
            .arg(record.expires_at.timestamp_millis())
            .invoke_async(&mut conn)
            .await
            .map_err(|e| redis_failure("Failed to save refresh token", e))?;

        if inserted == 0 {
            warn!(token_id = %record.token_id, "Refresh token id already in use");
            return Err(DomainError::Conflict {
                token_id: record.token_id.to_string(),
            });
        }

        debug!(token_id = %record.token_id, "Stored refresh token in Redis");
        Ok(())
    }

    async fn find(&self, token_id: &TokenId) -> DomainResult<Option<RefreshTokenRecord>> {
        let mut conn = self.client.connection();
        let fields: HashMap<String, String> = conn
            .hgetall(self.token_key(token_id))
            .await
            .map_err(|e| redis_failure("Failed to find refresh token", e))?;

        if fields.is_empty() {
            return Ok(None);
        }
        record_from_hash(*token_id, &fields).map(Some)
    }

    async fn invalidate_token(
        &self,
        user_id: &UserId,
        family_id: &FamilyId,
        token_id: &TokenId,
    ) -> DomainResult<usize> {
        let mut conn = self.client.connection();

        let flipped: i64 = self
            .invalidate_token_script
            .key(self.token_key(token_id))
            .arg(user_id.to_string())
            .arg(family_id.to_string())
            .invoke_async(&mut conn)
            .await
            .map_err(|e| redis_failure("Failed to invalidate refresh token", e))?;

        Ok(flipped as usize)
    }

    async fn invalidate_family(
        &self,
        user_id: &UserId,
        family_id: &FamilyId,
    ) -> DomainResult<usize> {
        self.invalidate_set(self.family_key(user_id, family_id), user_id, Some(family_id))
            .await
    }

    fn supports_user_invalidation(&self) -> bool {
        true
    }

    async fn invalidate_user_tokens(&self, user_id: &UserId) -> DomainResult<usize> {
        self.invalidate_set(self.user_key(user_id), user_id, None).await
    }

    async fn find_family(
        &self,
        user_id: &UserId,
        family_id: &FamilyId,
    ) -> DomainResult<Vec<RefreshTokenRecord>> {
        let mut conn = self.client.connection();
        let ids: Vec<String> = conn
            .smembers(self.family_key(user_id, family_id))
            .await
            .map_err(|e| redis_failure("Failed to find refresh token family", e))?;

        let mut members = self.load_records(ids).await?;
        members.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.token_id.cmp(&b.token_id))
        });
        Ok(members)
    }

    async fn find_active_by_user(
        &self,
        user_id: &UserId,
        now: DateTime<Utc>,
    ) -> DomainResult<Vec<RefreshTokenRecord>> {
        let mut conn = self.client.connection();
        let ids: Vec<String> = conn
            .smembers(self.user_key(user_id))
            .await
            .map_err(|e| redis_failure("Failed to find active refresh tokens", e))?;

        Ok(self
            .load_records(ids)
            .await?
            .into_iter()
            .filter(|record| !record.is_invalidated && !record.is_expired_at(now))
            .collect())
    }

    async fn delete_reclaimable(&self, cutoff: DateTime<Utc>) -> DomainResult<usize> {
        let mut conn = self.client.connection();
        let mut deleted = 0;

        loop {
            let batch: i64 = self
                .sweep_script
                .key(self.expiry_key())
                .arg(cutoff.timestamp_millis())
                .arg(self.token_key_prefix())
                .arg(self.family_key_prefix())
                .arg(self.user_key_prefix())
                .arg(SWEEP_BATCH_SIZE)
                .invoke_async(&mut conn)
                .await
                .map_err(|e| redis_failure("Failed to delete expired refresh tokens", e))?;

            deleted += batch as usize;
            if (batch as usize) < SWEEP_BATCH_SIZE {
                break;
            }
        }

        if deleted > 0 {
            info!("Deleted {} reclaimable refresh tokens from Redis", deleted);
        }
        Ok(deleted)
    }
}
