//! Redis-backed hash store.

use std::collections::HashMap;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, RedisError, Script};
use tracing::info;

use super::{HashStore, StoreError, StoreResult, EXPIRY_HASH, STORE_HASH};

impl From<RedisError> for StoreError {
    fn from(err: RedisError) -> Self {
        if err.is_io_error()
            || err.is_connection_refusal()
            || err.is_connection_dropped()
            || err.is_timeout()
        {
            StoreError::Connection(err.to_string())
        } else {
            StoreError::Command(err.to_string())
        }
    }
}

/// Checks one ledger record and evicts the key if it is still expired.
///
/// KEYS[1] primary hash, KEYS[2] ledger hash, ARGV[1] key, ARGV[2] now.
/// Returns 1 when the key was evicted, 0 otherwise.
const EVICT_IF_EXPIRED_LUA: &str = r"
local raw = redis.call('HGET', KEYS[2], ARGV[1])
if not raw then
    return 0
end
local expires_at = tonumber(raw)
if expires_at == nil or expires_at >= tonumber(ARGV[2]) then
    return 0
end
redis.call('HDEL', KEYS[1], ARGV[1])
redis.call('HDEL', KEYS[2], ARGV[1])
return 1
";

// == Redis Store ==
/// Hash store talking to a Redis server.
///
/// Wraps a [`ConnectionManager`], which multiplexes commands over one
/// connection and reconnects on its own after transient failures. Cloning
/// is cheap and shares the connection.
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
    evict_script: Script,
}

impl RedisStore {
    // == Connect ==
    /// Opens a connection to `url` and verifies it with `PING`.
    ///
    /// # Arguments
    /// * `url` - Redis connection string, e.g. `redis://localhost:6379/0`
    pub async fn connect(url: &str) -> StoreResult<Self> {
        let client = Client::open(url).map_err(|e| StoreError::Connection(e.to_string()))?;
        let mut conn = ConnectionManager::new(client).await?;

        let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
        info!("Connected to Redis ({})", pong);

        Ok(Self {
            conn,
            evict_script: Script::new(EVICT_IF_EXPIRED_LUA),
        })
    }
}

#[async_trait]
impl HashStore for RedisStore {
    async fn hget(&self, hash: &str, field: &str) -> StoreResult<Option<String>> {
        let mut conn = self.conn.clone();
        Ok(conn.hget(hash, field).await?)
    }

    async fn hset(&self, hash: &str, field: &str, value: &str) -> StoreResult<()> {
        let mut conn = self.conn.clone();
        let _: () = conn.hset(hash, field, value).await?;
        Ok(())
    }

    async fn hdel(&self, hash: &str, field: &str) -> StoreResult<bool> {
        let mut conn = self.conn.clone();
        let removed: i64 = conn.hdel(hash, field).await?;
        Ok(removed > 0)
    }

    async fn hexists(&self, hash: &str, field: &str) -> StoreResult<bool> {
        let mut conn = self.conn.clone();
        Ok(conn.hexists(hash, field).await?)
    }

    async fn hkeys(&self, hash: &str) -> StoreResult<Vec<String>> {
        let mut conn = self.conn.clone();
        Ok(conn.hkeys(hash).await?)
    }

    async fn hgetall(&self, hash: &str) -> StoreResult<Vec<(String, String)>> {
        let mut conn = self.conn.clone();
        let all: HashMap<String, String> = conn.hgetall(hash).await?;
        Ok(all.into_iter().collect())
    }

    async fn evict_if_expired(&self, key: &str, now: f64) -> StoreResult<bool> {
        let mut conn = self.conn.clone();
        // Scripts run atomically, so a concurrent Put cannot slip in
        let evicted: i64 = self
            .evict_script
            .key(STORE_HASH)
            .key(EXPIRY_HASH)
            .arg(key)
            .arg(now)
            .invoke_async(&mut conn)
            .await?;
        Ok(evicted == 1)
    }
}
