//! Store Client Module
//!
//! Capability contract over the external hash-map store, plus the two
//! backends that satisfy it: Redis for real deployments and an in-process
//! map for the test profile.

mod memory;
mod redis_store;

use async_trait::async_trait;
use thiserror::Error;

pub use self::memory::MemoryStore;
pub use self::redis_store::RedisStore;

// == Hash Names ==
/// Primary hash holding every key-value entry.
pub const STORE_HASH: &str = "store";

/// Secondary hash holding the absolute expiry timestamp of TTL'd keys.
pub const EXPIRY_HASH: &str = "expiry_keys";

// == Store Error ==
/// Failures talking to the backing store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The store could not be reached
    #[error("store connection failed: {0}")]
    Connection(String),

    /// The store rejected or failed a command
    #[error("store command failed: {0}")]
    Command(String),
}

/// Convenience Result type for store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

// == Hash Store Trait ==
/// Field-level operations on named hashes.
///
/// Every operation is atomic on its own; no multi-field transactions are
/// offered. Deleting an absent field is a no-op that reports `false`.
#[async_trait]
pub trait HashStore: Send + Sync + 'static {
    /// Returns the value of `field` in `hash`, if present.
    async fn hget(&self, hash: &str, field: &str) -> StoreResult<Option<String>>;

    /// Creates or overwrites `field` in `hash`.
    async fn hset(&self, hash: &str, field: &str, value: &str) -> StoreResult<()>;

    /// Removes `field` from `hash`, returning whether it existed.
    async fn hdel(&self, hash: &str, field: &str) -> StoreResult<bool>;

    /// Returns true if `field` is present in `hash`.
    async fn hexists(&self, hash: &str, field: &str) -> StoreResult<bool>;

    /// Lists every field name in `hash`.
    async fn hkeys(&self, hash: &str) -> StoreResult<Vec<String>>;

    /// Lists every field and value in `hash`.
    async fn hgetall(&self, hash: &str) -> StoreResult<Vec<(String, String)>>;

    /// Evicts `key` from both [`STORE_HASH`] and [`EXPIRY_HASH`] if its
    /// current expiry record is strictly before `now`.
    ///
    /// Returns false when the record is gone, unreadable, or no longer
    /// expired, e.g. after a fresh Put renewed it. Backends that can do the
    /// check and both deletes atomically should override this; the default
    /// re-reads the record right before deleting.
    async fn evict_if_expired(&self, key: &str, now: f64) -> StoreResult<bool> {
        evict_after_reread(self, key, now).await
    }
}

/// Re-reads the expiry record of `key` and, if it is strictly before `now`,
/// deletes the entry and then the record.
///
/// Not atomic: a Put landing between the read and the deletes is lost. It
/// only narrows the window left by acting on an older ledger listing.
pub async fn evict_after_reread<S>(store: &S, key: &str, now: f64) -> StoreResult<bool>
where
    S: HashStore + ?Sized,
{
    let expires_at = store
        .hget(EXPIRY_HASH, key)
        .await?
        .and_then(|raw| raw.trim().parse::<f64>().ok());
    match expires_at {
        Some(at) if at < now => {
            store.hdel(STORE_HASH, key).await?;
            store.hdel(EXPIRY_HASH, key).await?;
            Ok(true)
        }
        _ => Ok(false),
    }
}
