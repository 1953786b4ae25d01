//! In-process hash store used by the test profile and the test suite.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{HashStore, StoreResult, EXPIRY_HASH, STORE_HASH};

// == Memory Store ==
/// Hash store kept entirely in memory.
///
/// Clones share the same underlying data, mirroring several clients talking
/// to one external server.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    hashes: Arc<RwLock<HashMap<String, HashMap<String, String>>>>,
}

impl MemoryStore {
    // == Constructor ==
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HashStore for MemoryStore {
    async fn hget(&self, hash: &str, field: &str) -> StoreResult<Option<String>> {
        let hashes = self.hashes.read().await;
        Ok(hashes.get(hash).and_then(|h| h.get(field)).cloned())
    }

    async fn hset(&self, hash: &str, field: &str, value: &str) -> StoreResult<()> {
        let mut hashes = self.hashes.write().await;
        hashes
            .entry(hash.to_string())
            .or_default()
            .insert(field.to_string(), value.to_string());
        Ok(())
    }

    async fn hdel(&self, hash: &str, field: &str) -> StoreResult<bool> {
        let mut hashes = self.hashes.write().await;
        let Some(fields) = hashes.get_mut(hash) else {
            return Ok(false);
        };
        let removed = fields.remove(field).is_some();
        // Redis drops a hash once its last field goes
        if fields.is_empty() {
            hashes.remove(hash);
        }
        Ok(removed)
    }

    async fn hexists(&self, hash: &str, field: &str) -> StoreResult<bool> {
        let hashes = self.hashes.read().await;
        Ok(hashes.get(hash).is_some_and(|h| h.contains_key(field)))
    }

    async fn hkeys(&self, hash: &str) -> StoreResult<Vec<String>> {
        let hashes = self.hashes.read().await;
        Ok(hashes
            .get(hash)
            .map(|h| h.keys().cloned().collect())
            .unwrap_or_default())
    }

    async fn hgetall(&self, hash: &str) -> StoreResult<Vec<(String, String)>> {
        let hashes = self.hashes.read().await;
        Ok(hashes
            .get(hash)
            .map(|h| h.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default())
    }

    async fn evict_if_expired(&self, key: &str, now: f64) -> StoreResult<bool> {
        // One write guard covers the check and both deletes
        let mut hashes = self.hashes.write().await;
        let expired = hashes
            .get(EXPIRY_HASH)
            .and_then(|ledger| ledger.get(key))
            .and_then(|raw| raw.trim().parse::<f64>().ok())
            .is_some_and(|at| at < now);
        if !expired {
            return Ok(false);
        }

        for hash in [STORE_HASH, EXPIRY_HASH] {
            if let Some(fields) = hashes.get_mut(hash) {
                fields.remove(key);
                if fields.is_empty() {
                    hashes.remove(hash);
                }
            }
        }
        Ok(true)
    }
}
