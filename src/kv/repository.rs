//! Key-Value Repository Module
//!
//! CRUD operations over the primary `store` hash, with TTL bookkeeping in
//! the expiry ledger.
//!
//! Reads do not consult the ledger. A key whose TTL has elapsed stays
//! visible until the next sweeper pass evicts it, so the staleness window
//! is at most one sweep interval.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use crate::error::{KvError, Result};
use crate::kv::{now_unix_secs, ExpiryLedger, KeyFilter, KeySelection};
use crate::metrics::record_kv_operation;
use crate::store::{HashStore, STORE_HASH};

// == Key-Value Repository ==
/// Handle over the primary hash and its expiry ledger.
///
/// Holds no locks: every operation is a sequence of field-level store
/// commands, each atomic on its own, so concurrent callers and the sweeper
/// may interleave freely.
#[derive(Clone)]
pub struct KeyValueRepository {
    store: Arc<dyn HashStore>,
    ledger: ExpiryLedger,
}

impl KeyValueRepository {
    // == Constructor ==
    /// Creates a repository over the given store.
    pub fn new(store: Arc<dyn HashStore>) -> Self {
        let ledger = ExpiryLedger::new(store.clone());
        Self { store, ledger }
    }

    /// Returns the underlying store handle.
    pub fn store(&self) -> Arc<dyn HashStore> {
        self.store.clone()
    }

    /// Returns the expiry ledger.
    pub(crate) fn ledger(&self) -> &ExpiryLedger {
        &self.ledger
    }

    // == Get ==
    /// Fetches the value of `key`, or `None` if absent.
    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        record_kv_operation("get");
        Ok(self.store.hget(STORE_HASH, key).await?)
    }

    // == Get All ==
    /// Reads every selected key that passes `filter`.
    ///
    /// Keys that vanish between enumeration and read are skipped. Fails with
    /// [`KvError::NotFound`] unless at least one returned value is non-empty.
    ///
    /// # Arguments
    /// * `selection` - All keys, or one named key
    /// * `filter` - Optional regex applied to candidate key names
    pub async fn get_all(
        &self,
        selection: &KeySelection,
        filter: Option<&KeyFilter>,
    ) -> Result<BTreeMap<String, String>> {
        record_kv_operation("get_all");

        let mut found = BTreeMap::new();
        for key in self.candidates(selection).await? {
            if filter.is_some_and(|f| !f.matches(&key)) {
                continue;
            }
            if let Some(value) = self.store.hget(STORE_HASH, &key).await? {
                found.insert(key, value);
            }
        }

        if found.values().all(|value| value.is_empty()) {
            return Err(KvError::NotFound(describe(selection)));
        }
        Ok(found)
    }

    // == Put ==
    /// Creates or overwrites every entry in the batch.
    ///
    /// With a TTL, each key also gets a ledger record expiring `ttl_secs`
    /// from now. Without one, any earlier record for the key is cleared so
    /// a stale TTL cannot evict the fresh value. The batch is not atomic: a
    /// store failure part-way leaves earlier keys written.
    ///
    /// # Arguments
    /// * `entries` - Key-value pairs to store
    /// * `ttl_secs` - Optional positive TTL in seconds
    pub async fn put(&self, entries: &BTreeMap<String, String>, ttl_secs: Option<u64>) -> Result<()> {
        record_kv_operation("put");

        let expires_at = ttl_secs.map(|ttl| now_unix_secs() + ttl as f64);
        for (key, value) in entries {
            self.store.hset(STORE_HASH, key, value).await?;
            match expires_at {
                Some(at) => self.ledger.set_expiry(key, at).await?,
                None => {
                    self.ledger.clear(key).await?;
                }
            }
        }

        debug!(
            "Stored {} key(s){}",
            entries.len(),
            ttl_secs.map(|t| format!(" with {}s TTL", t)).unwrap_or_default()
        );
        Ok(())
    }

    // == Delete ==
    /// Deletes one key, or every key.
    ///
    /// Deleting a single absent key fails with [`KvError::NotFound`]. Ledger
    /// records are left in place; the sweeper tolerates them. Returns the
    /// number of entries removed.
    pub async fn delete(&self, selection: &KeySelection) -> Result<usize> {
        record_kv_operation("delete");

        match selection {
            KeySelection::One(key) => {
                if self.store.hdel(STORE_HASH, key).await? {
                    debug!("Deleted key '{}'", key);
                    Ok(1)
                } else {
                    Err(KvError::NotFound(key.clone()))
                }
            }
            KeySelection::All => {
                let mut removed = 0;
                for key in self.store.hkeys(STORE_HASH).await? {
                    if self.store.hdel(STORE_HASH, &key).await? {
                        removed += 1;
                    }
                }
                debug!("Bulk delete removed {} key(s)", removed);
                Ok(removed)
            }
        }
    }

    // == Exists ==
    /// Returns true if `key` is present in the primary hash.
    pub async fn exists(&self, key: &str) -> Result<bool> {
        record_kv_operation("exists");
        Ok(self.store.hexists(STORE_HASH, key).await?)
    }

    // == Check Presence ==
    /// Returns true if every selected key exists.
    ///
    /// An empty candidate set reports false.
    pub async fn check_presence(&self, selection: &KeySelection) -> Result<bool> {
        record_kv_operation("check_presence");

        let candidates = self.candidates(selection).await?;
        if candidates.is_empty() {
            return Ok(false);
        }
        for key in &candidates {
            if !self.exists(key).await? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Resolves a selection into candidate key names.
    async fn candidates(&self, selection: &KeySelection) -> Result<Vec<String>> {
        Ok(match selection {
            KeySelection::One(key) => vec![key.clone()],
            KeySelection::All => self.store.hkeys(STORE_HASH).await?,
        })
    }
}

fn describe(selection: &KeySelection) -> String {
    match selection {
        KeySelection::One(key) => key.clone(),
        KeySelection::All => "no matching keys".to_string(),
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, EXPIRY_HASH};

    fn repo() -> (MemoryStore, KeyValueRepository) {
        let store = MemoryStore::new();
        let repo = KeyValueRepository::new(Arc::new(store.clone()));
        (store, repo)
    }

    fn batch(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn test_put_and_get() {
        let (_, repo) = repo();
        repo.put(&batch(&[("batman", "robin")]), None).await.unwrap();

        assert_eq!(repo.get("batman").await.unwrap(), Some("robin".to_string()));
        assert_eq!(repo.get("joker").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let (_, repo) = repo();
        repo.put(&batch(&[("k", "v1")]), None).await.unwrap();
        repo.put(&batch(&[("k", "v2")]), None).await.unwrap();

        assert_eq!(repo.get("k").await.unwrap(), Some("v2".to_string()));
    }

    #[tokio::test]
    async fn test_put_with_ttl_writes_ledger() {
        let (_, repo) = repo();
        let before = now_unix_secs();
        repo.put(&batch(&[("a", "1"), ("b", "2")]), Some(30))
            .await
            .unwrap();

        let listing = repo.ledger().list_all().await.unwrap();
        assert_eq!(listing.records.len(), 2);
        for record in listing.records {
            assert!(record.expires_at >= before + 30.0);
            assert!(record.expires_at <= now_unix_secs() + 30.0);
        }
    }

    #[tokio::test]
    async fn test_put_without_ttl_clears_stale_ledger_record() {
        let (store, repo) = repo();
        repo.put(&batch(&[("k", "v")]), Some(30)).await.unwrap();
        repo.put(&batch(&[("k", "v2")]), None).await.unwrap();

        assert!(!store.hexists(EXPIRY_HASH, "k").await.unwrap());
    }

    #[tokio::test]
    async fn test_get_does_not_check_expiry() {
        let (_, repo) = repo();
        repo.put(&batch(&[("k", "v")]), None).await.unwrap();
        repo.ledger().set_expiry("k", 0.0).await.unwrap();

        // Eviction is the sweeper's job
        assert_eq!(repo.get("k").await.unwrap(), Some("v".to_string()));
        assert!(repo.exists("k").await.unwrap());
    }

    #[tokio::test]
    async fn test_get_all_with_filter() {
        let (_, repo) = repo();
        repo.put(&batch(&[("batman", "robin"), ("joker", "batman")]), None)
            .await
            .unwrap();

        let filter = KeyFilter::parse("bat*").unwrap();
        let found = repo.get_all(&KeySelection::All, Some(&filter)).await.unwrap();
        assert_eq!(found, batch(&[("batman", "robin")]));

        let all = repo.get_all(&KeySelection::All, None).await.unwrap();
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_get_all_single_key() {
        let (_, repo) = repo();
        repo.put(&batch(&[("batman", "robin"), ("joker", "batman")]), None)
            .await
            .unwrap();

        let found = repo
            .get_all(&KeySelection::One("batman".to_string()), None)
            .await
            .unwrap();
        assert_eq!(found, batch(&[("batman", "robin")]));
    }

    #[tokio::test]
    async fn test_get_all_not_found_cases() {
        let (_, repo) = repo();
        assert!(matches!(
            repo.get_all(&KeySelection::All, None).await,
            Err(KvError::NotFound(_))
        ));
        assert!(matches!(
            repo.get_all(&KeySelection::One("blah".to_string()), None).await,
            Err(KvError::NotFound(_))
        ));

        repo.put(&batch(&[("empty", "")]), None).await.unwrap();
        assert!(matches!(
            repo.get_all(&KeySelection::All, None).await,
            Err(KvError::NotFound(_))
        ));

        repo.put(&batch(&[("joker", "batman")]), None).await.unwrap();
        let filter = KeyFilter::parse("bat").unwrap();
        assert!(matches!(
            repo.get_all(&KeySelection::All, Some(&filter)).await,
            Err(KvError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_one() {
        let (_, repo) = repo();
        repo.put(&batch(&[("k", "v")]), None).await.unwrap();

        assert_eq!(repo.delete(&KeySelection::One("k".to_string())).await.unwrap(), 1);
        assert_eq!(repo.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_delete_absent_is_not_found_every_time() {
        let (_, repo) = repo();
        let key = KeySelection::One("robin".to_string());

        assert!(matches!(repo.delete(&key).await, Err(KvError::NotFound(_))));
        assert!(matches!(repo.delete(&key).await, Err(KvError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_leaves_ledger_record() {
        let (store, repo) = repo();
        repo.put(&batch(&[("k", "v")]), Some(60)).await.unwrap();
        repo.delete(&KeySelection::One("k".to_string())).await.unwrap();

        assert!(store.hexists(EXPIRY_HASH, "k").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_all() {
        let (_, repo) = repo();
        repo.put(&batch(&[("a", "1"), ("b", "2"), ("c", "3")]), None)
            .await
            .unwrap();

        assert_eq!(repo.delete(&KeySelection::All).await.unwrap(), 3);
        for key in ["a", "b", "c"] {
            assert!(!repo.exists(key).await.unwrap());
        }
        // Clearing an empty store is fine
        assert_eq!(repo.delete(&KeySelection::All).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_check_presence() {
        let (_, repo) = repo();
        assert!(!repo.check_presence(&KeySelection::All).await.unwrap());

        repo.put(&batch(&[("batman", "robin")]), None).await.unwrap();
        assert!(repo.check_presence(&KeySelection::All).await.unwrap());
        assert!(repo
            .check_presence(&KeySelection::One("batman".to_string()))
            .await
            .unwrap());
        assert!(!repo
            .check_presence(&KeySelection::One("robin".to_string()))
            .await
            .unwrap());
    }

    #[test]
    fn test_check_presence_records_operation() {
        let recorder = metrics_exporter_prometheus::PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        let (_, repo) = repo();

        ::metrics::with_local_recorder(&recorder, || {
            tokio_test::block_on(async {
                repo.put(&batch(&[("batman", "robin")]), None).await.unwrap();
                assert!(repo.check_presence(&KeySelection::All).await.unwrap());
            })
        });

        let rendered = handle.render();
        assert!(rendered.contains(r#"kv_operations_total{operation="check_presence"} 1"#));
        assert!(rendered.contains(r#"kv_operations_total{operation="put"} 1"#));
    }
}
