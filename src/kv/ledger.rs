//! Expiry Ledger Module
//!
//! Tracks the absolute expiration time of every key written with a TTL, in
//! the `expiry_keys` hash. Only the sweeper reads it back.

use std::sync::Arc;

use chrono::Utc;

use crate::store::{HashStore, StoreResult, EXPIRY_HASH};

// == Expiry Record ==
/// Absolute expiry of one key.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpiryRecord {
    /// Key in the primary hash
    pub key: String,
    /// Expiration time in Unix seconds (fractional)
    pub expires_at: f64,
}

impl ExpiryRecord {
    // == Is Expired ==
    /// Returns true once `now` has moved strictly past the expiry time.
    pub fn is_expired_at(&self, now: f64) -> bool {
        self.expires_at < now
    }
}

// == Ledger Listing ==
/// Snapshot of the ledger as returned by [`ExpiryLedger::list_all`].
#[derive(Debug, Default)]
pub struct LedgerListing {
    /// Records with a readable timestamp
    pub records: Vec<ExpiryRecord>,
    /// Keys whose stored timestamp is not a number
    pub malformed: Vec<String>,
}

// == Expiry Ledger ==
/// Handle over the `expiry_keys` hash.
#[derive(Clone)]
pub struct ExpiryLedger {
    store: Arc<dyn HashStore>,
}

impl ExpiryLedger {
    /// Creates a ledger over the given store.
    pub fn new(store: Arc<dyn HashStore>) -> Self {
        Self { store }
    }

    // == Set Expiry ==
    /// Records (or replaces) the expiry time of `key`.
    pub async fn set_expiry(&self, key: &str, expires_at: f64) -> StoreResult<()> {
        self.store
            .hset(EXPIRY_HASH, key, &expires_at.to_string())
            .await
    }

    // == List All ==
    /// Reads every record in the ledger.
    pub async fn list_all(&self) -> StoreResult<LedgerListing> {
        let mut listing = LedgerListing::default();
        for (key, raw) in self.store.hgetall(EXPIRY_HASH).await? {
            match raw.trim().parse::<f64>() {
                Ok(expires_at) if expires_at.is_finite() => {
                    listing.records.push(ExpiryRecord { key, expires_at })
                }
                _ => listing.malformed.push(key),
            }
        }
        Ok(listing)
    }

    // == Clear ==
    /// Drops the record for `key`. Clearing an absent record is a no-op.
    pub async fn clear(&self, key: &str) -> StoreResult<bool> {
        self.store.hdel(EXPIRY_HASH, key).await
    }
}

// == Utility Functions ==
/// Returns the current Unix time in seconds, with microsecond precision.
pub fn now_unix_secs() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn ledger() -> (MemoryStore, ExpiryLedger) {
        let store = MemoryStore::new();
        let ledger = ExpiryLedger::new(Arc::new(store.clone()));
        (store, ledger)
    }

    #[test]
    fn test_expiry_boundary() {
        let record = ExpiryRecord {
            key: "k".to_string(),
            expires_at: 100.0,
        };
        assert!(!record.is_expired_at(99.5));
        assert!(!record.is_expired_at(100.0));
        assert!(record.is_expired_at(100.001));
    }

    #[test]
    fn test_now_is_recent() {
        let now = now_unix_secs();
        // 2020-01-01T00:00:00Z
        assert!(now > 1_577_836_800.0);
    }

    #[tokio::test]
    async fn test_set_and_list() {
        let (_, ledger) = ledger();
        ledger.set_expiry("a", 1_700_000_000.5).await.unwrap();

        let listing = ledger.list_all().await.unwrap();
        assert_eq!(
            listing.records,
            vec![ExpiryRecord {
                key: "a".to_string(),
                expires_at: 1_700_000_000.5
            }]
        );
        assert!(listing.malformed.is_empty());
    }

    #[tokio::test]
    async fn test_set_overwrites() {
        let (_, ledger) = ledger();
        ledger.set_expiry("a", 10.0).await.unwrap();
        ledger.set_expiry("a", 20.0).await.unwrap();

        let listing = ledger.list_all().await.unwrap();
        assert_eq!(listing.records.len(), 1);
        assert_eq!(listing.records[0].expires_at, 20.0);
    }

    #[tokio::test]
    async fn test_reads_foreign_timestamp_format() {
        let (store, ledger) = ledger();
        store
            .hset(EXPIRY_HASH, "a", "1700000030.123456")
            .await
            .unwrap();

        let listing = ledger.list_all().await.unwrap();
        assert_eq!(listing.records[0].expires_at, 1_700_000_030.123456);
    }

    #[tokio::test]
    async fn test_malformed_timestamps_reported() {
        let (store, ledger) = ledger();
        store.hset(EXPIRY_HASH, "bad", "soon").await.unwrap();
        store.hset(EXPIRY_HASH, "nan", "NaN").await.unwrap();
        ledger.set_expiry("good", 5.0).await.unwrap();

        let mut listing = ledger.list_all().await.unwrap();
        listing.malformed.sort();
        assert_eq!(listing.records.len(), 1);
        assert_eq!(listing.malformed, vec!["bad", "nan"]);
    }

    #[tokio::test]
    async fn test_clear_is_idempotent() {
        let (_, ledger) = ledger();
        ledger.set_expiry("a", 10.0).await.unwrap();

        assert!(ledger.clear("a").await.unwrap());
        assert!(!ledger.clear("a").await.unwrap());
        assert!(ledger.list_all().await.unwrap().records.is_empty());
    }
}
