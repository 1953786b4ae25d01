//! Expiry Sweeper Task
//!
//! Background task that periodically evicts keys whose TTL has elapsed,
//! removing both the entry in the primary hash and its ledger record.
//!
//! Each tick is a full, independent pass over the ledger. Nothing is carried
//! between ticks, so a pass that fails part-way is simply redone by the next.
//! Ticks run one after another inside a single task and a tick that overruns
//! the interval causes the missed ticks to be skipped, never stacked.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::kv::{now_unix_secs, ExpiryLedger};
use crate::metrics::record_sweep;
use crate::store::{HashStore, StoreResult, EXPIRY_HASH};

// == Sweep Report ==
/// Outcome of one sweep pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    /// Ledger records examined
    pub scanned: usize,
    /// Keys evicted from both hashes
    pub evicted: usize,
    /// Expired in the listing but renewed or removed before eviction
    pub skipped: usize,
    /// Keys whose eviction failed and will be retried next pass
    pub failed: usize,
    /// Ledger records with an unreadable timestamp, dropped from the ledger
    pub malformed: usize,
}

// == Sweeper ==
/// Evicts expired keys from the primary hash and the ledger.
#[derive(Clone)]
pub struct Sweeper {
    store: Arc<dyn HashStore>,
    ledger: ExpiryLedger,
}

impl Sweeper {
    /// Creates a sweeper over the given store.
    pub fn new(store: Arc<dyn HashStore>) -> Self {
        let ledger = ExpiryLedger::new(store.clone());
        Self { store, ledger }
    }

    // == Sweep ==
    /// Runs one pass, evicting every record that expired before `now`.
    ///
    /// The listing only nominates candidates: each one is checked again by
    /// the store at eviction time, so a key renewed by a Put after the
    /// listing keeps its fresh value. Only a failure to read the ledger fails
    /// the pass. A failure evicting one key is logged and counted, and the
    /// pass moves on to the next key.
    ///
    /// # Arguments
    /// * `now` - Current Unix time in seconds
    pub async fn sweep(&self, now: f64) -> StoreResult<SweepReport> {
        let listing = self.ledger.list_all().await?;
        let mut report = SweepReport {
            scanned: listing.records.len() + listing.malformed.len(),
            ..SweepReport::default()
        };

        for record in listing.records.iter().filter(|r| r.is_expired_at(now)) {
            match self.store.evict_if_expired(&record.key, now).await {
                Ok(true) => {
                    report.evicted += 1;
                    info!("Expired key deleted: {}", record.key);
                }
                Ok(false) => {
                    report.skipped += 1;
                    debug!("Expiry record for '{}' changed since listing, kept", record.key);
                }
                Err(err) => {
                    report.failed += 1;
                    warn!("Failed to evict expired key '{}': {}", record.key, err);
                }
            }
        }

        for key in &listing.malformed {
            match self.clear_malformed(key).await {
                Ok(false) => {}
                Ok(true) => {
                    report.malformed += 1;
                    warn!("Dropped unreadable expiry record for key '{}'", key);
                }
                Err(err) => {
                    report.failed += 1;
                    warn!("Failed to drop unreadable expiry record '{}': {}", key, err);
                }
            }
        }

        Ok(report)
    }

    /// Drops the ledger record of `key` if it is still unreadable.
    async fn clear_malformed(&self, key: &str) -> StoreResult<bool> {
        let still_malformed = self
            .store
            .hget(EXPIRY_HASH, key)
            .await?
            .is_some_and(|raw| raw.trim().parse::<f64>().map_or(true, |at| !at.is_finite()));
        if still_malformed {
            self.ledger.clear(key).await?;
        }
        Ok(still_malformed)
    }

    /// Runs one pass at the current time, logging and swallowing failures.
    async fn tick(&self) {
        let started = Instant::now();
        match self.sweep(now_unix_secs()).await {
            Ok(report) => {
                record_sweep(
                    report.evicted as u64,
                    report.failed as u64,
                    started.elapsed().as_secs_f64(),
                );
                if report.evicted > 0 || report.failed > 0 {
                    info!(
                        "Expiry sweep: evicted {} of {} tracked key(s), {} failure(s)",
                        report.evicted, report.scanned, report.failed
                    );
                } else {
                    debug!("Expiry sweep: nothing expired among {} tracked key(s)", report.scanned);
                }
            }
            Err(err) => {
                record_sweep(0, 1, started.elapsed().as_secs_f64());
                warn!("Expiry sweep skipped, store unavailable: {}", err);
            }
        }
    }
}

/// Spawns the background sweeper.
///
/// The first pass runs one `interval` after spawning. The task exits once
/// `true` is sent on `shutdown` or the sender is dropped; a pass already in
/// progress finishes first.
///
/// # Arguments
/// * `store` - Store handle shared with the request handlers
/// * `interval` - Time between the starts of consecutive passes
/// * `shutdown` - Receiver of the shutdown flag
///
/// # Returns
/// A JoinHandle for the spawned task, to be awaited during graceful
/// shutdown.
///
/// # Example
/// ```ignore
/// let (shutdown_tx, shutdown_rx) = watch::channel(false);
/// let handle = spawn_sweeper(store, Duration::from_secs(1), shutdown_rx);
/// // Later, during shutdown:
/// shutdown_tx.send(true)?;
/// handle.await?;
/// ```
pub fn spawn_sweeper(
    store: Arc<dyn HashStore>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    let sweeper = Sweeper::new(store);

    tokio::spawn(async move {
        info!("Starting expiry sweeper with interval of {:?}", interval);

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => sweeper.tick().await,
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!("Expiry sweeper stopped");
    })
}
