//! Key-Value Module
//!
//! Repository over the primary hash, the expiry ledger that tracks TTLs,
//! and the key selection/filter types shared by both.

mod filter;
mod ledger;
mod repository;


// Re-export public types
pub use filter::{KeyFilter, KeySelection};
pub use ledger::{now_unix_secs, ExpiryLedger, ExpiryRecord, LedgerListing};
pub use repository::KeyValueRepository;
