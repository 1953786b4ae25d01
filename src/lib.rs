//! Redis KV Store - An HTTP key-value store over Redis hashes
//!
//! Entries live in the `store` hash; keys written with a TTL also get an
//! absolute expiry in the `expiry_keys` hash, which a background sweeper
//! scans once per interval to evict whatever has expired.

pub mod api;
pub mod config;
pub mod error;
pub mod kv;
pub mod metrics;
pub mod models;
pub mod store;
pub mod tasks;

pub use api::AppState;
pub use config::{Config, Profile};
pub use tasks::spawn_sweeper;
