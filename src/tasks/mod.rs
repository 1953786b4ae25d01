//! Background Tasks Module
//!
//! Contains background tasks that run periodically during server operation.
//!
//! # Tasks
//! - Expiry sweeper: evicts keys whose TTL has elapsed, once per interval

mod sweeper;

pub use sweeper::{spawn_sweeper, SweepReport, Sweeper};
