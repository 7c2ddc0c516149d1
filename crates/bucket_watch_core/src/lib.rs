//! Shared bucket watch domain primitives.
//!
//! This crate owns deterministic reconciliation behavior and the state and
//! announcement contracts. It intentionally excludes AWS SDK and Discord HTTP
//! concerns, which live in `bucket_watch_bot`.

pub mod announcement;
pub mod clock;
pub mod contract;
pub mod diff;
pub mod download_url;
