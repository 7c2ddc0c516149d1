//! S3 and Discord adapters plus the polling runtime for the bucket watcher.
//!
//! This crate owns runtime integration details (storage listing, chat
//! delivery, state files, scheduling) and exposes a single runtime module
//! boundary for the contract, diff, and announcement primitives.

pub mod adapters;
pub mod config;
pub mod handlers;
pub mod logging;
pub mod runtime;
