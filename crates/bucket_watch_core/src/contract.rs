use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_KNOWN_KEYS_FILE: &str = "known_files.json";
pub const DEFAULT_NOTIFICATION_IDS_FILE: &str = "message_ids.json";

/// One entry of a bucket listing. Sourced fresh every tick, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BucketObject {
    pub key: String,
    pub size_bytes: u64,
    pub last_modified: DateTime<Utc>,
}

/// Opaque handle for a chat message, used to retract it later.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationId(String);

impl NotificationId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Durable reconciliation state owned by the poller.
///
/// `notification_ids` only ever holds keys that are also in `known_keys`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KnownState {
    pub known_keys: BTreeSet<String>,
    pub notification_ids: BTreeMap<String, NotificationId>,
}

impl KnownState {
    pub fn is_known(&self, key: &str) -> bool {
        self.known_keys.contains(key)
    }

    pub fn record_announced(&mut self, key: &str, notification_id: Option<NotificationId>) {
        self.known_keys.insert(key.to_string());
        match notification_id {
            Some(id) => {
                self.notification_ids.insert(key.to_string(), id);
            }
            None => {
                self.notification_ids.remove(key);
            }
        }
    }

    /// Drops the key and hands back the id of the message announcing it, if any.
    pub fn forget(&mut self, key: &str) -> Option<NotificationId> {
        self.known_keys.remove(key);
        self.notification_ids.remove(key)
    }

    /// Removes ids whose key is no longer known. Returns how many were dropped.
    pub fn prune_orphaned_ids(&mut self) -> usize {
        let before = self.notification_ids.len();
        let known_keys = &self.known_keys;
        self.notification_ids.retain(|key, _| known_keys.contains(key));
        before - self.notification_ids.len()
    }
}
