use std::collections::HashSet;

use crate::contract::{BucketObject, KnownState};

/// Added and removed keys for one tick.
///
/// `added` keeps listing order; `removed` is in key order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyDiff<'a> {
    pub added: Vec<&'a BucketObject>,
    pub removed: Vec<String>,
}

impl KeyDiff<'_> {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

pub fn compute_key_diff<'a>(
    listing: &'a [BucketObject],
    state: &KnownState,
    track_deletions: bool,
) -> KeyDiff<'a> {
    let mut current_keys = HashSet::with_capacity(listing.len());
    let mut added = Vec::new();

    for object in listing {
        // A listing should never repeat a key, but announce at most once if it does.
        if !current_keys.insert(object.key.as_str()) {
            continue;
        }
        if !state.is_known(&object.key) {
            added.push(object);
        }
    }

    let removed = if track_deletions {
        state
            .known_keys
            .iter()
            .filter(|key| !current_keys.contains(key.as_str()))
            .cloned()
            .collect()
    } else {
        Vec::new()
    };

    KeyDiff { added, removed }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use chrono::{TimeZone, Utc};

    use super::*;

    fn object(key: &str) -> BucketObject {
        BucketObject {
            key: key.to_string(),
            size_bytes: 1_024,
            last_modified: Utc
                .with_ymd_and_hms(2025, 3, 1, 12, 0, 0)
                .single()
                .expect("valid timestamp"),
        }
    }

    fn state_with(keys: &[&str]) -> KnownState {
        KnownState {
            known_keys: keys.iter().map(|key| key.to_string()).collect::<BTreeSet<_>>(),
            ..KnownState::default()
        }
    }

    #[test]
    fn added_keys_follow_listing_order() {
        let listing = vec![object("z.zip"), object("a.zip"), object("m.zip")];
        let diff = compute_key_diff(&listing, &state_with(&["a.zip"]), true);

        let added = diff
            .added
            .iter()
            .map(|object| object.key.as_str())
            .collect::<Vec<_>>();
        assert_eq!(added, vec!["z.zip", "m.zip"]);
        assert!(diff.removed.is_empty());
    }

    #[test]
    fn removed_keys_are_reported_only_when_tracked() {
        let listing = vec![object("a.zip")];
        let state = state_with(&["a.zip", "b.zip", "c.zip"]);

        let tracked = compute_key_diff(&listing, &state, true);
        assert_eq!(tracked.removed, vec!["b.zip".to_string(), "c.zip".to_string()]);

        let untracked = compute_key_diff(&listing, &state, false);
        assert!(untracked.is_empty());
    }

    #[test]
    fn unchanged_listing_produces_empty_diff() {
        let listing = vec![object("a.zip"), object("b.zip")];
        let diff = compute_key_diff(&listing, &state_with(&["a.zip", "b.zip"]), true);
        assert!(diff.is_empty());
    }

    #[test]
    fn repeated_listing_key_is_added_once() {
        let listing = vec![object("a.zip"), object("a.zip")];
        let diff = compute_key_diff(&listing, &KnownState::default(), true);
        assert_eq!(diff.added.len(), 1);
    }

    #[test]
    fn empty_listing_removes_everything_known() {
        let diff = compute_key_diff(&[], &state_with(&["a.zip"]), true);
        assert!(diff.added.is_empty());
        assert_eq!(diff.removed, vec!["a.zip".to_string()]);
    }
}
