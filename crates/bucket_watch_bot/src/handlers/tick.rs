use crate::adapters::bucket_listing::{BucketLister, ListingError};
use crate::adapters::notifier::{Notifier, RetractError, RetractOutcome, SendError};
use crate::runtime::announcement::build_announcement;
use crate::runtime::clock::Clock;
use crate::runtime::contract::KnownState;
use crate::runtime::diff::compute_key_diff;
use crate::runtime::download_url::DownloadUrlBuilder;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickConfig {
    pub download_urls: DownloadUrlBuilder,
    pub track_deletions: bool,
}

/// What one tick changed. Keys appear in the order they were handled.
///
/// Keys in `send_failures` stay unknown and are announced again next tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub announced: Vec<String>,
    pub removed: Vec<String>,
    pub send_failures: Vec<SendError>,
    pub retraction_failures: Vec<RetractError>,
}

impl TickReport {
    pub fn changed_state(&self) -> bool {
        !self.announced.is_empty() || !self.removed.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Nothing was fetched, so nothing changed.
    ListingFailed(ListingError),
    Completed(TickReport),
}

impl TickOutcome {
    pub fn report(&self) -> Option<&TickReport> {
        match self {
            Self::ListingFailed(_) => None,
            Self::Completed(report) => Some(report),
        }
    }

    pub fn changed_state(&self) -> bool {
        self.report().is_some_and(TickReport::changed_state)
    }
}

/// One reconciliation pass: fetch, announce new keys, retract vanished ones.
///
/// `state` is only mutated for keys whose step completed. A failed send skips
/// that key only, so one undeliverable key never holds back the others.
/// Persisting `state` is the caller's job.
pub async fn reconcile_tick(
    state: &mut KnownState,
    config: &TickConfig,
    lister: &impl BucketLister,
    notifier: &impl Notifier,
    clock: &impl Clock,
) -> TickOutcome {
    let listing = match lister.list_objects().await {
        Ok(listing) => listing,
        Err(error) => {
            tracing::error!(
                component = "tick",
                event = "listing_failed",
                bucket = %error.bucket,
                error = %error.message,
                "skipping tick after listing failure"
            );
            return TickOutcome::ListingFailed(error);
        }
    };

    let diff = compute_key_diff(&listing, state, config.track_deletions);
    let mut report = TickReport::default();
    if diff.is_empty() {
        return TickOutcome::Completed(report);
    }

    for object in diff.added {
        let announcement = build_announcement(object, &config.download_urls, clock.now());
        match notifier.send(&announcement).await {
            Ok(notification_id) => {
                tracing::info!(
                    component = "tick",
                    event = "object_announced",
                    key = %object.key,
                    notification_id = %notification_id,
                    size_bytes = object.size_bytes,
                    "announced new object"
                );
                let tracked_id = config.track_deletions.then_some(notification_id);
                state.record_announced(&object.key, tracked_id);
                report.announced.push(object.key.clone());
            }
            Err(error) => {
                tracing::error!(
                    component = "tick",
                    event = "announcement_failed",
                    key = %error.key,
                    error = %error.message,
                    "announcement failed; key will be retried next tick"
                );
                report.send_failures.push(error);
            }
        }
    }

    for key in diff.removed {
        if let Some(notification_id) = state.forget(&key) {
            match notifier.retract(&notification_id).await {
                Ok(RetractOutcome::Retracted) => tracing::info!(
                    component = "tick",
                    event = "announcement_retracted",
                    key = %key,
                    notification_id = %notification_id,
                    "retracted announcement for removed object"
                ),
                Ok(RetractOutcome::NotFound) => tracing::debug!(
                    component = "tick",
                    event = "announcement_already_gone",
                    key = %key,
                    notification_id = %notification_id,
                    "announcement was already deleted"
                ),
                Err(error) => {
                    tracing::warn!(
                        component = "tick",
                        event = "retraction_failed",
                        key = %key,
                        notification_id = %error.notification_id,
                        error = %error.message,
                        "dropping notification id anyway"
                    );
                    report.retraction_failures.push(error);
                }
            }
        } else {
            tracing::info!(component = "tick", event = "object_removed", key = %key);
        }
        report.removed.push(key);
    }

    TickOutcome::Completed(report)
}
