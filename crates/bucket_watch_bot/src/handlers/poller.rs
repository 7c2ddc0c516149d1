use std::future::Future;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::time::{Interval, MissedTickBehavior};

use crate::adapters::bucket_listing::BucketLister;
use crate::adapters::notifier::Notifier;
use crate::adapters::state_store::{StateStore, StateStoreError};
use crate::handlers::tick::{reconcile_tick, TickConfig, TickOutcome};
use crate::runtime::clock::Clock;
use crate::runtime::contract::KnownState;

/// Decides when the next tick may start. Returns `false` once no more ticks should run.
#[async_trait]
pub trait Ticker: Send {
    async fn tick(&mut self) -> bool;
}

/// Wall-clock ticker. The first tick fires immediately; a tick that overruns
/// the period delays the next one instead of bursting to catch up.
#[derive(Debug)]
pub struct IntervalTicker {
    interval: Interval,
}

impl IntervalTicker {
    pub fn new(period: Duration) -> Self {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { interval }
    }
}

#[async_trait]
impl Ticker for IntervalTicker {
    async fn tick(&mut self) -> bool {
        self.interval.tick().await;
        true
    }
}

/// Fires a fixed number of ticks back to back, then stops.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedTicks {
    remaining: usize,
}

impl FixedTicks {
    pub fn new(count: usize) -> Self {
        Self { remaining: count }
    }
}

#[async_trait]
impl Ticker for FixedTicks {
    async fn tick(&mut self) -> bool {
        if self.remaining == 0 {
            return false;
        }
        self.remaining -= 1;
        true
    }
}

/// Owns the reconciliation state and drives one tick at a time.
pub struct Poller<L, N, S, C> {
    config: TickConfig,
    lister: L,
    notifier: N,
    store: S,
    clock: C,
    state: KnownState,
    unsaved: bool,
}

impl<L, N, S, C> Poller<L, N, S, C>
where
    L: BucketLister,
    N: Notifier,
    S: StateStore,
    C: Clock,
{
    /// Loads the last saved state from `store`.
    pub fn new(
        config: TickConfig,
        lister: L,
        notifier: N,
        store: S,
        clock: C,
    ) -> Result<Self, StateStoreError> {
        let state = store.load()?;
        tracing::info!(
            component = "poller",
            event = "state_loaded",
            known_keys = state.known_keys.len(),
            notification_ids = state.notification_ids.len(),
            "loaded reconciliation state"
        );
        Ok(Self {
            config,
            lister,
            notifier,
            store,
            clock,
            state,
            unsaved: false,
        })
    }

    pub fn state(&self) -> &KnownState {
        &self.state
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// True when the last save failed and the in-memory state is ahead of disk.
    pub fn has_unsaved_changes(&self) -> bool {
        self.unsaved
    }

    /// Runs one reconciliation pass and persists the state if it changed.
    pub async fn tick_once(&mut self) -> TickOutcome {
        let started_at = Instant::now();
        let outcome = reconcile_tick(
            &mut self.state,
            &self.config,
            &self.lister,
            &self.notifier,
            &self.clock,
        )
        .await;

        if outcome.changed_state() || self.unsaved {
            self.persist();
        }

        match outcome.report() {
            Some(report) if report.changed_state() => tracing::info!(
                component = "poller",
                event = "tick_completed",
                announced = report.announced.len(),
                removed = report.removed.len(),
                send_failures = report.send_failures.len(),
                retraction_failures = report.retraction_failures.len(),
                known_keys = self.state.known_keys.len(),
                duration_ms = started_at.elapsed().as_millis() as u64,
                "reconciled bucket listing"
            ),
            Some(_) => tracing::debug!(
                component = "poller",
                event = "tick_unchanged",
                known_keys = self.state.known_keys.len(),
                duration_ms = started_at.elapsed().as_millis() as u64,
                "bucket listing unchanged"
            ),
            None => {}
        }

        outcome
    }

    /// Ticks until `ticker` stops or `shutdown` resolves. Shutdown is only
    /// observed between ticks, so a tick always finishes and persists.
    pub async fn run(&mut self, ticker: &mut impl Ticker, shutdown: impl Future<Output = ()>) {
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                biased;
                () = &mut shutdown => {
                    tracing::info!(component = "poller", event = "shutdown", "stopping poller");
                    break;
                }
                keep_going = ticker.tick() => {
                    if !keep_going {
                        break;
                    }
                }
            }
            self.tick_once().await;
        }
    }

    fn persist(&mut self) {
        match self.store.save(&self.state) {
            Ok(()) => self.unsaved = false,
            Err(error) => {
                self.unsaved = true;
                tracing::error!(
                    component = "poller",
                    event = "state_save_failed",
                    error = %error,
                    "state will be saved again on the next tick"
                );
            }
        }
    }
}
