// Copyright (c) 2025 - Cowboy AI, Inc.
//! One subscription's change feed
//!
//! A [`Poller`] owns the baseline snapshot of one subscription and runs its
//! ticks:
//!
//! ```text
//! snapshot → diff(baseline, snapshot) → filter → dispatch (in order) → baseline := snapshot
//! ```
//!
//! The baseline is replaced after every completed tick even when some
//! deliveries failed; retries live inside the dispatcher, never in
//! re-diffing. A tick whose snapshot fails leaves the baseline untouched.

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::change::diff;
use crate::domain::Subscription;
use crate::errors::{SubscriptionError, SubscriptionResult};
use crate::filter;
use crate::lifecycle::Cancellation;
use crate::notification::NotificationDispatcher;
use crate::snapshot::{ResourceSnapshot, ResourceSnapshotter};

/// Counters for one completed tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    /// Changes detected before filtering
    pub detected: usize,
    /// Changes that passed the subscription filter
    pub matched: usize,
    pub delivered: usize,
    pub failed: usize,
}

/// Live state of a subscription's change feed
pub struct Poller {
    subscription: Subscription,
    snapshotter: ResourceSnapshotter,
    dispatcher: NotificationDispatcher,
    last_snapshot: ResourceSnapshot,
    last_poll_time: DateTime<Utc>,
}

impl Poller {
    /// Take the initial baseline for a subscription
    ///
    /// Fails with `SnapshotFailure` when the backend cannot be listed.
    pub async fn start(
        subscription: Subscription,
        snapshotter: ResourceSnapshotter,
        dispatcher: NotificationDispatcher,
        cancel: &Cancellation,
    ) -> SubscriptionResult<Self> {
        let baseline = cancel.run(snapshotter.snapshot()).await??;
        Ok(Self::with_baseline(subscription, snapshotter, dispatcher, baseline))
    }

    /// Build a poller around an existing baseline
    pub fn with_baseline(
        subscription: Subscription,
        snapshotter: ResourceSnapshotter,
        dispatcher: NotificationDispatcher,
        baseline: ResourceSnapshot,
    ) -> Self {
        Self {
            subscription,
            snapshotter,
            dispatcher,
            last_snapshot: baseline,
            last_poll_time: Utc::now(),
        }
    }

    pub fn subscription(&self) -> &Subscription {
        &self.subscription
    }

    pub fn subscription_id(&self) -> &str {
        &self.subscription.subscription_id
    }

    pub fn last_snapshot(&self) -> &ResourceSnapshot {
        &self.last_snapshot
    }

    pub fn last_poll_time(&self) -> DateTime<Utc> {
        self.last_poll_time
    }

    /// Run one tick
    ///
    /// Changes are dispatched sequentially in detection order. Returns
    /// `SnapshotFailure` if the backend could not be listed and `Cancelled`
    /// if `cancel` fired mid-tick; in both cases the baseline is unchanged.
    pub async fn tick(&mut self, cancel: &Cancellation) -> SubscriptionResult<TickSummary> {
        let current = match cancel.run(self.snapshotter.snapshot()).await? {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(
                    subscription_id = %self.subscription.subscription_id,
                    error = %e,
                    "Snapshot failed, keeping previous baseline"
                );
                return Err(e);
            }
        };

        let changes = diff(&self.last_snapshot, &current);
        let mut summary = TickSummary {
            detected: changes.len(),
            ..Default::default()
        };

        for change in &changes {
            if !filter::matches(self.subscription.filter.as_ref(), change) {
                continue;
            }
            summary.matched += 1;

            match self.dispatcher.dispatch(&self.subscription, change, cancel).await {
                Ok(_) => summary.delivered += 1,
                Err(SubscriptionError::Cancelled) => return Err(SubscriptionError::Cancelled),
                // Already logged by the dispatcher; one failed delivery must not stall the feed
                Err(_) => summary.failed += 1,
            }
        }

        self.last_snapshot = current;
        self.last_poll_time = Utc::now();

        debug!(
            subscription_id = %self.subscription.subscription_id,
            detected = summary.detected,
            matched = summary.matched,
            delivered = summary.delivered,
            failed = summary.failed,
            resources = self.last_snapshot.len(),
            "Tick complete"
        );
        Ok(summary)
    }
}
