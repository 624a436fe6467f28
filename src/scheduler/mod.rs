// Copyright (c) 2025 - Cowboy AI, Inc.
//! Polling Scheduler
//!
//! Owns one background task per active subscription. Each task waits for
//! its interval, runs one [`Poller::tick`], and repeats.
//!
//! # States
//!
//! ```text
//!            start_polling / resume_polling
//! Stopped ─────────────────────────────────▶ Active
//!    ▲                                         │
//!    └──────── stop_polling / stop_all ────────┘
//! ```
//!
//! A subscription is Active while its ID holds a running task in the task
//! table. A stopping task keeps its slot until it has exited, so the table
//! never holds more than one task per ID and no new task can start for an ID
//! whose previous tick is still delivering.
//!
//! # Signals
//!
//! - Each task has a private stop signal, observed only between ticks.
//!   [`PollingScheduler::stop_polling`] fires it and waits, so the current
//!   tick always completes and no delivery happens after it returns.
//! - The scheduler has one lifecycle signal shared by all tasks, fired by
//!   [`PollingScheduler::stop_all`]. It also interrupts in-flight snapshot
//!   queries, webhook attempts, and backoff sleeps so shutdown is prompt.

pub mod poller;

pub use poller::{Poller, TickSummary};

use std::collections::HashMap;
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::config::PollingConfig;
use crate::domain::Subscription;
use crate::errors::{SubscriptionError, SubscriptionResult};
use crate::lifecycle::{Cancellation, CancellationSource};
use crate::notification::NotificationDispatcher;
use crate::snapshot::ResourceSnapshotter;

/// Entry of the task table
enum TaskSlot {
    Running(TaskHandle),
    /// Stop signalled; the slot is released once the task has exited
    Stopping,
}

/// Handle to a running polling task
struct TaskHandle {
    stop: CancellationSource,
    join: JoinHandle<Poller>,
}

impl TaskHandle {
    /// Signal the task and wait for its current tick to finish
    async fn stop(self, subscription_id: &str) -> Option<Poller> {
        self.stop.cancel();
        match self.join.await {
            Ok(poller) => Some(poller),
            Err(e) => {
                error!(subscription_id, error = %e, "Polling task panicked");
                None
            }
        }
    }
}

/// Scheduler of per-subscription polling tasks for one backend
pub struct PollingScheduler {
    snapshotter: ResourceSnapshotter,
    dispatcher: NotificationDispatcher,
    interval: Duration,
    tasks: Mutex<HashMap<String, TaskSlot>>,
    lifecycle: CancellationSource,
}

impl PollingScheduler {
    pub fn new(
        snapshotter: ResourceSnapshotter,
        dispatcher: NotificationDispatcher,
        config: &PollingConfig,
    ) -> Self {
        Self {
            snapshotter: snapshotter.with_timeout(config.snapshot_timeout),
            dispatcher,
            // tokio intervals must be non-zero
            interval: config.interval.max(Duration::from_millis(1)),
            tasks: Mutex::new(HashMap::new()),
            lifecycle: CancellationSource::new(),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Start polling for a subscription
    ///
    /// Takes the initial baseline first; fails with `SnapshotFailure` if it
    /// cannot be taken and with `AlreadyRunning` if the ID already has a task,
    /// including one that is still stopping.
    pub async fn start_polling(&self, subscription: Subscription) -> SubscriptionResult<()> {
        let id = subscription.subscription_id.clone();
        self.ensure_accepting()?;
        if self.tasks.lock().await.contains_key(&id) {
            return Err(SubscriptionError::AlreadyRunning(id));
        }

        let poller = Poller::start(
            subscription,
            self.snapshotter.clone(),
            self.dispatcher.clone(),
            &self.lifecycle.token(),
        )
        .await?;

        self.resume_polling(poller).await
    }

    /// Relaunch a poller previously returned by [`stop_polling`](Self::stop_polling)
    ///
    /// Keeps the poller's baseline, so no snapshot is taken and changes made
    /// while it was stopped are reported on its first tick.
    pub async fn resume_polling(&self, poller: Poller) -> SubscriptionResult<()> {
        self.ensure_accepting()?;
        let id = poller.subscription_id().to_string();

        let mut tasks = self.tasks.lock().await;
        if tasks.contains_key(&id) {
            return Err(SubscriptionError::AlreadyRunning(id));
        }

        let stop = CancellationSource::new();
        let join = tokio::spawn(run_polling_loop(
            poller,
            self.interval,
            stop.token(),
            self.lifecycle.token(),
        ));
        tasks.insert(id.clone(), TaskSlot::Running(TaskHandle { stop, join }));

        info!(subscription_id = %id, interval_secs = self.interval.as_secs_f64(), "Polling started");
        Ok(())
    }

    /// Stop a subscription's task, waiting for its current tick to complete
    ///
    /// Returns the stopped poller, or `None` if the ID had no running task.
    /// The ID stays reserved until the task has exited.
    pub async fn stop_polling(&self, subscription_id: &str) -> Option<Poller> {
        let handle = {
            let mut tasks = self.tasks.lock().await;
            match tasks.remove(subscription_id)? {
                TaskSlot::Running(handle) => {
                    tasks.insert(subscription_id.to_string(), TaskSlot::Stopping);
                    handle
                }
                TaskSlot::Stopping => {
                    tasks.insert(subscription_id.to_string(), TaskSlot::Stopping);
                    return None;
                }
            }
        };

        let poller = handle.stop(subscription_id).await;

        let mut tasks = self.tasks.lock().await;
        if matches!(tasks.get(subscription_id), Some(TaskSlot::Stopping)) {
            tasks.remove(subscription_id);
        }
        drop(tasks);

        info!(subscription_id, "Polling stopped");
        poller
    }

    /// Stop every task and wait for all of them
    ///
    /// In-flight snapshot queries and deliveries are interrupted. The
    /// scheduler accepts no new tasks afterwards.
    pub async fn stop_all(&self) {
        self.lifecycle.cancel();

        let handles: Vec<(String, TaskHandle)> = self
            .tasks
            .lock()
            .await
            .drain()
            .filter_map(|(id, slot)| match slot {
                TaskSlot::Running(handle) => Some((id, handle)),
                TaskSlot::Stopping => None,
            })
            .collect();
        let count = handles.len();

        join_all(
            handles
                .into_iter()
                .map(|(id, handle)| async move { handle.stop(&id).await }),
        )
        .await;

        info!(tasks = count, "All polling tasks stopped");
    }

    pub async fn is_polling(&self, subscription_id: &str) -> bool {
        matches!(
            self.tasks.lock().await.get(subscription_id),
            Some(TaskSlot::Running(_))
        )
    }

    pub async fn active_count(&self) -> usize {
        self.tasks
            .lock()
            .await
            .values()
            .filter(|slot| matches!(slot, TaskSlot::Running(_)))
            .count()
    }

    fn ensure_accepting(&self) -> SubscriptionResult<()> {
        if self.lifecycle.is_cancelled() {
            Err(SubscriptionError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Body of one polling task; returns the poller when stopped
async fn run_polling_loop(
    mut poller: Poller,
    interval: Duration,
    stop: Cancellation,
    lifecycle: Cancellation,
) -> Poller {
    let mut ticker = time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = stop.cancelled() => break,
            _ = lifecycle.cancelled() => break,
            _ = ticker.tick() => {}
        }

        match poller.tick(&lifecycle).await {
            Ok(summary) if summary.matched > 0 => debug!(
                subscription_id = %poller.subscription_id(),
                delivered = summary.delivered,
                failed = summary.failed,
                "Notifications dispatched"
            ),
            Ok(_) => {}
            Err(SubscriptionError::Cancelled) => break,
            // Transient; the next tick retries from the same baseline
            Err(e) => warn!(
                subscription_id = %poller.subscription_id(),
                error = %e,
                "Tick abandoned"
            ),
        }
    }

    debug!(
        subscription_id = %poller.subscription_id(),
        last_poll_time = %poller.last_poll_time(),
        "Polling task exiting"
    );
    poller
}
