// Copyright (c) 2025 - Cowboy AI, Inc.
//! Service Layer for Subscription Management
//!
//! This module provides the application service that the outer gateway/API
//! layer calls. It coordinates the registry, the polling scheduler, and the
//! audit trail.
//!
//! # Architecture
//!
//! ```text
//! Client Request
//!     ↓
//! Service Layer (this module)
//!     ↓                     ↓
//! SubscriptionRegistry   PollingScheduler → Poller → NotificationDispatcher
//!     ↓
//! AuditSink (best effort)
//! ```
//!
//! # Operation Semantics
//!
//! - **Create**: store the record, then start its task. If the task cannot
//!   start, the record is removed again and the caller gets the error.
//! - **Update**: stop the old task, swap the record, start a new task. If the
//!   new task cannot start, the old record is restored and its stopped task
//!   resumed with its baseline intact. If even that fails the subscription
//!   stays registered but not polling.
//! - **Delete**: remove the record and stop its task, waiting for any tick in
//!   progress.
//!
//! Mutating operations on the same subscription ID are serialized; different
//! IDs proceed concurrently.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use infra_gateway::adapters::InMemoryInventory;
//! use infra_gateway::config::GatewayConfig;
//! use infra_gateway::domain::Subscription;
//! use infra_gateway::service::{PollingSubscriptionService, SubscriptionService};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let inventory = Arc::new(InMemoryInventory::new());
//!     let service = PollingSubscriptionService::for_backend(inventory, &GatewayConfig::default())?;
//!
//!     let stored = service
//!         .create_subscription(Subscription::new("https://consumer.example/hook"))
//!         .await?;
//!     println!("subscribed as {}", stored.subscription_id);
//!
//!     service.shutdown().await;
//!     Ok(())
//! }
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config::GatewayConfig;
use crate::domain::{ResourceGetter, ResourceLister, Subscription};
use crate::errors::SubscriptionResult;
use crate::notification::{NotificationDispatcher, ReqwestTransport};
use crate::registry::SubscriptionRegistry;
use crate::scheduler::PollingScheduler;
use crate::snapshot::ResourceSnapshotter;
use crate::telemetry::{
    AuditOperation, AuditOutcome, AuditRecord, AuditSink, TracingAuditSink, WebhookMetrics,
};

/// Subscription service trait
///
/// Defines the public operations of the change-notification engine.
#[async_trait]
pub trait SubscriptionService: Send + Sync {
    /// Register a subscription and start polling for it
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` for a missing or malformed callback URL or a
    ///   duplicate ID
    /// - `SnapshotFailure` if the initial baseline cannot be taken
    async fn create_subscription(&self, subscription: Subscription) -> SubscriptionResult<Subscription>;

    async fn get_subscription(&self, subscription_id: &str) -> SubscriptionResult<Subscription>;

    /// Replace a subscription wholesale and restart its task
    ///
    /// Only the ID of the stored record is kept; filter and callback come
    /// entirely from `subscription`.
    async fn update_subscription(
        &self,
        subscription_id: &str,
        subscription: Subscription,
    ) -> SubscriptionResult<Subscription>;

    async fn delete_subscription(&self, subscription_id: &str) -> SubscriptionResult<()>;

    async fn list_subscriptions(&self) -> SubscriptionResult<Vec<Subscription>>;

    /// Stop every polling task; call before process exit
    async fn shutdown(&self);
}

/// Subscription service backed by the in-process registry and scheduler
pub struct PollingSubscriptionService {
    registry: SubscriptionRegistry,
    scheduler: PollingScheduler,
    audit: Arc<dyn AuditSink>,
    id_locks: IdLocks,
}

/// Per-subscription-ID async locks
///
/// An entry lives only while some caller holds or waits for its lock, so
/// the map stays bounded by the number of in-flight operations.
#[derive(Debug, Default)]
struct IdLocks {
    locks: StdMutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl IdLocks {
    async fn acquire(&self, subscription_id: &str) -> IdGuard<'_> {
        let lock = self
            .locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .entry(subscription_id.to_string())
            .or_default()
            .clone();

        IdGuard {
            locks: self,
            subscription_id: subscription_id.to_string(),
            guard: Some(lock.lock_owned().await),
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

/// Held lock on one subscription ID
struct IdGuard<'a> {
    locks: &'a IdLocks,
    subscription_id: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for IdGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());

        let mut locks = self
            .locks
            .locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        // Only the map's own reference left: no holder, no waiter
        if locks
            .get(&self.subscription_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.subscription_id);
        }
    }
}

impl PollingSubscriptionService {
    pub fn new(scheduler: PollingScheduler) -> Self {
        Self {
            registry: SubscriptionRegistry::new(),
            scheduler,
            audit: Arc::new(TracingAuditSink),
            id_locks: IdLocks::default(),
        }
    }

    /// Wire the engine to one backend with the production transport
    pub fn for_backend<B>(backend: Arc<B>, config: &GatewayConfig) -> SubscriptionResult<Self>
    where
        B: ResourceLister + ResourceGetter + 'static,
    {
        let transport = ReqwestTransport::new(&config.delivery)?;
        let dispatcher = NotificationDispatcher::new(Arc::new(transport), &config.delivery)
            .with_getter(backend.clone())
            .with_metrics(Arc::new(WebhookMetrics::default()));
        let scheduler = PollingScheduler::new(
            ResourceSnapshotter::new(backend),
            dispatcher,
            &config.polling,
        );

        Ok(Self::new(scheduler))
    }

    pub fn with_audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    pub fn registry(&self) -> &SubscriptionRegistry {
        &self.registry
    }

    pub fn scheduler(&self) -> &PollingScheduler {
        &self.scheduler
    }

    async fn audit<T>(
        &self,
        operation: AuditOperation,
        subscription_id: &str,
        result: &SubscriptionResult<T>,
    ) {
        let outcome = match result {
            Ok(_) => AuditOutcome::Success,
            Err(e) => AuditOutcome::Failure(e.to_string()),
        };
        let record = AuditRecord::new(operation, subscription_id, outcome);

        if let Err(e) = self.audit.log_subscription_operation(&record).await {
            warn!(subscription_id, operation = ?operation, error = %e, "Audit sink rejected record");
        }
    }

    async fn create_locked(&self, subscription: Subscription) -> SubscriptionResult<Subscription> {
        let stored = self.registry.create(subscription).await?;

        if let Err(e) = self.scheduler.start_polling(stored.clone()).await {
            let _ = self.registry.delete(&stored.subscription_id).await;
            warn!(
                subscription_id = %stored.subscription_id,
                error = %e,
                "Polling failed to start, subscription discarded"
            );
            return Err(e);
        }

        info!(
            subscription_id = %stored.subscription_id,
            callback_url = %stored.callback_url,
            "Subscription created"
        );
        Ok(stored)
    }

    async fn update_locked(
        &self,
        subscription_id: &str,
        subscription: Subscription,
    ) -> SubscriptionResult<Subscription> {
        let previous = self.registry.get(subscription_id).await?;
        subscription.validate()?;

        let old_poller = self.scheduler.stop_polling(subscription_id).await;

        let started = match self.registry.update(subscription_id, subscription).await {
            Ok(stored) => self
                .scheduler
                .start_polling(stored.clone())
                .await
                .map(|()| stored),
            Err(e) => Err(e),
        };

        let error = match started {
            Ok(stored) => {
                info!(
                    subscription_id,
                    callback_url = %stored.callback_url,
                    "Subscription updated"
                );
                return Ok(stored);
            }
            Err(e) => e,
        };

        self.registry.restore(previous.clone()).await;
        let restarted = match old_poller {
            Some(poller) => self.scheduler.resume_polling(poller).await,
            None => self.scheduler.start_polling(previous).await,
        };

        match restarted {
            Ok(()) => warn!(
                subscription_id,
                error = %error,
                "Update rolled back to previous subscription"
            ),
            Err(restart_error) => error!(
                subscription_id,
                error = %error,
                restart_error = %restart_error,
                "Update rolled back but previous subscription could not resume; registered without polling"
            ),
        }
        Err(error)
    }

    async fn delete_locked(&self, subscription_id: &str) -> SubscriptionResult<()> {
        self.registry.delete(subscription_id).await?;
        self.scheduler.stop_polling(subscription_id).await;
        info!(subscription_id, "Subscription deleted");
        Ok(())
    }
}

#[async_trait]
impl SubscriptionService for PollingSubscriptionService {
    async fn create_subscription(&self, mut subscription: Subscription) -> SubscriptionResult<Subscription> {
        if let Err(e) = subscription.validate() {
            let result = Err(e);
            self.audit(AuditOperation::Create, &subscription.subscription_id, &result)
                .await;
            return result;
        }
        if subscription.subscription_id.is_empty() {
            subscription.subscription_id = Uuid::now_v7().to_string();
        }

        let id = subscription.subscription_id.clone();
        let result = {
            let _guard = self.id_locks.acquire(&id).await;
            self.create_locked(subscription).await
        };

        self.audit(AuditOperation::Create, &id, &result).await;
        result
    }

    async fn get_subscription(&self, subscription_id: &str) -> SubscriptionResult<Subscription> {
        self.registry.get(subscription_id).await
    }

    async fn update_subscription(
        &self,
        subscription_id: &str,
        subscription: Subscription,
    ) -> SubscriptionResult<Subscription> {
        let result = {
            let _guard = self.id_locks.acquire(subscription_id).await;
            self.update_locked(subscription_id, subscription).await
        };

        self.audit(AuditOperation::Update, subscription_id, &result).await;
        result
    }

    async fn delete_subscription(&self, subscription_id: &str) -> SubscriptionResult<()> {
        let result = {
            let _guard = self.id_locks.acquire(subscription_id).await;
            self.delete_locked(subscription_id).await
        };

        self.audit(AuditOperation::Delete, subscription_id, &result).await;
        result
    }

    async fn list_subscriptions(&self) -> SubscriptionResult<Vec<Subscription>> {
        Ok(self.registry.list().await)
    }

    async fn shutdown(&self) {
        let subscriptions = self.registry.len().await;
        info!(subscriptions, "Shutting down subscription service");
        self.scheduler.stop_all().await;
    }
}

impl std::fmt::Debug for PollingSubscriptionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollingSubscriptionService")
            .field("interval", &self.scheduler.interval())
            .finish_non_exhaustive()
    }
}
