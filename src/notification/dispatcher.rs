// Copyright (c) 2025 - Cowboy AI, Inc.
//! Notification Dispatcher
//!
//! Delivers one change to one subscriber:
//!
//! 1. For non-delete changes, fetch the current resource through the
//!    backend's [`ResourceGetter`]; fall back to a `{resourceId}` stub when
//!    the fetch fails.
//! 2. Serialize the [`NotificationPayload`].
//! 3. POST it with a fixed per-attempt timeout, retrying non-2xx answers and
//!    transport errors on the [`RetryPolicy`] backoff schedule.
//!
//! Every attempt is reported to the [`MetricsSink`]. Backoff sleeps and
//! in-flight attempts are cut short when the supplied [`Cancellation`] fires.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{debug, error, warn};

use super::retry::{RetryPolicy, Sleeper, TokioSleeper};
use super::transport::WebhookTransport;
use super::{resource_stub, NotificationPayload};
use crate::change::{ChangeKind, ResourceChange};
use crate::config::DeliveryConfig;
use crate::domain::{ResourceGetter, Subscription};
use crate::errors::{SubscriptionError, SubscriptionResult};
use crate::lifecycle::Cancellation;
use crate::telemetry::{MetricsSink, NoopMetrics};

/// Result of a successful delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Attempts made, including the successful one
    pub attempts: u32,
    pub status_code: u16,
}

/// Webhook dispatcher shared by all polling tasks of one adapter
#[derive(Clone)]
pub struct NotificationDispatcher {
    transport: Arc<dyn WebhookTransport>,
    getter: Option<Arc<dyn ResourceGetter>>,
    policy: RetryPolicy,
    request_timeout: Duration,
    sleeper: Arc<dyn Sleeper>,
    metrics: Arc<dyn MetricsSink>,
}

impl NotificationDispatcher {
    pub fn new(transport: Arc<dyn WebhookTransport>, config: &DeliveryConfig) -> Self {
        Self {
            transport,
            getter: None,
            policy: config.retry_policy(),
            request_timeout: config.request_timeout,
            sleeper: Arc::new(TokioSleeper),
            metrics: Arc::new(NoopMetrics),
        }
    }

    /// Resolve full resource bodies through the given backend
    pub fn with_getter(mut self, getter: Arc<dyn ResourceGetter>) -> Self {
        self.getter = Some(getter);
        self
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Build the payload for one change
    pub async fn build_payload(
        &self,
        subscription: &Subscription,
        change: &ResourceChange,
    ) -> NotificationPayload {
        let resource = match (change.kind, &self.getter) {
            (ChangeKind::Deleted, _) | (_, None) => resource_stub(&change.resource_id),
            (_, Some(getter)) => match getter.get(&change.resource_id).await {
                Ok(resource) => serde_json::to_value(&resource).unwrap_or_else(|e| {
                    warn!(resource_id = %change.resource_id, error = %e, "Resource not serializable, sending stub");
                    resource_stub(&change.resource_id)
                }),
                Err(e) => {
                    warn!(
                        subscription_id = %subscription.subscription_id,
                        resource_id = %change.resource_id,
                        error = %e,
                        "Resource refetch failed, sending stub"
                    );
                    resource_stub(&change.resource_id)
                }
            },
        };

        NotificationPayload {
            subscription_id: subscription.subscription_id.clone(),
            consumer_subscription_id: subscription.consumer_subscription_id.clone(),
            event_type: change.kind,
            resource,
            timestamp: Utc::now(),
        }
    }

    /// Deliver one change to the subscription's callback
    ///
    /// Returns `DeliveryFailure` once the retry budget is exhausted and
    /// `Cancelled` if `cancel` fires first. Neither is meant to stop the
    /// caller's polling loop.
    pub async fn dispatch(
        &self,
        subscription: &Subscription,
        change: &ResourceChange,
        cancel: &Cancellation,
    ) -> SubscriptionResult<DeliveryReport> {
        let payload = cancel.run(self.build_payload(subscription, change)).await?;
        let body = serde_json::to_vec(&payload)?;
        let url = subscription.callback_url.as_str();
        let max_attempts = self.policy.max_attempts();
        let mut last_error = String::new();

        for attempt in 1..=max_attempts {
            if attempt > 1 {
                let delay = self.policy.delay(attempt - 1);
                debug!(
                    subscription_id = %subscription.subscription_id,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "Backing off before webhook retry"
                );
                cancel.run(self.sleeper.sleep(delay)).await?;
            }

            let started = Instant::now();
            let outcome = cancel
                .run(self.transport.post_json(url, &body, self.request_timeout))
                .await?;
            let elapsed = started.elapsed();

            match outcome {
                Ok(status) if (200..300).contains(&status) => {
                    self.metrics.record_webhook_delivery(elapsed, Some(status), None);
                    debug!(
                        subscription_id = %subscription.subscription_id,
                        resource_id = %change.resource_id,
                        event_type = %change.kind,
                        attempt,
                        status,
                        "Webhook delivered"
                    );
                    return Ok(DeliveryReport {
                        attempts: attempt,
                        status_code: status,
                    });
                }
                Ok(status) => {
                    let reason = format!("callback returned HTTP {}", status);
                    self.metrics
                        .record_webhook_delivery(elapsed, Some(status), Some(&reason));
                    warn!(
                        subscription_id = %subscription.subscription_id,
                        attempt,
                        max_attempts,
                        status,
                        "Webhook attempt rejected"
                    );
                    last_error = reason;
                }
                Err(e) => {
                    let reason = e.to_string();
                    self.metrics.record_webhook_delivery(elapsed, None, Some(&reason));
                    warn!(
                        subscription_id = %subscription.subscription_id,
                        attempt,
                        max_attempts,
                        error = %e,
                        "Webhook attempt failed"
                    );
                    last_error = reason;
                }
            }
        }

        error!(
            subscription_id = %subscription.subscription_id,
            callback_url = %subscription.callback_url,
            resource_id = %change.resource_id,
            event_type = %change.kind,
            attempts = max_attempts,
            error = %last_error,
            "Webhook delivery failed, giving up"
        );
        Err(SubscriptionError::DeliveryFailure {
            attempts: max_attempts,
            reason: last_error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::InMemoryInventory;
    use crate::domain::Resource;
    use crate::lifecycle::CancellationSource;
    use crate::notification::TransportError;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Transport answering from a script, then with a fallback status
    struct ScriptedTransport {
        script: Mutex<VecDeque<Result<u16, TransportError>>>,
        fallback: u16,
        bodies: Mutex<Vec<(String, Vec<u8>)>>,
    }

    impl ScriptedTransport {
        fn new(script: Vec<Result<u16, TransportError>>, fallback: u16) -> Self {
            Self {
                script: Mutex::new(script.into()),
                fallback,
                bodies: Mutex::new(Vec::new()),
            }
        }

        fn attempts(&self) -> usize {
            self.bodies.lock().unwrap().len()
        }

        fn last_payload(&self) -> serde_json::Value {
            let bodies = self.bodies.lock().unwrap();
            serde_json::from_slice(&bodies.last().unwrap().1).unwrap()
        }
    }

    #[async_trait]
    impl WebhookTransport for ScriptedTransport {
        async fn post_json(&self, url: &str, body: &[u8], _timeout: Duration) -> Result<u16, TransportError> {
            self.bodies
                .lock()
                .unwrap()
                .push((url.to_string(), body.to_vec()));
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(self.fallback))
        }
    }

    #[derive(Default)]
    struct RecordingSleeper {
        sleeps: Mutex<Vec<Duration>>,
    }

    #[async_trait]
    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, duration: Duration) {
            self.sleeps.lock().unwrap().push(duration);
        }
    }

    #[derive(Default)]
    struct RecordingMetrics {
        attempts: Mutex<Vec<(Option<u16>, bool)>>,
    }

    impl MetricsSink for RecordingMetrics {
        fn record_webhook_delivery(&self, _duration: Duration, status_code: Option<u16>, error: Option<&str>) {
            self.attempts
                .lock()
                .unwrap()
                .push((status_code, error.is_none()));
        }
    }

    fn subscription() -> Subscription {
        Subscription::new("https://cb/x")
            .with_id("sub-1")
            .with_consumer_id("consumer-1")
    }

    fn dispatcher(
        transport: Arc<ScriptedTransport>,
        sleeper: Arc<RecordingSleeper>,
        metrics: Arc<RecordingMetrics>,
    ) -> NotificationDispatcher {
        NotificationDispatcher::new(transport, &DeliveryConfig::default())
            .with_sleeper(sleeper)
            .with_metrics(metrics)
    }

    #[tokio::test]
    async fn test_first_attempt_success() {
        let transport = Arc::new(ScriptedTransport::new(vec![], 204));
        let sleeper = Arc::new(RecordingSleeper::default());
        let metrics = Arc::new(RecordingMetrics::default());

        let report = dispatcher(transport.clone(), sleeper.clone(), metrics.clone())
            .dispatch(&subscription(), &ResourceChange::new(ChangeKind::Deleted, "r1"), &Cancellation::never())
            .await
            .unwrap();

        assert_eq!(report, DeliveryReport { attempts: 1, status_code: 204 });
        assert!(sleeper.sleeps.lock().unwrap().is_empty());
        assert_eq!(*metrics.attempts.lock().unwrap(), vec![(Some(204), true)]);
    }

    #[tokio::test]
    async fn test_three_failures_then_success() {
        let transport = Arc::new(ScriptedTransport::new(vec![Ok(500), Ok(500), Ok(500)], 200));
        let sleeper = Arc::new(RecordingSleeper::default());
        let metrics = Arc::new(RecordingMetrics::default());

        let report = dispatcher(transport.clone(), sleeper.clone(), metrics.clone())
            .dispatch(&subscription(), &ResourceChange::new(ChangeKind::Deleted, "r1"), &Cancellation::never())
            .await
            .unwrap();

        assert_eq!(report.attempts, 4);
        assert_eq!(transport.attempts(), 4);
        assert_eq!(
            *sleeper.sleeps.lock().unwrap(),
            vec![Duration::from_secs(2), Duration::from_secs(4), Duration::from_secs(8)]
        );
        assert_eq!(
            *metrics.attempts.lock().unwrap(),
            vec![
                (Some(500), false),
                (Some(500), false),
                (Some(500), false),
                (Some(200), true)
            ]
        );
    }

    #[tokio::test]
    async fn test_budget_exhausted() {
        let transport = Arc::new(ScriptedTransport::new(
            vec![Err(TransportError::Connect("refused".to_string()))],
            503,
        ));
        let sleeper = Arc::new(RecordingSleeper::default());
        let metrics = Arc::new(RecordingMetrics::default());

        let err = dispatcher(transport.clone(), sleeper, metrics.clone())
            .dispatch(&subscription(), &ResourceChange::new(ChangeKind::Deleted, "r1"), &Cancellation::never())
            .await
            .unwrap_err();

        assert!(matches!(err, SubscriptionError::DeliveryFailure { attempts: 4, .. }));
        assert_eq!(transport.attempts(), 4);
        assert_eq!(metrics.attempts.lock().unwrap()[0], (None, false));
    }

    #[tokio::test]
    async fn test_redirect_status_is_a_failure() {
        let transport = Arc::new(ScriptedTransport::new(vec![Ok(302)], 200));

        let report = dispatcher(
            transport.clone(),
            Arc::new(RecordingSleeper::default()),
            Arc::new(RecordingMetrics::default()),
        )
        .dispatch(&subscription(), &ResourceChange::new(ChangeKind::Deleted, "r1"), &Cancellation::never())
        .await
        .unwrap();

        assert_eq!(report.attempts, 2);
    }

    #[tokio::test]
    async fn test_payload_uses_fetched_resource() {
        let inventory = Arc::new(InMemoryInventory::new());
        inventory.upsert(Resource::new("r1", "type-a", "pool-a").with_description("web01"));
        let transport = Arc::new(ScriptedTransport::new(vec![], 200));

        dispatcher(
            transport.clone(),
            Arc::new(RecordingSleeper::default()),
            Arc::new(RecordingMetrics::default()),
        )
        .with_getter(inventory)
        .dispatch(&subscription(), &ResourceChange::new(ChangeKind::Created, "r1"), &Cancellation::never())
        .await
        .unwrap();

        let payload = transport.last_payload();
        assert_eq!(payload["subscriptionId"], "sub-1");
        assert_eq!(payload["consumerSubscriptionId"], "consumer-1");
        assert_eq!(payload["eventType"], "ResourceCreated");
        assert_eq!(payload["resource"]["resourceId"], "r1");
        assert_eq!(payload["resource"]["description"], "web01");
        assert_eq!(payload["resource"]["resourcePoolId"], "pool-a");
    }

    #[tokio::test]
    async fn test_payload_falls_back_to_stub() {
        let inventory = Arc::new(InMemoryInventory::new());
        let transport = Arc::new(ScriptedTransport::new(vec![], 200));

        dispatcher(
            transport.clone(),
            Arc::new(RecordingSleeper::default()),
            Arc::new(RecordingMetrics::default()),
        )
        .with_getter(inventory)
        .dispatch(&subscription(), &ResourceChange::new(ChangeKind::Updated, "vanished"), &Cancellation::never())
        .await
        .unwrap();

        let payload = transport.last_payload();
        assert_eq!(payload["eventType"], "ResourceUpdated");
        assert_eq!(payload["resource"], serde_json::json!({"resourceId": "vanished"}));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_backoff() {
        let transport = Arc::new(ScriptedTransport::new(vec![], 500));
        let dispatcher = NotificationDispatcher::new(transport.clone(), &DeliveryConfig::default());
        let source = CancellationSource::new();
        let token = source.token();

        let task = tokio::spawn(async move {
            dispatcher
                .dispatch(&subscription(), &ResourceChange::new(ChangeKind::Deleted, "r1"), &token)
                .await
        });

        // First attempt fails, then the task parks in its 2s backoff
        tokio::time::sleep(Duration::from_millis(500)).await;
        source.cancel();

        assert!(matches!(task.await.unwrap(), Err(SubscriptionError::Cancelled)));
        assert_eq!(transport.attempts(), 1);
    }
}
