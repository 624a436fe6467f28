// Copyright (c) 2025 - Cowboy AI, Inc.
//! Metrics and audit collaborators
//!
//! The engine reports every webhook attempt to a [`MetricsSink`] and every
//! subscription operation to an [`AuditSink`]. Both are fire-and-forget from
//! the engine's point of view: a failing audit sink is logged, never fatal.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use metrics::{counter, histogram};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Metric names
pub mod names {
    pub const WEBHOOK_DELIVERIES_TOTAL: &str = "gateway_webhook_deliveries_total";
    pub const WEBHOOK_DELIVERY_DURATION: &str = "gateway_webhook_delivery_duration_seconds";
}

/// Metric labels
pub mod labels {
    pub const COMPONENT: &str = "component";
    pub const OUTCOME: &str = "outcome";
    pub const STATUS: &str = "status";
}

/// Observability hook for webhook attempts
pub trait MetricsSink: Send + Sync {
    fn record_webhook_delivery(&self, duration: Duration, status_code: Option<u16>, error: Option<&str>);
}

/// Discards all measurements
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMetrics;

impl MetricsSink for NoopMetrics {
    fn record_webhook_delivery(&self, _duration: Duration, _status_code: Option<u16>, _error: Option<&str>) {}
}

/// Records webhook attempts through the `metrics` facade
///
/// Whatever recorder the process installs (Prometheus exporter, etc.)
/// receives the measurements.
#[derive(Debug, Clone)]
pub struct WebhookMetrics {
    component: String,
}

impl WebhookMetrics {
    pub fn new(component: impl Into<String>) -> Self {
        Self {
            component: component.into(),
        }
    }
}

impl Default for WebhookMetrics {
    fn default() -> Self {
        Self::new("notification_dispatcher")
    }
}

impl MetricsSink for WebhookMetrics {
    fn record_webhook_delivery(&self, duration: Duration, status_code: Option<u16>, error: Option<&str>) {
        let outcome = if error.is_none() { "success" } else { "failure" };
        let status = status_code.map_or_else(|| "none".to_string(), |s| s.to_string());

        counter!(
            names::WEBHOOK_DELIVERIES_TOTAL,
            labels::COMPONENT => self.component.clone(),
            labels::OUTCOME => outcome,
            labels::STATUS => status,
        )
        .increment(1);

        histogram!(
            names::WEBHOOK_DELIVERY_DURATION,
            labels::COMPONENT => self.component.clone(),
            labels::OUTCOME => outcome,
        )
        .record(duration.as_secs_f64());
    }
}

/// Subscription operation recorded in the audit trail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditOperation {
    Create,
    Update,
    Delete,
}

/// Outcome of an audited operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuditOutcome {
    Success,
    Failure(String),
}

/// One audit trail entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub operation: AuditOperation,
    pub subscription_id: String,
    pub outcome: AuditOutcome,
    pub timestamp: DateTime<Utc>,
}

impl AuditRecord {
    pub fn new(operation: AuditOperation, subscription_id: impl Into<String>, outcome: AuditOutcome) -> Self {
        Self {
            operation,
            subscription_id: subscription_id.into(),
            outcome,
            timestamp: Utc::now(),
        }
    }
}

/// Audit sink failure
#[derive(Debug, thiserror::Error)]
#[error("Audit sink error: {0}")]
pub struct AuditError(pub String);

/// Best-effort audit trail for subscription operations
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn log_subscription_operation(&self, record: &AuditRecord) -> Result<(), AuditError>;
}

/// Writes audit records to the `tracing` pipeline under the `audit` target
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn log_subscription_operation(&self, record: &AuditRecord) -> Result<(), AuditError> {
        match &record.outcome {
            AuditOutcome::Success => info!(
                target: "audit",
                operation = ?record.operation,
                subscription_id = %record.subscription_id,
                timestamp = %record.timestamp,
                "Subscription operation succeeded"
            ),
            AuditOutcome::Failure(reason) => info!(
                target: "audit",
                operation = ?record.operation,
                subscription_id = %record.subscription_id,
                timestamp = %record.timestamp,
                reason = %reason,
                "Subscription operation failed"
            ),
        }
        Ok(())
    }
}
