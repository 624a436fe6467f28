// Copyright (c) 2025 - Cowboy AI, Inc.
//! Webhook Notifications
//!
//! Turns a detected [`ResourceChange`](crate::change::ResourceChange) into a
//! [`NotificationPayload`] and delivers it to the subscriber's callback URL.
//!
//! # Wire Format
//!
//! ```text
//! POST <callbackUrl>
//! Content-Type: application/json
//!
//! {
//!   "subscriptionId": "...",
//!   "consumerSubscriptionId": "...",
//!   "eventType": "ResourceCreated|ResourceUpdated|ResourceDeleted",
//!   "resource": { ... } | { "resourceId": "..." },
//!   "timestamp": "<RFC3339>"
//! }
//! ```
//!
//! # Delivery
//!
//! At-least-once, per subscriber: each attempt has its own timeout, failed
//! attempts are retried with exponential backoff, and an exhausted retry
//! budget is logged and reported without affecting other subscribers.

pub mod dispatcher;
pub mod retry;
pub mod transport;

pub use dispatcher::{DeliveryReport, NotificationDispatcher};
pub use retry::{RetryPolicy, Sleeper, TokioSleeper};
pub use transport::{
    RecordedDelivery, RecordingTransport, ReqwestTransport, TransportError, WebhookTransport,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::change::ChangeKind;

/// JSON envelope POSTed to a subscriber
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPayload {
    pub subscription_id: String,
    pub consumer_subscription_id: String,
    pub event_type: ChangeKind,
    pub resource: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

/// Minimal resource body used when the resource cannot be fetched
pub fn resource_stub(resource_id: &str) -> serde_json::Value {
    serde_json::json!({ "resourceId": resource_id })
}
