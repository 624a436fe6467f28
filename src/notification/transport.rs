// Copyright (c) 2025 - Cowboy AI, Inc.
//! Webhook HTTP transport
//!
//! [`ReqwestTransport`] wraps one shared, connection-pooled
//! `reqwest::Client`. Every subscription's deliveries go through the same
//! instance. [`RecordingTransport`] captures attempts in memory instead.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::Client;
use thiserror::Error;

use crate::config::DeliveryConfig;
use crate::errors::{SubscriptionError, SubscriptionResult};

/// Failure of a single POST, before any HTTP status was received
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request failed: {0}")]
    Request(String),
}

/// Sends a JSON body to a callback URL and reports the HTTP status
#[async_trait]
pub trait WebhookTransport: Send + Sync {
    async fn post_json(&self, url: &str, body: &[u8], timeout: Duration) -> Result<u16, TransportError>;
}

/// Production transport over a pooled `reqwest::Client`
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(config: &DeliveryConfig) -> SubscriptionResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .build()
            .map_err(|e| {
                SubscriptionError::Configuration(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self { client })
    }
}

#[async_trait]
impl WebhookTransport for ReqwestTransport {
    async fn post_json(&self, url: &str, body: &[u8], timeout: Duration) -> Result<u16, TransportError> {
        let response = self
            .client
            .post(url)
            .timeout(timeout)
            .header(CONTENT_TYPE, "application/json")
            .body(body.to_vec())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TransportError::Timeout(timeout)
                } else if e.is_connect() {
                    TransportError::Connect(e.to_string())
                } else {
                    TransportError::Request(e.to_string())
                }
            })?;

        Ok(response.status().as_u16())
    }
}

/// One POST seen by a [`RecordingTransport`]
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedDelivery {
    pub url: String,
    pub payload: serde_json::Value,
}

/// Transport that records every attempt instead of sending it
///
/// Answers with a per-URL status when one is pinned, otherwise with queued
/// status codes first and then the default status.
/// Useful for testing and for dry-running a gateway without subscribers.
#[derive(Debug)]
pub struct RecordingTransport {
    deliveries: Mutex<Vec<RecordedDelivery>>,
    responses: Mutex<VecDeque<u16>>,
    pinned: Mutex<HashMap<String, u16>>,
    default_status: u16,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::with_status(200)
    }

    pub fn with_status(default_status: u16) -> Self {
        Self {
            deliveries: Mutex::new(Vec::new()),
            responses: Mutex::new(VecDeque::new()),
            pinned: Mutex::new(HashMap::new()),
            default_status,
        }
    }

    /// Queue status codes for the next attempts
    pub fn push_responses(&self, statuses: impl IntoIterator<Item = u16>) {
        self.responses
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .extend(statuses);
    }

    /// Always answer `status` for `url`
    pub fn pin_status(&self, url: impl Into<String>, status: u16) {
        self.pinned
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(url.into(), status);
    }

    pub fn deliveries(&self) -> Vec<RecordedDelivery> {
        self.deliveries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn deliveries_to(&self, url: &str) -> Vec<RecordedDelivery> {
        self.deliveries()
            .into_iter()
            .filter(|d| d.url == url)
            .collect()
    }

    pub fn delivery_count(&self) -> usize {
        self.deliveries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

impl Default for RecordingTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl WebhookTransport for RecordingTransport {
    async fn post_json(&self, url: &str, body: &[u8], _timeout: Duration) -> Result<u16, TransportError> {
        let payload = serde_json::from_slice(body).unwrap_or(serde_json::Value::Null);
        self.deliveries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(RecordedDelivery {
                url: url.to_string(),
                payload,
            });

        if let Some(status) = self
            .pinned
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(url)
        {
            return Ok(*status);
        }

        let queued = self
            .responses
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pop_front();
        Ok(queued.unwrap_or(self.default_status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_recording_transport_answers_from_queue() {
        let transport = RecordingTransport::new();
        transport.push_responses([500, 502]);

        let timeout = Duration::from_secs(1);
        assert_eq!(transport.post_json("https://cb/x", b"{}", timeout).await, Ok(500));
        assert_eq!(transport.post_json("https://cb/x", b"{}", timeout).await, Ok(502));
        assert_eq!(transport.post_json("https://cb/y", b"{}", timeout).await, Ok(200));

        assert_eq!(transport.delivery_count(), 3);
        assert_eq!(transport.deliveries_to("https://cb/y").len(), 1);
        assert_eq!(transport.deliveries()[0].payload, serde_json::json!({}));
    }

    #[tokio::test]
    async fn test_pinned_status_wins_over_queue() {
        let transport = RecordingTransport::new();
        transport.pin_status("https://down/x", 503);
        transport.push_responses([500]);

        let timeout = Duration::from_secs(1);
        assert_eq!(transport.post_json("https://down/x", b"{}", timeout).await, Ok(503));
        assert_eq!(transport.post_json("https://up/x", b"{}", timeout).await, Ok(500));
        assert_eq!(transport.post_json("https://up/x", b"{}", timeout).await, Ok(200));
    }

    #[test]
    fn test_reqwest_transport_builds() {
        assert!(ReqwestTransport::new(&DeliveryConfig::default()).is_ok());
    }
}
