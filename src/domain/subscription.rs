// Copyright (c) 2025 - Cowboy AI, Inc.
//! Subscription value types
//!
//! A [`Subscription`] names a callback endpoint and an optional
//! [`SubscriptionFilter`]. Records are immutable once stored: an update
//! replaces the whole record, keeping only its ID.

use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::errors::{SubscriptionError, SubscriptionResult};

/// Resource filter attached to a subscription
///
/// All matchers are ANDed together. A matcher that is `None` or empty
/// matches any value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_pool_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_type_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
}

impl SubscriptionFilter {
    /// Filter matching exactly one resource
    pub fn for_resource(resource_id: impl Into<String>) -> Self {
        Self {
            resource_id: Some(resource_id.into()),
            ..Default::default()
        }
    }

    /// Filter matching every resource in a pool
    pub fn for_pool(resource_pool_id: impl Into<String>) -> Self {
        Self {
            resource_pool_id: Some(resource_pool_id.into()),
            ..Default::default()
        }
    }

    /// Filter matching every resource of a type
    pub fn for_type(resource_type_id: impl Into<String>) -> Self {
        Self {
            resource_type_id: Some(resource_type_id.into()),
            ..Default::default()
        }
    }

    /// True when no matcher constrains anything
    pub fn is_wildcard(&self) -> bool {
        [
            &self.resource_pool_id,
            &self.resource_type_id,
            &self.resource_id,
        ]
        .iter()
        .all(|m| m.as_deref().map_or(true, str::is_empty))
    }
}

/// A change-feed subscription
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    /// Unique ID; generated by the registry when left empty
    #[serde(default)]
    pub subscription_id: String,

    /// Webhook endpoint receiving notifications
    pub callback_url: String,

    /// Opaque caller-side ID echoed back in every notification
    #[serde(default)]
    pub consumer_subscription_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<SubscriptionFilter>,
}

impl Subscription {
    /// Create a subscription with no filter and no preassigned ID
    pub fn new(callback_url: impl Into<String>) -> Self {
        Self {
            subscription_id: String::new(),
            callback_url: callback_url.into(),
            consumer_subscription_id: String::new(),
            filter: None,
        }
    }

    pub fn with_id(mut self, subscription_id: impl Into<String>) -> Self {
        self.subscription_id = subscription_id.into();
        self
    }

    pub fn with_consumer_id(mut self, consumer_subscription_id: impl Into<String>) -> Self {
        self.consumer_subscription_id = consumer_subscription_id.into();
        self
    }

    pub fn with_filter(mut self, filter: SubscriptionFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Check that the callback is a usable http(s) URL
    pub fn validate(&self) -> SubscriptionResult<()> {
        if self.callback_url.trim().is_empty() {
            return Err(SubscriptionError::InvalidArgument(
                "callback URL is required".to_string(),
            ));
        }

        let url = Url::parse(&self.callback_url).map_err(|e| {
            SubscriptionError::InvalidArgument(format!(
                "callback URL '{}' is not a valid URL: {}",
                self.callback_url, e
            ))
        })?;

        match url.scheme() {
            "http" | "https" => Ok(()),
            other => Err(SubscriptionError::InvalidArgument(format!(
                "callback URL scheme '{}' is not supported",
                other
            ))),
        }
    }
}
