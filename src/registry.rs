// Copyright (c) 2025 - Cowboy AI, Inc.
//! Subscription Registry
//!
//! Thread-safe, process-lifetime store of [`Subscription`] records keyed by
//! subscription ID. Each operation holds the lock only for a single map
//! access, so readers never wait on a writer for longer than that.

use std::collections::HashMap;

use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::domain::Subscription;
use crate::errors::{SubscriptionError, SubscriptionResult};

/// Owned store of subscription records
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    subscriptions: RwLock<HashMap<String, Subscription>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a new subscription, generating an ID when none was supplied
    ///
    /// Fails with `InvalidArgument` for a missing callback URL or when the
    /// supplied ID is already taken.
    pub async fn create(&self, mut subscription: Subscription) -> SubscriptionResult<Subscription> {
        subscription.validate()?;

        if subscription.subscription_id.is_empty() {
            subscription.subscription_id = Uuid::now_v7().to_string();
        }

        let mut subscriptions = self.subscriptions.write().await;
        if subscriptions.contains_key(&subscription.subscription_id) {
            return Err(SubscriptionError::InvalidArgument(format!(
                "subscription '{}' already exists",
                subscription.subscription_id
            )));
        }
        subscriptions.insert(subscription.subscription_id.clone(), subscription.clone());

        debug!(subscription_id = %subscription.subscription_id, "Subscription stored");
        Ok(subscription)
    }

    pub async fn get(&self, subscription_id: &str) -> SubscriptionResult<Subscription> {
        self.subscriptions
            .read()
            .await
            .get(subscription_id)
            .cloned()
            .ok_or_else(|| SubscriptionError::NotFound(subscription_id.to_string()))
    }

    /// Replace a stored record wholesale, keeping only its ID
    pub async fn update(
        &self,
        subscription_id: &str,
        mut subscription: Subscription,
    ) -> SubscriptionResult<Subscription> {
        subscription.validate()?;
        subscription.subscription_id = subscription_id.to_string();

        let mut subscriptions = self.subscriptions.write().await;
        let slot = subscriptions
            .get_mut(subscription_id)
            .ok_or_else(|| SubscriptionError::NotFound(subscription_id.to_string()))?;
        *slot = subscription.clone();

        debug!(subscription_id, "Subscription replaced");
        Ok(subscription)
    }

    /// Swap in a record without validation, returning the previous one
    ///
    /// Used to roll back a failed update to the record it replaced.
    pub(crate) async fn restore(&self, subscription: Subscription) -> Option<Subscription> {
        self.subscriptions
            .write()
            .await
            .insert(subscription.subscription_id.clone(), subscription)
    }

    pub async fn delete(&self, subscription_id: &str) -> SubscriptionResult<Subscription> {
        self.subscriptions
            .write()
            .await
            .remove(subscription_id)
            .ok_or_else(|| SubscriptionError::NotFound(subscription_id.to_string()))
    }

    /// All stored subscriptions, ordered by ID
    pub async fn list(&self) -> Vec<Subscription> {
        let mut all: Vec<_> = self.subscriptions.read().await.values().cloned().collect();
        all.sort_by(|a, b| a.subscription_id.cmp(&b.subscription_id));
        all
    }

    pub async fn len(&self) -> usize {
        self.subscriptions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.subscriptions.read().await.is_empty()
    }
}
