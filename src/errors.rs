// Copyright (c) 2025 - Cowboy AI, Inc.
//! Error types for subscription and notification operations

use thiserror::Error;

/// Errors that can occur in subscription, polling, and delivery operations
#[derive(Debug, Error)]
pub enum SubscriptionError {
    /// Caller supplied an invalid subscription (e.g. empty callback URL)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// No subscription is registered under the given ID
    #[error("Subscription not found: {0}")]
    NotFound(String),

    /// A polling task already exists for the given subscription ID
    #[error("Polling already running for subscription: {0}")]
    AlreadyRunning(String),

    /// The backend inventory could not be listed
    #[error("Snapshot failure: {0}")]
    SnapshotFailure(String),

    /// Webhook delivery exhausted its retry budget
    #[error("Delivery failure after {attempts} attempts: {reason}")]
    DeliveryFailure { attempts: u32, reason: String },

    /// Operation was interrupted by a stop or shutdown signal
    #[error("Operation cancelled")]
    Cancelled,

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Result type for subscription operations
pub type SubscriptionResult<T> = Result<T, SubscriptionError>;

impl From<serde_json::Error> for SubscriptionError {
    fn from(err: serde_json::Error) -> Self {
        SubscriptionError::Serialization(err.to_string())
    }
}
