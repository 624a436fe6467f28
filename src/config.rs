// Copyright (c) 2025 - Cowboy AI, Inc.
//! Gateway configuration
//!
//! Defaults match the engine's documented behavior: 30s polling, 10s
//! per-attempt webhook timeout, 3 retries with 2s/4s/8s backoff.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{SubscriptionError, SubscriptionResult};
use crate::notification::RetryPolicy;

/// Polling scheduler settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollingConfig {
    /// Interval between ticks of one subscription
    #[serde(default = "default_poll_interval")]
    pub interval: Duration,

    /// Deadline for one backend listing
    #[serde(default = "default_snapshot_timeout")]
    pub snapshot_timeout: Duration,
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(30)
}

fn default_snapshot_timeout() -> Duration {
    Duration::from_secs(30)
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval: default_poll_interval(),
            snapshot_timeout: default_snapshot_timeout(),
        }
    }
}

/// Webhook delivery settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryConfig {
    /// Timeout of one delivery attempt
    #[serde(default = "default_request_timeout")]
    pub request_timeout: Duration,

    /// Retries after the first attempt
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay before the first retry
    #[serde(default = "default_initial_backoff")]
    pub initial_backoff: Duration,

    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    #[serde(default = "default_max_backoff")]
    pub max_backoff: Duration,

    /// Idle connections kept per callback host in the shared client
    #[serde(default = "default_pool_max_idle_per_host")]
    pub pool_max_idle_per_host: usize,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_max_retries() -> u32 {
    3
}

fn default_initial_backoff() -> Duration {
    Duration::from_secs(2)
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_max_backoff() -> Duration {
    Duration::from_secs(60)
}

fn default_pool_max_idle_per_host() -> usize {
    10
}

fn default_user_agent() -> String {
    concat!("infra-gateway/", env!("CARGO_PKG_VERSION")).to_string()
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            request_timeout: default_request_timeout(),
            max_retries: default_max_retries(),
            initial_backoff: default_initial_backoff(),
            backoff_multiplier: default_backoff_multiplier(),
            max_backoff: default_max_backoff(),
            pool_max_idle_per_host: default_pool_max_idle_per_host(),
            user_agent: default_user_agent(),
        }
    }
}

impl DeliveryConfig {
    /// Retry schedule derived from this configuration
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            initial_delay: self.initial_backoff,
            max_delay: self.max_backoff,
            multiplier: self.backoff_multiplier,
        }
    }
}

/// Top-level configuration of the change-notification engine
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default)]
    pub polling: PollingConfig,

    #[serde(default)]
    pub delivery: DeliveryConfig,
}

impl GatewayConfig {
    /// Load configuration from environment variables
    ///
    /// Unset variables keep their defaults; set but unparsable ones are
    /// rejected.
    pub fn from_env() -> SubscriptionResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> SubscriptionResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(secs) = parse_var::<u64, _>(&lookup, "GATEWAY_POLL_INTERVAL_SECS")? {
            if secs == 0 {
                return Err(SubscriptionError::Configuration(
                    "GATEWAY_POLL_INTERVAL_SECS must be greater than zero".to_string(),
                ));
            }
            config.polling.interval = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_var::<u64, _>(&lookup, "GATEWAY_SNAPSHOT_TIMEOUT_SECS")? {
            if secs == 0 {
                return Err(SubscriptionError::Configuration(
                    "GATEWAY_SNAPSHOT_TIMEOUT_SECS must be greater than zero".to_string(),
                ));
            }
            config.polling.snapshot_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_var::<u64, _>(&lookup, "GATEWAY_WEBHOOK_TIMEOUT_SECS")? {
            config.delivery.request_timeout = Duration::from_secs(secs);
        }
        if let Some(retries) = parse_var::<u32, _>(&lookup, "GATEWAY_WEBHOOK_MAX_RETRIES")? {
            config.delivery.max_retries = retries;
        }
        if let Some(ms) = parse_var::<u64, _>(&lookup, "GATEWAY_WEBHOOK_INITIAL_BACKOFF_MS")? {
            config.delivery.initial_backoff = Duration::from_millis(ms);
        }

        Ok(config)
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> SubscriptionResult<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw.trim().parse().map(Some).map_err(|e| {
            SubscriptionError::Configuration(format!("{}='{}': {}", key, raw, e))
        }),
    }
}
