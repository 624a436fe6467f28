// Copyright (c) 2025 - Cowboy AI, Inc.
//! Subscription Gateway Service
//!
//! Polls a NetBox inventory for device changes and delivers them as webhooks
//! to one subscriber.
//!
//! Run with: cargo run --bin subscription-gateway --features netbox
//!
//! Environment:
//! 1. NETBOX_URL / NETBOX_API_TOKEN - the inventory to watch
//! 2. GATEWAY_CALLBACK_URL - where notifications are POSTed
//! 3. GATEWAY_FILTER_POOL / GATEWAY_FILTER_TYPE / GATEWAY_FILTER_RESOURCE - optional filter
//! 4. GATEWAY_POLL_INTERVAL_SECS and GATEWAY_WEBHOOK_* - engine tuning

use std::sync::Arc;

use anyhow::{Context, Result};
use infra_gateway::{
    adapters::{NetBoxConfig, NetBoxInventory},
    GatewayConfig, PollingSubscriptionService, Subscription, SubscriptionFilter,
    SubscriptionService,
};
use tracing::{info, warn};

/// Configuration for the gateway binary
#[derive(Debug, Clone)]
struct GatewaySettings {
    netbox: NetBoxConfig,
    engine: GatewayConfig,
    subscription: Subscription,
}

impl GatewaySettings {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        let netbox = NetBoxConfig {
            base_url: std::env::var("NETBOX_URL")
                .unwrap_or_else(|_| "http://localhost:8000".to_string()),
            api_token: std::env::var("NETBOX_API_TOKEN").context("NETBOX_API_TOKEN not set")?,
            ..Default::default()
        };

        let engine = GatewayConfig::from_env().context("Invalid gateway configuration")?;

        let callback_url =
            std::env::var("GATEWAY_CALLBACK_URL").context("GATEWAY_CALLBACK_URL not set")?;
        let mut subscription = Subscription::new(callback_url);
        if let Ok(consumer_id) = std::env::var("GATEWAY_CONSUMER_ID") {
            subscription = subscription.with_consumer_id(consumer_id);
        }

        let filter = SubscriptionFilter {
            resource_pool_id: std::env::var("GATEWAY_FILTER_POOL").ok(),
            resource_type_id: std::env::var("GATEWAY_FILTER_TYPE").ok(),
            resource_id: std::env::var("GATEWAY_FILTER_RESOURCE").ok(),
        };
        if !filter.is_wildcard() {
            subscription = subscription.with_filter(filter);
        }

        Ok(Self {
            netbox,
            engine,
            subscription,
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    info!("🚀 Starting Subscription Gateway");

    let settings = GatewaySettings::from_env()?;
    info!("📋 Configuration loaded:");
    info!("  - NetBox URL: {}", settings.netbox.base_url);
    info!("  - Poll interval: {:?}", settings.engine.polling.interval);
    info!("  - Callback: {}", settings.subscription.callback_url);

    let inventory = NetBoxInventory::new(settings.netbox.clone())
        .context("Failed to create NetBox client")?;
    if let Err(e) = inventory.health_check().await {
        warn!("⚠️ NetBox health check failed: {}", e);
    }

    let service = PollingSubscriptionService::for_backend(Arc::new(inventory), &settings.engine)
        .context("Failed to build subscription service")?;

    let stored = service
        .create_subscription(settings.subscription)
        .await
        .context("Failed to create subscription")?;
    info!("✅ Subscription {} polling", stored.subscription_id);

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;

    info!("🛑 Shutdown requested");
    service.shutdown().await;
    info!("👋 Subscription Gateway stopped");
    Ok(())
}
