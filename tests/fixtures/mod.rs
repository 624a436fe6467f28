// Copyright (c) 2025 - Cowboy AI, Inc.
//! Test Fixtures for infra-gateway
//!
//! Provides deterministic resources, subscriptions, and a wired service for
//! integration tests.
//!
//! # Design Principles
//! - All IDs are fixed constants so failures are reproducible
//! - Fixtures are the only place that builds the engine; tests drive it
//!   through the public service API

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use infra_gateway::adapters::InMemoryInventory;
use infra_gateway::config::{DeliveryConfig, PollingConfig};
use infra_gateway::notification::{NotificationDispatcher, RecordingTransport};
use infra_gateway::{
    PollingScheduler, PollingSubscriptionService, Resource, ResourceSnapshotter, Subscription,
};

pub const SUBSCRIPTION_ID_1: &str = "01934f4a-5001-7000-8000-000000005001";
pub const CONSUMER_ID_1: &str = "consumer-0001";

pub const CALLBACK_X: &str = "https://cb.example/x";
pub const CALLBACK_Y: &str = "https://cb.example/y";

pub const POOL_EAST: &str = "pool-east";
pub const POOL_WEST: &str = "pool-west";
pub const TYPE_SERVER: &str = "type-server";
pub const TYPE_SWITCH: &str = "type-switch";

pub const POLL_INTERVAL: Duration = Duration::from_secs(30);

/// A server in the east pool
pub fn server_fixture(resource_id: &str) -> Resource {
    Resource::new(resource_id, TYPE_SERVER, POOL_EAST)
        .with_description(format!("{}.example.com", resource_id))
        .with_extensions(json!({"status": "active", "cpu": 16}))
}

/// A switch in the west pool
pub fn switch_fixture(resource_id: &str) -> Resource {
    Resource::new(resource_id, TYPE_SWITCH, POOL_WEST)
        .with_description(format!("{}-sw", resource_id))
        .with_extensions(json!({"status": "active", "ports": 48}))
}

pub fn subscription_fixture(callback_url: &str) -> Subscription {
    Subscription::new(callback_url)
        .with_id(SUBSCRIPTION_ID_1)
        .with_consumer_id(CONSUMER_ID_1)
}

/// Engine wired to an in-memory backend and a recording transport
pub struct Gateway {
    pub inventory: Arc<InMemoryInventory>,
    pub transport: Arc<RecordingTransport>,
    pub service: PollingSubscriptionService,
}

pub fn gateway() -> Gateway {
    let inventory = Arc::new(InMemoryInventory::new());
    let transport = Arc::new(RecordingTransport::new());
    let dispatcher = NotificationDispatcher::new(transport.clone(), &DeliveryConfig::default())
        .with_getter(inventory.clone());
    let scheduler = PollingScheduler::new(
        ResourceSnapshotter::new(inventory.clone()),
        dispatcher,
        &PollingConfig {
            interval: POLL_INTERVAL,
            ..Default::default()
        },
    );

    Gateway {
        inventory,
        transport,
        service: PollingSubscriptionService::new(scheduler),
    }
}

/// Let the paused clock run just past `ticks` polling intervals
pub async fn advance_ticks(ticks: u32) {
    tokio::time::sleep(POLL_INTERVAL * ticks + Duration::from_millis(10)).await;
}
