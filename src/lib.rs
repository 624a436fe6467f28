// Copyright (c) 2025 - Cowboy AI, Inc.
//! Change-notification engine for infrastructure backends without native events
//!
//! This crate turns a backend that can only be listed into a subscribable
//! stream of resource changes with at-least-once webhook delivery.
//!
//! ```text
//! SubscriptionService ─▶ SubscriptionRegistry
//!         │
//!         ▼
//! PollingScheduler ─▶ Poller (one per subscription, every interval)
//!                       ├─ ResourceSnapshotter   list + hash
//!                       ├─ change::diff          Created / Updated / Deleted
//!                       ├─ filter::matches       pool / type / resource
//!                       └─ NotificationDispatcher POST with retry + backoff
//! ```
//!
//! Backends plug in through [`domain::ResourceLister`] and
//! [`domain::ResourceGetter`]; see [`adapters`].

pub mod adapters;
pub mod change;
pub mod config;
pub mod domain;
pub mod errors;
pub mod filter;
pub mod lifecycle;
pub mod notification;
pub mod registry;
pub mod scheduler;
pub mod service;
pub mod snapshot;
pub mod telemetry;

// Re-export commonly used types
pub use change::{ChangeKind, ResourceChange};
pub use config::{DeliveryConfig, GatewayConfig, PollingConfig};
pub use domain::{Resource, Subscription, SubscriptionFilter};
pub use errors::{SubscriptionError, SubscriptionResult};
pub use registry::SubscriptionRegistry;
pub use scheduler::PollingScheduler;
pub use service::{PollingSubscriptionService, SubscriptionService};
pub use snapshot::{ResourceSnapshot, ResourceSnapshotter};
