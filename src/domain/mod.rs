// Copyright (c) 2025 - Cowboy AI, Inc.
//! Gateway Domain Models
//!
//! - [`Resource`] - a backend resource in the uniform model
//! - [`Subscription`] / [`SubscriptionFilter`] - change-feed registrations
//! - [`ResourceLister`] / [`ResourceGetter`] - the backend seam consumed by
//!   the change-detection engine

pub mod resource;
pub mod subscription;

pub use resource::{BackendError, Resource, ResourceGetter, ResourceLister};
pub use subscription::{Subscription, SubscriptionFilter};
