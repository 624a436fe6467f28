// Copyright (c) 2025 - Cowboy AI, Inc.
//! In-memory inventory backend
//!
//! Holds resources in a map and serves them through [`ResourceLister`] and
//! [`ResourceGetter`]. Used for degraded mode, local demos, and tests; it can
//! be switched to "unreachable" to simulate a backend outage.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;

use crate::domain::{BackendError, Resource, ResourceGetter, ResourceLister};

#[derive(Debug, Default)]
pub struct InMemoryInventory {
    resources: RwLock<BTreeMap<String, Resource>>,
    unreachable: AtomicBool,
    list_calls: AtomicUsize,
}

impl InMemoryInventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_resources(resources: impl IntoIterator<Item = Resource>) -> Self {
        let inventory = Self::new();
        for resource in resources {
            inventory.upsert(resource);
        }
        inventory
    }

    /// Insert or replace a resource
    pub fn upsert(&self, resource: Resource) {
        self.resources
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(resource.resource_id.clone(), resource);
    }

    pub fn remove(&self, resource_id: &str) -> Option<Resource> {
        self.resources
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(resource_id)
    }

    /// Make every call fail with `Unavailable` until switched back
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    /// Number of `list` calls served so far, failed ones included
    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    fn check_reachable(&self) -> Result<(), BackendError> {
        if self.unreachable.load(Ordering::SeqCst) {
            Err(BackendError::Unavailable(
                "in-memory inventory marked unreachable".to_string(),
            ))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl ResourceLister for InMemoryInventory {
    async fn list(&self) -> Result<Vec<Resource>, BackendError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.check_reachable()?;
        Ok(self
            .resources
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .values()
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ResourceGetter for InMemoryInventory {
    async fn get(&self, resource_id: &str) -> Result<Resource, BackendError> {
        self.check_reachable()?;
        self.resources
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(resource_id)
            .cloned()
            .ok_or_else(|| BackendError::NotFound(resource_id.to_string()))
    }
}
