// Copyright (c) 2025 - Cowboy AI, Inc.
//! Resource Snapshots
//!
//! A [`ResourceSnapshot`] maps every resource ID of a backend to a content
//! hash of the resource at the moment it was listed. Snapshots are the
//! baseline the change detector diffs against; they never hold the
//! resource payload itself.
//!
//! Each entry also carries the resource's pool and type IDs so that
//! subscription filters can be evaluated without re-fetching the resource.
//! Only the hash takes part in change classification.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::domain::{Resource, ResourceLister};
use crate::errors::{SubscriptionError, SubscriptionResult};

/// One resource's fingerprint within a snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SnapshotEntry {
    /// Hex-encoded SHA-256 of the resource's canonical JSON
    pub hash: String,
    pub resource_pool_id: String,
    pub resource_type_id: String,
}

impl SnapshotEntry {
    pub fn from_resource(resource: &Resource) -> SubscriptionResult<Self> {
        Ok(Self {
            hash: content_hash(resource)?,
            resource_pool_id: resource.resource_pool_id.clone(),
            resource_type_id: resource.resource_type_id.clone(),
        })
    }
}

/// Point-in-time mapping of resource ID to content hash
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceSnapshot {
    entries: HashMap<String, SnapshotEntry>,
}

impl ResourceSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a snapshot from bare `(resource_id, hash)` pairs
    pub fn from_hashes<I, K, H>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, H)>,
        K: Into<String>,
        H: Into<String>,
    {
        let entries = pairs
            .into_iter()
            .map(|(id, hash)| {
                (
                    id.into(),
                    SnapshotEntry {
                        hash: hash.into(),
                        ..Default::default()
                    },
                )
            })
            .collect();
        Self { entries }
    }

    /// Fingerprint a list of resources
    ///
    /// When a backend lists the same ID twice the later entry wins.
    pub fn from_resources(resources: &[Resource]) -> SubscriptionResult<Self> {
        let mut entries = HashMap::with_capacity(resources.len());
        for resource in resources {
            let entry = SnapshotEntry::from_resource(resource)?;
            if entries.insert(resource.resource_id.clone(), entry).is_some() {
                warn!(resource_id = %resource.resource_id, "Backend listed resource twice");
            }
        }
        Ok(Self { entries })
    }

    pub fn insert(&mut self, resource_id: impl Into<String>, entry: SnapshotEntry) {
        self.entries.insert(resource_id.into(), entry);
    }

    pub fn get(&self, resource_id: &str) -> Option<&SnapshotEntry> {
        self.entries.get(resource_id)
    }

    pub fn contains(&self, resource_id: &str) -> bool {
        self.entries.contains_key(resource_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &SnapshotEntry)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Stable content hash of a resource
///
/// Object keys are sorted recursively before hashing, so the hash does not
/// depend on field order in the backend's response.
pub fn content_hash(resource: &Resource) -> SubscriptionResult<String> {
    let value = serde_json::to_value(resource)?;
    let canonical = serde_json::to_vec(&canonicalize(&value))?;

    let mut hasher = Sha256::new();
    hasher.update(&canonical);
    Ok(hex::encode(hasher.finalize()))
}

fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<_> = map.keys().collect();
            keys.sort();
            let sorted: Map<String, Value> = keys
                .into_iter()
                .map(|k| (k.clone(), canonicalize(&map[k])))
                .collect();
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

/// Captures snapshots from one backend
///
/// A snapshotter without a lister yields empty snapshots, which lets the
/// engine run against a backend whose client was never initialised. Every
/// listing is bounded by the snapshotter's timeout, whatever the lister does.
#[derive(Clone)]
pub struct ResourceSnapshotter {
    lister: Option<Arc<dyn ResourceLister>>,
    list_timeout: Duration,
}

const DEFAULT_LIST_TIMEOUT: Duration = Duration::from_secs(30);

impl ResourceSnapshotter {
    pub fn new(lister: Arc<dyn ResourceLister>) -> Self {
        Self {
            lister: Some(lister),
            list_timeout: DEFAULT_LIST_TIMEOUT,
        }
    }

    /// Snapshotter with no backend attached
    pub fn detached() -> Self {
        Self {
            lister: None,
            list_timeout: DEFAULT_LIST_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, list_timeout: Duration) -> Self {
        self.list_timeout = list_timeout;
        self
    }

    pub fn list_timeout(&self) -> Duration {
        self.list_timeout
    }

    pub async fn snapshot(&self) -> SubscriptionResult<ResourceSnapshot> {
        let Some(lister) = &self.lister else {
            return Ok(ResourceSnapshot::new());
        };

        let resources = tokio::time::timeout(self.list_timeout, lister.list())
            .await
            .map_err(|_| {
                SubscriptionError::SnapshotFailure(format!(
                    "backend listing timed out after {:?}",
                    self.list_timeout
                ))
            })?
            .map_err(|e| SubscriptionError::SnapshotFailure(e.to_string()))?;

        let snapshot = ResourceSnapshot::from_resources(&resources)?;
        debug!(resources = snapshot.len(), "Captured resource snapshot");
        Ok(snapshot)
    }
}
