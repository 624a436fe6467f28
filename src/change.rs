// Copyright (c) 2025 - Cowboy AI, Inc.
//! Change Detection - pure snapshot diffing
//!
//! [`diff`] compares two [`ResourceSnapshot`]s and synthesizes the
//! create/update/delete events a backend with no native eventing never
//! emits. It is a total function: every category is computed from the same
//! pair of snapshots and it cannot fail.
//!
//! ```text
//! old ∖ new        → Deleted
//! new ∖ old        → Created
//! old ∩ new, h≠h'  → Updated
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::snapshot::{ResourceSnapshot, SnapshotEntry};

/// Kind of change detected for one resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeKind {
    #[serde(rename = "ResourceCreated")]
    Created,
    #[serde(rename = "ResourceUpdated")]
    Updated,
    #[serde(rename = "ResourceDeleted")]
    Deleted,
}

impl ChangeKind {
    /// Event type name used on the webhook wire
    pub fn event_type(&self) -> &'static str {
        match self {
            ChangeKind::Created => "ResourceCreated",
            ChangeKind::Updated => "ResourceUpdated",
            ChangeKind::Deleted => "ResourceDeleted",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.event_type())
    }
}

/// A single detected change
///
/// Payloads are not carried here; the dispatcher fetches the current
/// resource lazily for non-delete events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceChange {
    pub kind: ChangeKind,
    pub resource_id: String,
    pub resource_pool_id: String,
    pub resource_type_id: String,
}

impl ResourceChange {
    fn from_entry(kind: ChangeKind, resource_id: &str, entry: &SnapshotEntry) -> Self {
        Self {
            kind,
            resource_id: resource_id.to_string(),
            resource_pool_id: entry.resource_pool_id.clone(),
            resource_type_id: entry.resource_type_id.clone(),
        }
    }

    /// Bare change with no pool/type metadata
    pub fn new(kind: ChangeKind, resource_id: impl Into<String>) -> Self {
        Self {
            kind,
            resource_id: resource_id.into(),
            resource_pool_id: String::new(),
            resource_type_id: String::new(),
        }
    }
}

/// Diff two snapshots into created, updated, and deleted changes
///
/// Created and updated changes take pool/type metadata from `new`, deleted
/// changes from `old`. No ordering across the result is guaranteed.
pub fn diff(old: &ResourceSnapshot, new: &ResourceSnapshot) -> Vec<ResourceChange> {
    let mut changes = Vec::new();

    for (id, entry) in new.iter() {
        match old.get(id) {
            None => changes.push(ResourceChange::from_entry(ChangeKind::Created, id, entry)),
            Some(previous) if previous.hash != entry.hash => {
                changes.push(ResourceChange::from_entry(ChangeKind::Updated, id, entry))
            }
            Some(_) => {}
        }
    }

    for (id, entry) in old.iter() {
        if !new.contains(id) {
            changes.push(ResourceChange::from_entry(ChangeKind::Deleted, id, entry));
        }
    }

    changes
}
