// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests for Snapshot Diffing
//!
//! Verifies the set algebra of `diff` for arbitrary pairs of snapshots: every
//! added key is created once, every removed key deleted once, every changed
//! hash updated once, and nothing else is reported.

use std::collections::{BTreeMap, BTreeSet};

use infra_gateway::change::diff;
use infra_gateway::snapshot::content_hash;
use infra_gateway::{ChangeKind, Resource, ResourceSnapshot};
use proptest::prelude::*;
use serde_json::json;

// ============================================================================
// Property Test Strategies
// ============================================================================

/// Small key space so snapshots overlap often
fn snapshot_map() -> impl Strategy<Value = BTreeMap<String, String>> {
    prop::collection::btree_map("r[0-9]{1,2}", "h[0-3]", 0..40)
}

fn snapshot(map: &BTreeMap<String, String>) -> ResourceSnapshot {
    ResourceSnapshot::from_hashes(map.iter().map(|(k, v)| (k.clone(), v.clone())))
}

fn ids_of_kind(changes: &[infra_gateway::ResourceChange], kind: ChangeKind) -> Vec<String> {
    let mut ids: Vec<String> = changes
        .iter()
        .filter(|c| c.kind == kind)
        .map(|c| c.resource_id.clone())
        .collect();
    ids.sort();
    ids
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    /// Property: keys only in the new snapshot are created exactly once
    #[test]
    fn prop_added_keys_are_created_once(old in snapshot_map(), new in snapshot_map()) {
        let changes = diff(&snapshot(&old), &snapshot(&new));

        let expected: Vec<String> = new.keys().filter(|k| !old.contains_key(*k)).cloned().collect();
        prop_assert_eq!(ids_of_kind(&changes, ChangeKind::Created), expected);
    }

    /// Property: keys only in the old snapshot are deleted exactly once
    #[test]
    fn prop_removed_keys_are_deleted_once(old in snapshot_map(), new in snapshot_map()) {
        let changes = diff(&snapshot(&old), &snapshot(&new));

        let expected: Vec<String> = old.keys().filter(|k| !new.contains_key(*k)).cloned().collect();
        prop_assert_eq!(ids_of_kind(&changes, ChangeKind::Deleted), expected);
    }

    /// Property: shared keys are updated exactly when their hash differs
    #[test]
    fn prop_changed_hashes_are_updated_once(old in snapshot_map(), new in snapshot_map()) {
        let changes = diff(&snapshot(&old), &snapshot(&new));

        let expected: Vec<String> = new
            .iter()
            .filter(|(k, h)| old.get(*k).map_or(false, |old_h| old_h != *h))
            .map(|(k, _)| k.clone())
            .collect();
        prop_assert_eq!(ids_of_kind(&changes, ChangeKind::Updated), expected);
    }

    /// Property: each resource ID appears in at most one change
    #[test]
    fn prop_one_change_per_resource(old in snapshot_map(), new in snapshot_map()) {
        let changes = diff(&snapshot(&old), &snapshot(&new));

        let unique: BTreeSet<&str> = changes.iter().map(|c| c.resource_id.as_str()).collect();
        prop_assert_eq!(unique.len(), changes.len());
    }

    /// Property: diffing a snapshot against itself reports nothing
    #[test]
    fn prop_identical_snapshots_have_no_changes(map in snapshot_map()) {
        let s = snapshot(&map);
        prop_assert!(diff(&s, &s).is_empty());
    }

    /// Property: swapping old and new swaps created and deleted
    #[test]
    fn prop_diff_is_antisymmetric(old in snapshot_map(), new in snapshot_map()) {
        let forward = diff(&snapshot(&old), &snapshot(&new));
        let backward = diff(&snapshot(&new), &snapshot(&old));

        prop_assert_eq!(
            ids_of_kind(&forward, ChangeKind::Created),
            ids_of_kind(&backward, ChangeKind::Deleted)
        );
        prop_assert_eq!(
            ids_of_kind(&forward, ChangeKind::Updated),
            ids_of_kind(&backward, ChangeKind::Updated)
        );
    }

    /// Property: the content hash ignores the order of extension keys
    #[test]
    fn prop_hash_is_key_order_independent(
        fields in prop::collection::btree_map("[a-z]{1,6}", 0i64..1000, 0..12)
    ) {
        let forward: serde_json::Map<String, serde_json::Value> =
            fields.iter().map(|(k, v)| (k.clone(), json!(v))).collect();
        let reversed: serde_json::Map<String, serde_json::Value> =
            fields.iter().rev().map(|(k, v)| (k.clone(), json!(v))).collect();

        let a = Resource::new("r1", "t1", "p1").with_extensions(serde_json::Value::Object(forward));
        let b = Resource::new("r1", "t1", "p1").with_extensions(serde_json::Value::Object(reversed));

        prop_assert_eq!(content_hash(&a).unwrap(), content_hash(&b).unwrap());
    }
}
