// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests for Filter Evaluation

use infra_gateway::filter::matches;
use infra_gateway::{ChangeKind, ResourceChange, SubscriptionFilter};
use proptest::prelude::*;

fn change_kind() -> impl Strategy<Value = ChangeKind> {
    prop_oneof![
        Just(ChangeKind::Created),
        Just(ChangeKind::Updated),
        Just(ChangeKind::Deleted),
    ]
}

fn resource_change() -> impl Strategy<Value = ResourceChange> {
    (change_kind(), "r[0-9]", "p[0-2]", "t[0-2]").prop_map(|(kind, id, pool, ty)| ResourceChange {
        kind,
        resource_id: id,
        resource_pool_id: pool,
        resource_type_id: ty,
    })
}

fn matcher() -> impl Strategy<Value = Option<String>> {
    prop_oneof![Just(None), Just(Some(String::new())), "[prt][0-2]".prop_map(Some)]
}

fn filter() -> impl Strategy<Value = SubscriptionFilter> {
    (matcher(), matcher(), matcher()).prop_map(|(resource_id, resource_pool_id, resource_type_id)| {
        SubscriptionFilter {
            resource_pool_id,
            resource_type_id,
            resource_id,
        }
    })
}

fn single(matcher: &Option<String>, value: &str) -> bool {
    match matcher.as_deref() {
        None | Some("") => true,
        Some(expected) => expected == value,
    }
}

proptest! {
    /// Property: a filter is the conjunction of its individual matchers
    #[test]
    fn prop_filter_is_and_of_matchers(f in filter(), change in resource_change()) {
        let expected = single(&f.resource_id, &change.resource_id)
            && single(&f.resource_pool_id, &change.resource_pool_id)
            && single(&f.resource_type_id, &change.resource_type_id);

        prop_assert_eq!(matches(Some(&f), &change), expected);
    }

    /// Property: the outcome does not depend on the kind of change
    #[test]
    fn prop_filter_ignores_change_kind(f in filter(), change in resource_change(), kind in change_kind()) {
        let other = ResourceChange { kind, ..change.clone() };
        prop_assert_eq!(matches(Some(&f), &change), matches(Some(&f), &other));
    }

    /// Property: no filter and a wildcard filter accept every change
    #[test]
    fn prop_wildcards_accept_everything(change in resource_change()) {
        prop_assert!(matches(None, &change));
        prop_assert!(matches(Some(&SubscriptionFilter::default()), &change));
    }
}
