// Copyright (c) 2025 - Cowboy AI, Inc.
//! Subscription filter evaluation
//!
//! Decides whether a detected change is relevant to a subscription. All
//! matchers are ANDed; an absent or empty matcher is a wildcard. Pool and
//! type matchers use the metadata carried on the change, so no resource is
//! fetched to evaluate a filter.

use crate::change::ResourceChange;
use crate::domain::SubscriptionFilter;

/// True when `change` passes `filter`; `None` matches everything
pub fn matches(filter: Option<&SubscriptionFilter>, change: &ResourceChange) -> bool {
    let Some(filter) = filter else {
        return true;
    };

    matcher_accepts(filter.resource_id.as_deref(), &change.resource_id)
        && matcher_accepts(filter.resource_pool_id.as_deref(), &change.resource_pool_id)
        && matcher_accepts(filter.resource_type_id.as_deref(), &change.resource_type_id)
}

fn matcher_accepts(matcher: Option<&str>, value: &str) -> bool {
    match matcher {
        None | Some("") => true,
        Some(expected) => expected == value,
    }
}
