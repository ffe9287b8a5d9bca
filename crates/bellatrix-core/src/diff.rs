//! Diff engine between declared and owned-observed subscriptions.

use std::collections::HashSet;

use serde::Serialize;

use crate::marker::OwnershipMarker;
use crate::scope::Scope;
use crate::subscription::Subscription;

/// Result of comparing one scope's declared and owned subscriptions.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SubscriptionDiff {
    pub to_add: Vec<Subscription>,
    pub to_delete: Vec<Subscription>,
}

impl SubscriptionDiff {
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_delete.is_empty()
    }

    /// Turn the diff into a patch for `scope`, or `None` when already in sync.
    pub fn into_patch(self, scope: Scope) -> Option<SubscriptionsPatch> {
        if self.is_empty() {
            return None;
        }
        Some(SubscriptionsPatch {
            scope,
            to_add: self.to_add,
            to_delete: self.to_delete,
        })
    }
}

/// Add/delete delta needed to converge one scope.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubscriptionsPatch {
    pub scope: Scope,
    pub to_add: Vec<Subscription>,
    pub to_delete: Vec<Subscription>,
}

/// Compare declared subscriptions against the owned subscriptions on the broker.
///
/// Two one-directional set differences keyed by description: a declared
/// subscription is added when no owned subscription has its description, and
/// an owned subscription is deleted when no declared subscription has its
/// description. Other fields are not compared, so a changed notification
/// target on an existing description produces no change.
///
/// Output order follows input order.
pub fn diff_subscriptions(declared: &[Subscription], owned: &[Subscription]) -> SubscriptionDiff {
    SubscriptionDiff {
        to_add: difference_by_description(declared, owned),
        to_delete: difference_by_description(owned, declared),
    }
}

/// Subscriptions from `subscriptions` whose description carries the marker.
pub fn owned_subscriptions(
    subscriptions: Vec<Subscription>,
    marker: &OwnershipMarker,
) -> Vec<Subscription> {
    subscriptions
        .into_iter()
        .filter(|sub| marker.owns(&sub.description))
        .collect()
}

fn difference_by_description(a: &[Subscription], b: &[Subscription]) -> Vec<Subscription> {
    let present: HashSet<&str> = b.iter().map(|sub| sub.description.as_str()).collect();
    a.iter()
        .filter(|sub| !present.contains(sub.description.as_str()))
        .cloned()
        .collect()
}
