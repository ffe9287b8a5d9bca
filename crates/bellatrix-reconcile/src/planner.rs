//! Patch planning: list, filter and diff every declared scope.

use bellatrix_core::{ReconcileResult, SubscriptionsPatch, TaggedState, diff_subscriptions};

use crate::lister::SubscriptionLister;

/// Computes the per-scope patches needed to converge the broker.
#[derive(Clone)]
pub struct PatchPlanner {
    lister: SubscriptionLister,
}

impl PatchPlanner {
    pub fn new(lister: SubscriptionLister) -> Self {
        Self { lister }
    }

    /// Patches for every declared scope that is out of sync, in declaration order.
    ///
    /// Scopes already in sync contribute no entry, so an empty result means
    /// the broker matches the declared state.
    pub async fn plan(&self, state: &TaggedState) -> ReconcileResult<Vec<SubscriptionsPatch>> {
        let mut patches = Vec::new();

        for request in state.requests() {
            let scope = request.scope();
            let owned = self.lister.list_owned(&scope, state.marker()).await?;
            let diff = diff_subscriptions(&request.subscriptions, &owned);

            tracing::debug!(
                tenant = %scope.tenant,
                service_path = %scope.path,
                subscriptions_to_add = ?descriptions(&diff.to_add),
                subscriptions_to_delete = ?descriptions(&diff.to_delete),
                "Subscriptions diff"
            );

            if let Some(patch) = diff.into_patch(scope) {
                patches.push(patch);
            }
        }

        Ok(patches)
    }
}

fn descriptions(subs: &[bellatrix_core::Subscription]) -> Vec<&str> {
    subs.iter().map(|s| s.description.as_str()).collect()
}
