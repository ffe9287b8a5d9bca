//! Scoped subscription listing.

use bellatrix_core::{
    DynSubscriptionService, OwnershipMarker, ReconcileError, ReconcileResult, Scope, Subscription,
    owned_subscriptions,
};

/// Fetches the subscriptions registered on the broker for one scope.
#[derive(Clone)]
pub struct SubscriptionLister {
    service: DynSubscriptionService,
}

impl SubscriptionLister {
    pub fn new(service: DynSubscriptionService) -> Self {
        Self { service }
    }

    /// Every subscription under `scope`, managed or not.
    pub async fn list(&self, scope: &Scope) -> ReconcileResult<Vec<Subscription>> {
        self.service
            .list(scope)
            .await
            .map_err(|e| ReconcileError::remote_query(scope, e))
    }

    /// Subscriptions under `scope` carrying `marker`.
    pub async fn list_owned(
        &self,
        scope: &Scope,
        marker: &OwnershipMarker,
    ) -> ReconcileResult<Vec<Subscription>> {
        let listed = self.list(scope).await?;
        let total = listed.len();
        let owned = owned_subscriptions(listed, marker);
        tracing::debug!(
            tenant = %scope.tenant,
            service_path = %scope.path,
            total,
            owned = owned.len(),
            "Listed subscriptions"
        );
        Ok(owned)
    }
}
