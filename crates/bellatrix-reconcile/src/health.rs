//! Self-healing of subscriptions in failed delivery state.
//!
//! The broker keeps a failed subscription registered, so the ordinary diff
//! never notices it. After patches are applied, every owned subscription is
//! checked and failed ones are deleted and recreated from their declared
//! definition. Delete and create are two calls: a crash between them leaves
//! the subscription absent, and the next run's diff adds it back.

use bellatrix_core::{
    DynSubscriptionService, MutationAction, ReconcileError, ReconcileResult, Scope, ServiceError,
    Subscription, SubscriptionRequest, TaggedState,
};
use serde::Serialize;

use crate::lister::SubscriptionLister;

/// Whether the broker recorded a failed delivery for `subscription`.
///
/// See [`NotificationOutcome::is_failed`](bellatrix_core::NotificationOutcome::is_failed).
pub fn is_failed(subscription: &Subscription) -> bool {
    subscription.outcome().is_failed()
}

/// A failed subscription that was replaced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealedSubscription {
    pub scope: Scope,
    pub description: String,
    pub previous_id: String,
    pub new_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    /// Owned subscriptions inspected.
    pub checked: usize,
    pub healed: Vec<HealedSubscription>,
}

/// Recreates owned subscriptions the broker reports as failing.
#[derive(Clone)]
pub struct HealthReconciler {
    lister: SubscriptionLister,
    service: DynSubscriptionService,
}

impl HealthReconciler {
    pub fn new(lister: SubscriptionLister, service: DynSubscriptionService) -> Self {
        Self { lister, service }
    }

    /// Check every declared scope and heal its failed subscriptions.
    ///
    /// A failed subscription without a declared counterpart aborts the run
    /// with [`ReconcileError::StateMismatch`] before anything is deleted.
    pub async fn execute(&self, state: &TaggedState) -> ReconcileResult<HealthReport> {
        let mut report = HealthReport::default();

        for request in state.requests() {
            let scope = request.scope();
            let owned = self.lister.list_owned(&scope, state.marker()).await?;
            report.checked += owned.len();

            for sub in owned.iter().filter(|sub| is_failed(sub)) {
                let healed = self.heal(request, &scope, sub).await?;
                report.healed.push(healed);
            }
        }

        tracing::info!(
            checked = report.checked,
            healed = report.healed.len(),
            "Subscription health check complete"
        );

        Ok(report)
    }

    async fn heal(
        &self,
        request: &SubscriptionRequest,
        scope: &Scope,
        failed: &Subscription,
    ) -> ReconcileResult<HealedSubscription> {
        let outcome = failed.outcome();
        let Some(id) = failed.id.as_deref() else {
            return Err(ReconcileError::remote_mutation(
                MutationAction::DeleteFailed,
                scope,
                &failed.description,
                None,
                ServiceError::MissingId,
            ));
        };

        tracing::warn!(
            subscription_id = %id,
            subscription_description = %failed.description,
            failure_date = ?outcome.last_failure,
            failure_reason = ?outcome.last_failure_reason,
            last_success_code = ?outcome.last_success_code,
            "Subscription is in failed state, need to recreate."
        );

        let declared = request
            .find(&failed.description)
            .ok_or_else(|| ReconcileError::state_mismatch(scope, id, &failed.description))?;

        self.service.delete(id, scope).await.map_err(|e| {
            ReconcileError::remote_mutation(
                MutationAction::DeleteFailed,
                scope,
                &failed.description,
                Some(id),
                e,
            )
        })?;
        tracing::info!(subscription_id = %id, "Deleted failed subscription");

        let new_id = self
            .service
            .create(&declared.to_create_request(), scope)
            .await
            .map_err(|e| {
                ReconcileError::remote_mutation(
                    MutationAction::Recreate,
                    scope,
                    &failed.description,
                    Some(id),
                    e,
                )
            })?;
        tracing::info!(
            subscription_description = %failed.description,
            previous_id = %id,
            new_id = %new_id,
            "Recreated failed subscription"
        );

        Ok(HealedSubscription {
            scope: scope.clone(),
            description: failed.description.clone(),
            previous_id: id.to_string(),
            new_id,
        })
    }
}
