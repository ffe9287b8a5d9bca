//! Patch application against the broker.

use bellatrix_core::{
    DynSubscriptionService, MutationAction, ReconcileError, ReconcileResult, Scope, ServiceError,
    Subscription, SubscriptionsPatch,
};
use serde::Serialize;

/// What a successful apply pass changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApplyReport {
    /// Descriptions of the created subscriptions.
    pub created: Vec<String>,
    /// Identifiers of the deleted subscriptions.
    pub deleted: Vec<String>,
}

impl ApplyReport {
    pub fn is_empty(&self) -> bool {
        self.created.is_empty() && self.deleted.is_empty()
    }
}

/// Issues the create and delete calls of a patch list.
#[derive(Clone)]
pub struct PatchApplier {
    service: DynSubscriptionService,
}

impl PatchApplier {
    pub fn new(service: DynSubscriptionService) -> Self {
        Self { service }
    }

    /// Apply patches in order: for each, every add then every delete.
    ///
    /// The first failing call aborts the pass. Nothing is rolled back and no
    /// later subscription or patch is attempted; the next run picks up where
    /// this one stopped.
    pub async fn apply(&self, patches: &[SubscriptionsPatch]) -> ReconcileResult<ApplyReport> {
        let mut report = ApplyReport::default();

        if patches.is_empty() {
            tracing::info!("Subscriptions state in sync. No changes needed.");
            return Ok(report);
        }

        for patch in patches {
            self.apply_add(&patch.to_add, &patch.scope, &mut report)
                .await?;
            self.apply_delete(&patch.to_delete, &patch.scope, &mut report)
                .await?;
        }

        tracing::info!(
            created = report.created.len(),
            deleted = report.deleted.len(),
            "Subscription patches applied"
        );

        Ok(report)
    }

    async fn apply_add(
        &self,
        subs: &[Subscription],
        scope: &Scope,
        report: &mut ApplyReport,
    ) -> ReconcileResult<()> {
        for sub in subs {
            tracing::info!(
                subscription_description = %sub.description,
                tenant = %scope.tenant,
                service_path = %scope.path,
                "Add patch, adding subscription"
            );
            let id = self
                .service
                .create(&sub.to_create_request(), scope)
                .await
                .map_err(|e| {
                    ReconcileError::remote_mutation(
                        MutationAction::Create,
                        scope,
                        &sub.description,
                        None,
                        e,
                    )
                })?;
            tracing::debug!(subscription_id = %id, "Subscription created");
            report.created.push(sub.description.clone());
        }
        Ok(())
    }

    async fn apply_delete(
        &self,
        subs: &[Subscription],
        scope: &Scope,
        report: &mut ApplyReport,
    ) -> ReconcileResult<()> {
        for sub in subs {
            let id = sub.id.as_deref().ok_or_else(|| {
                ReconcileError::remote_mutation(
                    MutationAction::Delete,
                    scope,
                    &sub.description,
                    None,
                    ServiceError::MissingId,
                )
            })?;
            tracing::info!(
                subscription_id = %id,
                subscription_description = %sub.description,
                tenant = %scope.tenant,
                service_path = %scope.path,
                "Delete patch, deleting subscription"
            );
            self.service.delete(id, scope).await.map_err(|e| {
                ReconcileError::remote_mutation(
                    MutationAction::Delete,
                    scope,
                    &sub.description,
                    Some(id),
                    e,
                )
            })?;
            report.deleted.push(id.to_string());
        }
        Ok(())
    }
}
