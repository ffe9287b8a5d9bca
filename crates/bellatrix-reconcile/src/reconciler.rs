//! Reconciliation run: plan, apply, heal.

use bellatrix_core::{DynSubscriptionService, ReconcileResult, SubscriptionsPatch, TaggedState};
use serde::Serialize;

use crate::applier::{ApplyReport, PatchApplier};
use crate::health::{HealthReconciler, HealthReport};
use crate::lister::SubscriptionLister;
use crate::planner::PatchPlanner;

/// Configuration for a reconciliation run.
#[derive(Debug, Clone, Default)]
pub struct ReconcilerConfig {
    /// Compute patches without applying them or checking health.
    pub dry_run: bool,
}

/// Outcome of a reconciliation run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunReport {
    pub patches: Vec<SubscriptionsPatch>,
    /// `None` in dry-run mode.
    pub applied: Option<ApplyReport>,
    /// `None` in dry-run mode.
    pub health: Option<HealthReport>,
}

impl RunReport {
    /// No patch was needed and nothing had to be healed.
    pub fn converged(&self) -> bool {
        self.patches.is_empty()
            && self
                .health
                .as_ref()
                .is_none_or(|health| health.healed.is_empty())
    }
}

/// Drives one reconciliation run against a subscription service.
///
/// Scopes are processed sequentially and every call is awaited before the
/// next one: all patches are applied before the health check starts, since
/// the health check relies on the broker reflecting the applied patches.
pub struct Reconciler {
    planner: PatchPlanner,
    applier: PatchApplier,
    health: HealthReconciler,
    config: ReconcilerConfig,
}

impl Reconciler {
    pub fn new(service: DynSubscriptionService, config: ReconcilerConfig) -> Self {
        let lister = SubscriptionLister::new(service.clone());
        Self {
            planner: PatchPlanner::new(lister.clone()),
            applier: PatchApplier::new(service.clone()),
            health: HealthReconciler::new(lister, service),
            config,
        }
    }

    /// Compute the patches without touching the broker.
    pub async fn plan(&self, state: &TaggedState) -> ReconcileResult<Vec<SubscriptionsPatch>> {
        self.planner.plan(state).await
    }

    /// Run the full reconciliation. Any error aborts the run.
    pub async fn run(&self, state: &TaggedState) -> ReconcileResult<RunReport> {
        tracing::info!(
            scopes = state.requests().len(),
            declared = state.subscription_count(),
            instance_prefix = %state.marker().instance_prefix(),
            dry_run = self.config.dry_run,
            "Starting reconciliation"
        );

        let patches = self.planner.plan(state).await?;

        if self.config.dry_run {
            tracing::info!(patches = patches.len(), "Dry run, patches not applied");
            return Ok(RunReport {
                patches,
                applied: None,
                health: None,
            });
        }

        let applied = self.applier.apply(&patches).await?;

        tracing::info!("Ensuring the subscriptions are in the active state");
        let health = self.health.execute(state).await?;

        Ok(RunReport {
            patches,
            applied: Some(applied),
            health: Some(health),
        })
    }

    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }
}
