//! Reconciliation engine for NGSIv2 subscriptions.
//!
//! Converges a context broker's subscription set to a declared state:
//!
//! 1. [`PatchPlanner`] lists each declared scope, keeps the subscriptions
//!    carrying the ownership marker and diffs them by description
//! 2. [`PatchApplier`] creates the missing and deletes the stale ones
//! 3. [`HealthReconciler`] recreates owned subscriptions stuck in a failed
//!    delivery state
//!
//! [`Reconciler`] runs the three in order and stops on the first error. Every
//! run derives its view of the broker from scratch, so rerunning after a
//! failure is the recovery path.

pub mod applier;
pub mod health;
pub mod lister;
pub mod planner;
pub mod reconciler;

pub use applier::{ApplyReport, PatchApplier};
pub use health::{HealedSubscription, HealthReconciler, HealthReport, is_failed};
pub use lister::SubscriptionLister;
pub use planner::PatchPlanner;
pub use reconciler::{Reconciler, ReconcilerConfig, RunReport};
