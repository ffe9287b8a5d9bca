use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ServiceError;
use crate::scope::Scope;
use crate::subscription::Subscription;

/// Remote subscription capability of the context broker.
///
/// Every call is scoped by tenant and service path. Implementations report
/// transport and non-success responses as [`ServiceError`] and never
/// interpret notification outcomes.
#[async_trait]
pub trait SubscriptionService: Send + Sync {
    /// All subscriptions registered under `scope`. Zero subscriptions is an
    /// empty vector, not an error.
    async fn list(&self, scope: &Scope) -> Result<Vec<Subscription>, ServiceError>;

    /// Register `subscription` under `scope`, returning the new identifier.
    async fn create(&self, subscription: &Subscription, scope: &Scope)
    -> Result<String, ServiceError>;

    /// Remove the subscription with `id` from `scope`.
    async fn delete(&self, id: &str, scope: &Scope) -> Result<(), ServiceError>;
}

/// Type alias for a shareable service instance.
pub type DynSubscriptionService = Arc<dyn SubscriptionService>;
