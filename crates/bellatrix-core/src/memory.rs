//! In-memory subscription service.
//!
//! Behaves like a context broker holding subscriptions per scope, records
//! every call it receives and can be told to fail specific calls. Used to
//! exercise the reconciliation engine without a broker.

use std::collections::HashMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::ServiceError;
use crate::scope::Scope;
use crate::service::SubscriptionService;
use crate::subscription::{Subscription, SubscriptionStatus};

/// A call received by [`InMemorySubscriptionService`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceCall {
    List { scope: Scope },
    Create { scope: Scope, description: String },
    Delete { scope: Scope, id: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum FailureRule {
    List(Scope),
    Create(String),
    Delete(String),
}

#[derive(Debug, Default)]
pub struct InMemorySubscriptionService {
    scopes: RwLock<HashMap<Scope, Vec<Subscription>>>,
    calls: RwLock<Vec<ServiceCall>>,
    failures: RwLock<Vec<FailureRule>>,
}

impl InMemorySubscriptionService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a subscription directly, bypassing the call log. Returns its id.
    pub async fn insert(&self, scope: &Scope, subscription: Subscription) -> String {
        let mut stored = subscription;
        let id = stored.id.clone().unwrap_or_else(new_id);
        stored.id = Some(id.clone());
        stored.status.get_or_insert(SubscriptionStatus::Active);
        self.scopes
            .write()
            .await
            .entry(scope.clone())
            .or_default()
            .push(stored);
        id
    }

    /// Current subscriptions of a scope.
    pub async fn subscriptions(&self, scope: &Scope) -> Vec<Subscription> {
        self.scopes
            .read()
            .await
            .get(scope)
            .cloned()
            .unwrap_or_default()
    }

    /// Record a delivery outcome on a stored subscription, as the broker
    /// would after a notification attempt. Returns false when `id` is unknown.
    pub async fn set_outcome(
        &self,
        scope: &Scope,
        id: &str,
        last_failure: Option<OffsetDateTime>,
        last_success_code: Option<u16>,
    ) -> bool {
        let mut scopes = self.scopes.write().await;
        let Some(sub) = scopes
            .get_mut(scope)
            .and_then(|subs| subs.iter_mut().find(|s| s.id.as_deref() == Some(id)))
        else {
            return false;
        };
        sub.notification.last_failure = last_failure;
        sub.notification.last_success_code = last_success_code;
        if last_failure.is_some() {
            sub.status = Some(SubscriptionStatus::Failed);
        }
        true
    }

    /// Calls received so far, in order.
    pub async fn calls(&self) -> Vec<ServiceCall> {
        self.calls.read().await.clone()
    }

    pub async fn clear_calls(&self) {
        self.calls.write().await.clear();
    }

    /// Make every list of `scope` fail.
    pub async fn fail_list(&self, scope: &Scope) {
        self.failures
            .write()
            .await
            .push(FailureRule::List(scope.clone()));
    }

    /// Make every create of a subscription with `description` fail.
    pub async fn fail_create(&self, description: &str) {
        self.failures
            .write()
            .await
            .push(FailureRule::Create(description.to_string()));
    }

    /// Make every delete of `id` fail.
    pub async fn fail_delete(&self, id: &str) {
        self.failures
            .write()
            .await
            .push(FailureRule::Delete(id.to_string()));
    }

    async fn record(&self, call: ServiceCall) {
        self.calls.write().await.push(call);
    }

    async fn should_fail(&self, rule: &FailureRule) -> bool {
        self.failures.read().await.contains(rule)
    }
}

#[async_trait]
impl SubscriptionService for InMemorySubscriptionService {
    async fn list(&self, scope: &Scope) -> Result<Vec<Subscription>, ServiceError> {
        self.record(ServiceCall::List {
            scope: scope.clone(),
        })
        .await;
        if self.should_fail(&FailureRule::List(scope.clone())).await {
            return Err(ServiceError::status(500, "injected list failure"));
        }
        Ok(self.subscriptions(scope).await)
    }

    async fn create(
        &self,
        subscription: &Subscription,
        scope: &Scope,
    ) -> Result<String, ServiceError> {
        self.record(ServiceCall::Create {
            scope: scope.clone(),
            description: subscription.description.clone(),
        })
        .await;
        if self
            .should_fail(&FailureRule::Create(subscription.description.clone()))
            .await
        {
            return Err(ServiceError::status(400, "injected create failure"));
        }
        Ok(self.insert(scope, subscription.to_create_request()).await)
    }

    async fn delete(&self, id: &str, scope: &Scope) -> Result<(), ServiceError> {
        self.record(ServiceCall::Delete {
            scope: scope.clone(),
            id: id.to_string(),
        })
        .await;
        if self.should_fail(&FailureRule::Delete(id.to_string())).await {
            return Err(ServiceError::status(500, "injected delete failure"));
        }

        let mut scopes = self.scopes.write().await;
        let subs = scopes.get_mut(scope);
        let position = subs
            .as_ref()
            .and_then(|subs| subs.iter().position(|s| s.id.as_deref() == Some(id)));
        match (subs, position) {
            (Some(subs), Some(position)) => {
                subs.remove(position);
                Ok(())
            }
            _ => Err(ServiceError::status(
                404,
                "The requested subscription has not been found",
            )),
        }
    }
}

fn new_id() -> String {
    Uuid::new_v4().simple().to_string()
}
