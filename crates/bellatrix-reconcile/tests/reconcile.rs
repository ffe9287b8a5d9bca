use std::sync::Arc;

use bellatrix_core::{
    ClientOptions, DeclaredState, DynSubscriptionService, HttpTarget, InMemorySubscriptionService,
    MutationAction, OwnershipMarker, ReconcileError, Scope, ServiceCall, Subscription,
    SubscriptionRequest, TaggedState,
};
use bellatrix_reconcile::{
    HealthReconciler, PatchApplier, Reconciler, ReconcilerConfig, SubscriptionLister,
};
use time::macros::datetime;

fn subscription(description: &str) -> Subscription {
    let mut sub = Subscription {
        description: description.to_string(),
        ..Default::default()
    };
    sub.notification.http = Some(HttpTarget::new(format!("http://receiver/{description}")));
    sub
}

fn request(scope: &Scope, descriptions: &[&str]) -> SubscriptionRequest {
    SubscriptionRequest {
        fiware_service: scope.tenant.clone(),
        service_path: scope.path.clone(),
        subscriptions: descriptions.iter().map(|d| subscription(d)).collect(),
    }
}

fn declared(requests: Vec<SubscriptionRequest>, marker: &OwnershipMarker) -> TaggedState {
    DeclaredState {
        client_options: ClientOptions {
            client_url: "http://orion:1026".to_string(),
            ..Default::default()
        },
        subscriptions_state: requests,
    }
    .tag(marker)
}

fn reconciler(service: &Arc<InMemorySubscriptionService>, dry_run: bool) -> Reconciler {
    let dyn_service: DynSubscriptionService = service.clone();
    Reconciler::new(dyn_service, ReconcilerConfig { dry_run })
}

async fn descriptions(service: &InMemorySubscriptionService, scope: &Scope) -> Vec<String> {
    let mut descriptions: Vec<String> = service
        .subscriptions(scope)
        .await
        .into_iter()
        .map(|s| s.description)
        .collect();
    descriptions.sort();
    descriptions
}

#[tokio::test]
async fn run_creates_missing_and_deletes_stale_owned_subscriptions() {
    let service = Arc::new(InMemorySubscriptionService::new());
    let scope = Scope::new("smartcity", "/parking");
    service
        .insert(&scope, subscription("BELLATRIX_MANAGED_B"))
        .await;
    let stale = service
        .insert(&scope, subscription("BELLATRIX_MANAGED_C"))
        .await;
    service.insert(&scope, subscription("hand made")).await;

    let marker = OwnershipMarker::default();
    let state = declared(vec![request(&scope, &["A", "B"])], &marker);

    let report = reconciler(&service, false).run(&state).await.unwrap();

    assert_eq!(report.patches.len(), 1);
    let applied = report.applied.unwrap();
    assert_eq!(applied.created, vec!["BELLATRIX_MANAGED_A".to_string()]);
    assert_eq!(applied.deleted, vec![stale]);
    assert_eq!(
        descriptions(&service, &scope).await,
        vec![
            "BELLATRIX_MANAGED_A".to_string(),
            "BELLATRIX_MANAGED_B".to_string(),
            "hand made".to_string(),
        ]
    );
}

#[tokio::test]
async fn second_plan_after_apply_is_empty() {
    let service = Arc::new(InMemorySubscriptionService::new());
    let scope = Scope::default();
    service
        .insert(&scope, subscription("BELLATRIX_MANAGED_old"))
        .await;

    let state = declared(
        vec![request(&scope, &["one", "two"])],
        &OwnershipMarker::default(),
    );
    let reconciler = reconciler(&service, false);

    let first = reconciler.run(&state).await.unwrap();
    assert!(!first.converged());

    let second = reconciler.plan(&state).await.unwrap();
    assert!(second.is_empty());

    let rerun = reconciler.run(&state).await.unwrap();
    assert!(rerun.converged());
    assert!(rerun.applied.unwrap().is_empty());
}

#[tokio::test]
async fn scope_in_sync_produces_no_patch_entry() {
    let service = Arc::new(InMemorySubscriptionService::new());
    let synced = Scope::new("a", "/");
    let drifted = Scope::new("b", "/");
    service
        .insert(&synced, subscription("BELLATRIX_MANAGED_x"))
        .await;

    let state = declared(
        vec![request(&synced, &["x"]), request(&drifted, &["y"])],
        &OwnershipMarker::default(),
    );

    let patches = reconciler(&service, false).plan(&state).await.unwrap();
    assert_eq!(patches.len(), 1);
    assert_eq!(patches[0].scope, drifted);
    assert_eq!(patches[0].to_add[0].description, "BELLATRIX_MANAGED_y");
}

#[tokio::test]
async fn foreign_and_other_instance_subscriptions_are_never_deleted() {
    let service = Arc::new(InMemorySubscriptionService::new());
    let scope = Scope::default();
    service.insert(&scope, subscription("manual")).await;
    service
        .insert(&scope, subscription("prod_BELLATRIX_MANAGED_x"))
        .await;
    service
        .insert(&scope, subscription("staging_BELLATRIX_MANAGED_x"))
        .await;

    // Nothing declared for the staging instance: only its own subscription goes.
    let state = declared(
        vec![request(&scope, &[])],
        &OwnershipMarker::new("staging_"),
    );
    reconciler(&service, false).run(&state).await.unwrap();

    assert_eq!(
        descriptions(&service, &scope).await,
        vec!["manual".to_string(), "prod_BELLATRIX_MANAGED_x".to_string()]
    );
}

#[tokio::test]
async fn adds_are_issued_before_deletes_within_a_patch() {
    let service = Arc::new(InMemorySubscriptionService::new());
    let scope = Scope::default();
    let stale = service
        .insert(&scope, subscription("BELLATRIX_MANAGED_stale"))
        .await;

    let state = declared(vec![request(&scope, &["fresh"])], &OwnershipMarker::default());
    reconciler(&service, false).run(&state).await.unwrap();

    let mutations: Vec<ServiceCall> = service
        .calls()
        .await
        .into_iter()
        .filter(|c| !matches!(c, ServiceCall::List { .. }))
        .collect();
    assert_eq!(
        mutations,
        vec![
            ServiceCall::Create {
                scope: scope.clone(),
                description: "BELLATRIX_MANAGED_fresh".to_string(),
            },
            ServiceCall::Delete {
                scope: scope.clone(),
                id: stale,
            },
        ]
    );
}

#[tokio::test]
async fn first_failing_create_aborts_remaining_work() {
    let service = Arc::new(InMemorySubscriptionService::new());
    let first = Scope::new("first", "/");
    let second = Scope::new("second", "/");
    let stale = service
        .insert(&first, subscription("BELLATRIX_MANAGED_stale"))
        .await;
    service.fail_create("BELLATRIX_MANAGED_a").await;

    let state = declared(
        vec![request(&first, &["a", "b"]), request(&second, &["c"])],
        &OwnershipMarker::default(),
    );
    let err = reconciler(&service, false).run(&state).await.unwrap_err();

    match err {
        ReconcileError::RemoteMutation {
            action,
            scope,
            description,
            id,
            ..
        } => {
            assert_eq!(action, MutationAction::Create);
            assert_eq!(scope, first);
            assert_eq!(description, "BELLATRIX_MANAGED_a");
            assert_eq!(id, None);
        }
        other => panic!("unexpected error: {other}"),
    }

    // Nothing after the failing create was attempted.
    let calls = service.calls().await;
    assert!(!calls.iter().any(|c| matches!(c, ServiceCall::Delete { .. })));
    assert!(!calls.iter().any(
        |c| matches!(c, ServiceCall::Create { description, .. } if description != "BELLATRIX_MANAGED_a")
    ));
    assert!(
        service
            .subscriptions(&first)
            .await
            .iter()
            .any(|s| s.id.as_deref() == Some(stale.as_str()))
    );
}

#[tokio::test]
async fn failing_delete_reports_description_and_id() {
    let service = Arc::new(InMemorySubscriptionService::new());
    let scope = Scope::default();
    let stale = service
        .insert(&scope, subscription("BELLATRIX_MANAGED_stale"))
        .await;
    service.fail_delete(&stale).await;

    let state = declared(vec![request(&scope, &[])], &OwnershipMarker::default());
    let err = reconciler(&service, false).run(&state).await.unwrap_err();

    let msg = err.to_string();
    assert!(msg.contains("BELLATRIX_MANAGED_stale"), "{msg}");
    assert!(msg.contains(&stale), "{msg}");
}

#[tokio::test]
async fn patch_without_subscription_id_cannot_be_deleted() {
    let service: DynSubscriptionService = Arc::new(InMemorySubscriptionService::new());
    let patch = bellatrix_core::SubscriptionsPatch {
        scope: Scope::default(),
        to_add: vec![],
        to_delete: vec![subscription("BELLATRIX_MANAGED_no_id")],
    };

    let err = PatchApplier::new(service).apply(&[patch]).await.unwrap_err();
    assert!(matches!(
        err,
        ReconcileError::RemoteMutation {
            action: MutationAction::Delete,
            ..
        }
    ));
}

#[tokio::test]
async fn failed_subscription_is_recreated_with_declared_definition() {
    let service = Arc::new(InMemorySubscriptionService::new());
    let scope = Scope::new("smartcity", "/");
    let mut broken = subscription("BELLATRIX_MANAGED_parking");
    broken.notification.http = Some(HttpTarget::new("http://stale-receiver"));
    let old_id = service.insert(&scope, broken).await;
    service
        .set_outcome(
            &scope,
            &old_id,
            Some(datetime!(2023-05-01 12:00:00 UTC)),
            Some(200),
        )
        .await;

    let state = declared(vec![request(&scope, &["parking"])], &OwnershipMarker::default());
    let report = reconciler(&service, false).run(&state).await.unwrap();

    // In sync by description, so no patch: only the health check acted.
    assert!(report.patches.is_empty());
    let health = report.health.unwrap();
    assert_eq!(health.checked, 1);
    assert_eq!(health.healed.len(), 1);
    assert_eq!(health.healed[0].previous_id, old_id);

    let listed = service.subscriptions(&scope).await;
    assert_eq!(listed.len(), 1);
    let recreated = &listed[0];
    assert_eq!(recreated.description, "BELLATRIX_MANAGED_parking");
    assert_ne!(recreated.id.as_deref(), Some(old_id.as_str()));
    assert_eq!(recreated.id.as_deref(), Some(health.healed[0].new_id.as_str()));
    assert_eq!(
        recreated.notification.http.as_ref().map(|h| h.url.as_str()),
        Some("http://receiver/parking")
    );
    assert!(recreated.notification.last_failure.is_none());
}

async fn failed_owned_subscription(
    service: &InMemorySubscriptionService,
    scope: &Scope,
    description: &str,
) -> String {
    let id = service.insert(scope, subscription(description)).await;
    service
        .set_outcome(scope, &id, Some(datetime!(2023-05-01 12:00:00 UTC)), None)
        .await;
    id
}

#[tokio::test]
async fn failing_delete_of_failed_subscription_keeps_it_in_place() {
    let service = Arc::new(InMemorySubscriptionService::new());
    let scope = Scope::new("smartcity", "/parking");
    let old_id = failed_owned_subscription(&service, &scope, "BELLATRIX_MANAGED_p").await;
    service.fail_delete(&old_id).await;

    let state = declared(vec![request(&scope, &["p"])], &OwnershipMarker::default());
    let err = reconciler(&service, false).run(&state).await.unwrap_err();

    match err {
        ReconcileError::RemoteMutation {
            action,
            scope: failed_scope,
            description,
            id,
            ..
        } => {
            assert_eq!(action, MutationAction::DeleteFailed);
            assert_eq!(failed_scope, scope);
            assert_eq!(description, "BELLATRIX_MANAGED_p");
            assert_eq!(id.as_deref(), Some(old_id.as_str()));
        }
        other => panic!("unexpected error: {other}"),
    }

    let listed = service.subscriptions(&scope).await;
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id.as_deref(), Some(old_id.as_str()));
    assert!(!service
        .calls()
        .await
        .iter()
        .any(|c| matches!(c, ServiceCall::Create { .. })));
}

#[tokio::test]
async fn failing_recreate_leaves_subscription_absent_until_next_run() {
    let service = Arc::new(InMemorySubscriptionService::new());
    let scope = Scope::new("smartcity", "/parking");
    let old_id = failed_owned_subscription(&service, &scope, "BELLATRIX_MANAGED_p").await;
    service.fail_create("BELLATRIX_MANAGED_p").await;

    let state = declared(vec![request(&scope, &["p"])], &OwnershipMarker::default());
    let reconciler = reconciler(&service, false);
    let err = reconciler.run(&state).await.unwrap_err();

    match &err {
        ReconcileError::RemoteMutation {
            action,
            description,
            id,
            ..
        } => {
            assert_eq!(*action, MutationAction::Recreate);
            assert_eq!(description, "BELLATRIX_MANAGED_p");
            assert_eq!(id.as_deref(), Some(old_id.as_str()));
        }
        other => panic!("unexpected error: {other}"),
    }
    let msg = err.to_string();
    assert!(msg.contains("smartcity"), "{msg}");
    assert!(msg.contains(&old_id), "{msg}");

    // Deleted but not recreated: the next plan adds it back.
    assert!(service.subscriptions(&scope).await.is_empty());
    let patches = reconciler.plan(&state).await.unwrap();
    assert_eq!(patches.len(), 1);
    assert_eq!(patches[0].to_add[0].description, "BELLATRIX_MANAGED_p");
}

#[tokio::test]
async fn not_found_success_code_is_left_alone() {
    let service = Arc::new(InMemorySubscriptionService::new());
    let scope = Scope::default();
    let id = service
        .insert(&scope, subscription("BELLATRIX_MANAGED_a"))
        .await;
    service.set_outcome(&scope, &id, None, Some(404)).await;

    let state = declared(vec![request(&scope, &["a"])], &OwnershipMarker::default());
    let report = reconciler(&service, false).run(&state).await.unwrap();

    assert!(report.converged());
    assert_eq!(service.subscriptions(&scope).await[0].id.as_deref(), Some(id.as_str()));
}

#[tokio::test]
async fn error_success_code_is_healed() {
    let service = Arc::new(InMemorySubscriptionService::new());
    let scope = Scope::default();
    let id = service
        .insert(&scope, subscription("BELLATRIX_MANAGED_a"))
        .await;
    service.set_outcome(&scope, &id, None, Some(500)).await;

    let state = declared(vec![request(&scope, &["a"])], &OwnershipMarker::default());
    let report = reconciler(&service, false).run(&state).await.unwrap();

    assert!(!report.converged());
    assert_eq!(report.health.unwrap().healed.len(), 1);
}

#[tokio::test]
async fn failed_subscription_missing_from_declared_state_is_a_mismatch() {
    let service = Arc::new(InMemorySubscriptionService::new());
    let scope = Scope::default();
    let id = service
        .insert(&scope, subscription("BELLATRIX_MANAGED_gone"))
        .await;
    service
        .set_outcome(&scope, &id, Some(datetime!(2023-05-01 12:00:00 UTC)), None)
        .await;

    let dyn_service: DynSubscriptionService = service.clone();
    let health = HealthReconciler::new(SubscriptionLister::new(dyn_service.clone()), dyn_service);
    let state = declared(vec![request(&scope, &["other"])], &OwnershipMarker::default());

    let err = health.execute(&state).await.unwrap_err();
    assert!(matches!(
        err,
        ReconcileError::StateMismatch { ref description, .. } if description == "BELLATRIX_MANAGED_gone"
    ));

    // The broker is left untouched.
    assert!(!service
        .calls()
        .await
        .iter()
        .any(|c| !matches!(c, ServiceCall::List { .. })));
    assert_eq!(service.subscriptions(&scope).await.len(), 1);
}

#[tokio::test]
async fn dry_run_plans_without_mutating() {
    let service = Arc::new(InMemorySubscriptionService::new());
    let scope = Scope::default();
    service
        .insert(&scope, subscription("BELLATRIX_MANAGED_stale"))
        .await;

    let state = declared(vec![request(&scope, &["new"])], &OwnershipMarker::default());
    let report = reconciler(&service, true).run(&state).await.unwrap();

    assert_eq!(report.patches.len(), 1);
    assert!(report.applied.is_none());
    assert!(report.health.is_none());
    assert!(service
        .calls()
        .await
        .iter()
        .all(|c| matches!(c, ServiceCall::List { .. })));
}

#[tokio::test]
async fn list_failure_aborts_before_any_mutation() {
    let service = Arc::new(InMemorySubscriptionService::new());
    let ok = Scope::new("ok", "/");
    let broken = Scope::new("broken", "/");
    service.fail_list(&broken).await;

    let state = declared(
        vec![request(&ok, &["a"]), request(&broken, &["b"])],
        &OwnershipMarker::default(),
    );
    let err = reconciler(&service, false).run(&state).await.unwrap_err();

    assert!(matches!(err, ReconcileError::RemoteQuery { ref scope, .. } if *scope == broken));
    assert!(service.subscriptions(&ok).await.is_empty());
}
