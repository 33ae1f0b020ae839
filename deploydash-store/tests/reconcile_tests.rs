//! Reconciliation semantics of the record store: identity preservation,
//! idempotence, replace-on-conflict, and cascade delete.

use chrono::{Duration, Utc};
use deploydash_core::{
    ActionType, CommitSource, DiscoveredService, NewAction, NewDeployment, NewRepository,
    Repository, RepositoryKind, ResourceManifest,
};
use deploydash_store::{ActionFilter, ServiceReconciliation, Store};
use rstest::rstest;

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

fn repo(store: &Store, url: &str, kind: RepositoryKind) -> Repository {
    store
        .create_repository(&NewRepository {
            name: url.rsplit('/').next().unwrap_or("repo").to_string(),
            url: url.to_string(),
            kind,
            ..NewRepository::default()
        })
        .expect("create repository")
}

fn svc(name: &str, path: &str, description: &str) -> DiscoveredService {
    DiscoveredService {
        name: name.into(),
        path: path.into(),
        description: description.into(),
    }
}

fn deployment(
    service: &deploydash_core::Microservice,
    k8s: &Repository,
    env: &str,
    tag: &str,
) -> NewDeployment {
    NewDeployment {
        service_id: service.id,
        kubernetes_repo_id: k8s.id,
        commit_sha: format!("sha-{tag}"),
        commit_source: CommitSource::CommitMessage,
        environment: env.into(),
        region: "us-west-2".into(),
        namespace: "billing".into(),
        tag: tag.into(),
        path: format!("services/{}/overlays/{env}/us-west-2/billing/kustomization.yaml", service.name),
    }
}

fn run(id: i64, status: &str) -> NewAction {
    NewAction {
        repository_id: 1.into(),
        service_id: None,
        resource_id: None,
        action_type: ActionType::Build,
        status: status.into(),
        workflow_run_id: id,
        commit_sha: "abc".into(),
        branch: "main".into(),
        build_hash: None,
        started_at: Utc::now() - Duration::minutes(id),
        completed_at: None,
    }
}

// ---------------------------------------------------------------------------
// 1. Services
// ---------------------------------------------------------------------------

#[test]
fn service_reconciliation_is_idempotent() {
    let store = Store::open_in_memory().expect("open");
    let mono = repo(&store, "https://github.com/acme/shop", RepositoryKind::Monorepo);
    let discovered = vec![
        svc("payment-api", "services/payment-api", "Payments"),
        svc("checkout-web", "services/checkout-web", "Storefront"),
    ];

    let first = store
        .upsert_services_preserving_identity(mono.id, &discovered)
        .expect("first");
    assert_eq!(first.inserted, 2);
    let before = store.services_for_repository(mono.id).expect("list");

    let second = store
        .upsert_services_preserving_identity(mono.id, &discovered)
        .expect("second");
    assert_eq!(
        second,
        ServiceReconciliation {
            unchanged: 2,
            ..ServiceReconciliation::default()
        }
    );
    let after = store.services_for_repository(mono.id).expect("list");
    assert_eq!(before, after);
}

#[test]
fn matching_service_keeps_id_and_its_deployments() {
    let store = Store::open_in_memory().expect("open");
    let mono = repo(&store, "https://github.com/acme/shop", RepositoryKind::Monorepo);
    let k8s = repo(&store, "https://github.com/acme/k8s", RepositoryKind::KubernetesResources);

    store
        .upsert_services_preserving_identity(mono.id, &[svc("payment-api", "services/payment-api", "old")])
        .expect("seed");
    let original = store.services_for_repository(mono.id).expect("list").remove(0);
    store
        .upsert_deployment(&deployment(&original, &k8s, "prod", "v1"))
        .expect("deploy");

    let outcome = store
        .upsert_services_preserving_identity(
            mono.id,
            &[
                svc("payment-api", "services/payment-api", "new description"),
                svc("ledger", "services/ledger", ""),
            ],
        )
        .expect("reconcile");
    assert_eq!(outcome.updated, 1);
    assert_eq!(outcome.inserted, 1);

    let refreshed = store.service(original.id).expect("same id still present");
    assert_eq!(refreshed.description, "new description");
    assert_eq!(store.deployments_for_service(original.id).expect("deployments").len(), 1);
}

#[test]
fn vanished_service_is_deleted_and_moved_service_reinserted() {
    let store = Store::open_in_memory().expect("open");
    let mono = repo(&store, "https://github.com/acme/shop", RepositoryKind::Monorepo);
    store
        .upsert_services_preserving_identity(
            mono.id,
            &[svc("a", "services/a", ""), svc("b", "services/b", "")],
        )
        .expect("seed");

    let outcome = store
        .upsert_services_preserving_identity(mono.id, &[svc("a", "apps/a", "")])
        .expect("reconcile");
    assert_eq!(outcome.deleted, 2);
    assert_eq!(outcome.inserted, 1);

    let services = store.services_for_repository(mono.id).expect("list");
    assert_eq!(services.len(), 1);
    assert_eq!(services[0].path, "apps/a");
}

#[test]
fn duplicate_names_in_discovery_keep_first() {
    let store = Store::open_in_memory().expect("open");
    let mono = repo(&store, "https://github.com/acme/shop", RepositoryKind::Monorepo);
    store
        .upsert_services_preserving_identity(
            mono.id,
            &[svc("a", "services/a", "first"), svc("a", "legacy/a", "second")],
        )
        .expect("reconcile");
    let services = store.services_for_repository(mono.id).expect("list");
    assert_eq!(services.len(), 1);
    assert_eq!(services[0].description, "first");
}

// ---------------------------------------------------------------------------
// 2. Deployments
// ---------------------------------------------------------------------------

#[test]
fn deployment_upsert_keeps_one_row_per_target() {
    let store = Store::open_in_memory().expect("open");
    let mono = repo(&store, "https://github.com/acme/shop", RepositoryKind::Monorepo);
    let k8s = repo(&store, "https://github.com/acme/k8s", RepositoryKind::KubernetesResources);
    store
        .upsert_services_preserving_identity(mono.id, &[svc("payment-api", "services/payment-api", "")])
        .expect("seed");
    let service = store.services_for_repository(mono.id).expect("list").remove(0);

    let first = store
        .upsert_deployment(&deployment(&service, &k8s, "prod", "v1"))
        .expect("first");
    let second = store
        .upsert_deployment(&deployment(&service, &k8s, "prod", "v2"))
        .expect("second");

    assert_eq!(first.id, second.id);
    assert_eq!(first.discovered_at, second.discovered_at);
    let rows = store.deployments_for_service(service.id).expect("list");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].tag, "v2");
    assert_eq!(rows[0].commit_sha, "sha-v2");
    assert_eq!(rows[0].commit_source, CommitSource::CommitMessage);

    store
        .upsert_deployment(&deployment(&service, &k8s, "staging", "v3"))
        .expect("other target");
    assert_eq!(store.deployments_for_service(service.id).expect("list").len(), 2);
}

// ---------------------------------------------------------------------------
// 3. Actions and resources
// ---------------------------------------------------------------------------

#[test]
fn action_upsert_overwrites_status_by_run_id() {
    let store = Store::open_in_memory().expect("open");
    repo(&store, "https://github.com/acme/shop", RepositoryKind::Monorepo);

    store
        .upsert_actions(&[run(1, "in_progress"), run(2, "queued")])
        .expect("first batch");
    store
        .upsert_actions(&[run(1, "completed")])
        .expect("second batch");

    let actions = store
        .recent_actions(ActionFilter::default(), 10)
        .expect("list");
    assert_eq!(actions.len(), 2);
    let first = actions
        .iter()
        .find(|a| a.workflow_run_id == 1)
        .expect("run 1");
    assert_eq!(first.status, "completed");
    assert_eq!(actions[0].workflow_run_id, 1, "most recent start first");
}

#[test]
fn action_batch_rolls_back_as_a_whole() {
    let store = Store::open_in_memory().expect("open");
    repo(&store, "https://github.com/acme/shop", RepositoryKind::Monorepo);
    let mut orphan = run(2, "queued");
    orphan.repository_id = 999.into();

    let err = store.upsert_actions(&[run(1, "queued"), orphan]);
    assert!(err.is_err(), "foreign key violation expected");
    assert!(store
        .recent_actions(ActionFilter::default(), 10)
        .expect("list")
        .is_empty());
}

#[rstest]
#[case(vec![], 0)]
#[case(vec![("web", ""), ("web", "shop"), ("web", "shop")], 2)]
fn resources_are_replaced(#[case] entries: Vec<(&str, &str)>, #[case] expected: usize) {
    let store = Store::open_in_memory().expect("open");
    let k8s = repo(&store, "https://github.com/acme/k8s", RepositoryKind::KubernetesResources);
    store
        .replace_resources(
            k8s.id,
            &[ResourceManifest {
                name: "stale".into(),
                path: "k8s/stale.yaml".into(),
                resource_kind: "ConfigMap".into(),
                namespace: String::new(),
            }],
        )
        .expect("seed");

    let manifests: Vec<ResourceManifest> = entries
        .into_iter()
        .map(|(name, namespace)| ResourceManifest {
            name: name.into(),
            path: "k8s/web.yaml".into(),
            resource_kind: "Deployment".into(),
            namespace: namespace.into(),
        })
        .collect();
    let stored = store.replace_resources(k8s.id, &manifests).expect("replace");
    assert_eq!(stored, expected);
    assert!(store
        .resources_for_repository(k8s.id)
        .expect("list")
        .iter()
        .all(|r| r.name != "stale"));
}

// ---------------------------------------------------------------------------
// 4. Cascade
// ---------------------------------------------------------------------------

#[test]
fn deleting_repository_cascades() {
    let store = Store::open_in_memory().expect("open");
    let mono = repo(&store, "https://github.com/acme/shop", RepositoryKind::Monorepo);
    let k8s = repo(&store, "https://github.com/acme/k8s", RepositoryKind::KubernetesResources);
    store
        .upsert_services_preserving_identity(mono.id, &[svc("payment-api", "services/payment-api", "")])
        .expect("seed");
    let service = store.services_for_repository(mono.id).expect("list").remove(0);
    store
        .upsert_deployment(&deployment(&service, &k8s, "prod", "v1"))
        .expect("deploy");
    let mut action = run(7, "completed");
    action.repository_id = mono.id;
    action.service_id = Some(service.id);
    store.upsert_actions(&[action]).expect("action");

    store.delete_repository(mono.id).expect("delete");

    assert!(store.list_services().expect("services").is_empty());
    assert!(store.list_deployments().expect("deployments").is_empty());
    assert!(store
        .recent_actions(ActionFilter::default(), 10)
        .expect("actions")
        .is_empty());
    let stats = store.dashboard_stats(5).expect("stats");
    assert_eq!(stats.repositories, 1);
    assert_eq!(stats.kubernetes_repositories, 1);
}
