//! Deployment history of a service, commit by commit.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use deploydash_core::{CommitSource, Deployment, ServiceId};
use deploydash_gateway::{parse_repository_url, Commit, VcsGateway};
use deploydash_store::Store;
use serde::Serialize;

use crate::correlate::COMMIT_SEARCH_LIMIT;
use crate::error::SyncError;

/// Deployment state of one commit on one target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetStatus {
    pub environment: String,
    pub region: String,
    pub namespace: String,
    pub deployed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deployed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub commit_source: Option<CommitSource>,
}

/// A recent commit of the service and where it runs.
#[derive(Debug, Clone, Serialize)]
pub struct CommitDeployments {
    pub commit: Commit,
    pub targets: Vec<TargetStatus>,
}

/// Join the service's recent commits against its deployment rows.
///
/// A commit with deployments lists exactly those targets. A commit with
/// none lists every known target of the service as not deployed.
pub fn commit_deployments<G: VcsGateway + ?Sized>(
    store: &Store,
    gateway: &G,
    service_id: ServiceId,
) -> Result<Vec<CommitDeployments>, SyncError> {
    let service = store.service(service_id)?;
    let repo = store.repository(service.repository_id)?;
    let coords = parse_repository_url(&repo.url)?;

    let commits = gateway.list_commits(&coords, &service.path, COMMIT_SEARCH_LIMIT)?;
    let deployments = store.deployments_for_service(service_id)?;
    Ok(join_history(commits, &deployments))
}

fn join_history(commits: Vec<Commit>, deployments: &[Deployment]) -> Vec<CommitDeployments> {
    let mut by_commit: HashMap<&str, Vec<&Deployment>> = HashMap::new();
    let mut targets = BTreeSet::new();
    for deployment in deployments {
        targets.insert((
            deployment.environment.as_str(),
            deployment.region.as_str(),
            deployment.namespace.as_str(),
        ));
        if !deployment.commit_sha.is_empty() {
            by_commit
                .entry(deployment.commit_sha.as_str())
                .or_default()
                .push(deployment);
        }
    }

    commits
        .into_iter()
        .map(|commit| {
            let statuses = match by_commit.get(commit.sha.as_str()) {
                Some(deployed) => deployed
                    .iter()
                    .map(|d| TargetStatus {
                        environment: d.environment.clone(),
                        region: d.region.clone(),
                        namespace: d.namespace.clone(),
                        deployed: true,
                        tag: Some(d.tag.clone()),
                        deployed_at: Some(d.updated_at),
                        commit_source: Some(d.commit_source),
                    })
                    .collect(),
                None => targets
                    .iter()
                    .map(|(environment, region, namespace)| TargetStatus {
                        environment: environment.to_string(),
                        region: region.to_string(),
                        namespace: namespace.to_string(),
                        deployed: false,
                        tag: None,
                        deployed_at: None,
                        commit_source: None,
                    })
                    .collect(),
            };
            CommitDeployments {
                commit,
                targets: statuses,
            }
        })
        .collect()
}
