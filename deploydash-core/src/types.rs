//! Domain types shared by the store, gateway, sync, and CLI crates.
//!
//! Identifiers are newtypes over the SQLite rowid. Closed vocabularies
//! (repository kind, action type, task status) are enums; values mirrored
//! from the VCS platform (run status) stay as strings.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

macro_rules! row_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }
    };
}

row_id!(
    /// Primary key of a tracked repository.
    RepositoryId
);
row_id!(
    /// Primary key of a microservice discovered in a monorepo.
    ServiceId
);
row_id!(
    /// Primary key of a Kubernetes resource discovered in a manifest repository.
    ResourceId
);
row_id!(ActionId);
row_id!(DeploymentId);
row_id!(ProjectId);
row_id!(TaskId);

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Unknown value for one of the closed string vocabularies below.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown {} '{}'", self.kind, self.value)
    }
}

impl std::error::Error for UnknownVariant {}

/// What a tracked repository contains, which decides how it is synced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum RepositoryKind {
    /// Application code with one directory per service.
    #[default]
    Monorepo,
    /// Kustomize overlays and plain Kubernetes manifests.
    KubernetesResources,
}

impl RepositoryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RepositoryKind::Monorepo => "monorepo",
            RepositoryKind::KubernetesResources => "kubernetes-resources",
        }
    }
}

impl fmt::Display for RepositoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RepositoryKind {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "monorepo" => Ok(Self::Monorepo),
            "kubernetes-resources" | "kubernetes" | "k8s" => Ok(Self::KubernetesResources),
            other => Err(UnknownVariant {
                kind: "repository kind",
                value: other.to_string(),
            }),
        }
    }
}

/// Classification of a workflow run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionType {
    Build,
    Deployment,
}

impl ActionType {
    /// Classify a workflow by name.
    ///
    /// `build`/`ci` wins over `deploy`/`cd`; anything else is not an action.
    pub fn classify(workflow_name: &str) -> Option<Self> {
        let name = workflow_name.to_lowercase();
        if name.contains("build") || name.contains("ci") {
            Some(Self::Build)
        } else if name.contains("deploy") || name.contains("cd") {
            Some(Self::Deployment)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::Build => "build",
            ActionType::Deployment => "deployment",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "build" => Ok(Self::Build),
            "deployment" => Ok(Self::Deployment),
            other => Err(UnknownVariant {
                kind: "action type",
                value: other.to_string(),
            }),
        }
    }
}

/// Which correlation strategy produced a deployment's commit SHA.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CommitSource {
    /// The image tag is itself a full commit SHA.
    Direct,
    /// A recent commit message on the service path mentions the tag.
    CommitMessage,
    /// A recent commit message mentions the version of a `release-<version>` tag.
    ReleaseVersion,
    /// A VCS tag with the same name points at the commit.
    VcsTag,
    /// No application commit was found; the manifest file's own commit is used.
    ManifestCommit,
    /// Nothing at all could be resolved.
    #[default]
    None,
}

impl CommitSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommitSource::Direct => "direct",
            CommitSource::CommitMessage => "commit_message",
            CommitSource::ReleaseVersion => "release_version",
            CommitSource::VcsTag => "vcs_tag",
            CommitSource::ManifestCommit => "manifest_commit",
            CommitSource::None => "none",
        }
    }

    /// True when the SHA points into the application repository.
    pub fn is_application_commit(&self) -> bool {
        matches!(
            self,
            CommitSource::Direct
                | CommitSource::CommitMessage
                | CommitSource::ReleaseVersion
                | CommitSource::VcsTag
        )
    }
}

impl fmt::Display for CommitSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CommitSource {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "direct" => Ok(Self::Direct),
            "commit_message" => Ok(Self::CommitMessage),
            "release_version" => Ok(Self::ReleaseVersion),
            "vcs_tag" => Ok(Self::VcsTag),
            "manifest_commit" => Ok(Self::ManifestCommit),
            "none" | "" => Ok(Self::None),
            other => Err(UnknownVariant {
                kind: "commit source",
                value: other.to_string(),
            }),
        }
    }
}

/// Status of a planner task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "pending" => Ok(Self::Pending),
            "in_progress" => Ok(Self::InProgress),
            "completed" | "done" => Ok(Self::Completed),
            other => Err(UnknownVariant {
                kind: "task status",
                value: other.to_string(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// A tracked repository. Identity is the URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub id: RepositoryId,
    pub name: String,
    pub url: String,
    pub kind: RepositoryKind,
    pub description: String,
    /// Directory to scan: services for a monorepo, resources for a manifest repo.
    pub scan_root: Option<String>,
    /// Fixed single-service override used when discovery finds nothing.
    pub service_name: Option<String>,
    pub service_location: Option<String>,
    pub last_sync_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Repository {
    /// The configured single-service override, when both halves are set.
    pub fn service_override(&self) -> Option<(&str, &str)> {
        match (self.service_name.as_deref(), self.service_location.as_deref()) {
            (Some(name), Some(location)) if !name.is_empty() && !location.is_empty() => {
                Some((name, location))
            }
            _ => None,
        }
    }
}

/// Fields supplied when registering a repository.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NewRepository {
    pub name: String,
    pub url: String,
    pub kind: RepositoryKind,
    pub description: String,
    pub scan_root: Option<String>,
    pub service_name: Option<String>,
    pub service_location: Option<String>,
}

/// A service directory found in a monorepo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Microservice {
    pub id: ServiceId,
    pub repository_id: RepositoryId,
    pub name: String,
    pub path: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A service as reported by discovery, before reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredService {
    pub name: String,
    pub path: String,
    pub description: String,
}

/// A plain Kubernetes manifest (Deployment, ConfigMap, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KubernetesResource {
    pub id: ResourceId,
    pub repository_id: RepositoryId,
    pub name: String,
    pub path: String,
    pub resource_kind: String,
    pub namespace: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A resource parsed from a manifest file, before reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceManifest {
    pub name: String,
    pub path: String,
    pub resource_kind: String,
    pub namespace: String,
}

/// A classified workflow run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub id: ActionId,
    pub repository_id: RepositoryId,
    pub service_id: Option<ServiceId>,
    pub resource_id: Option<ResourceId>,
    pub action_type: ActionType,
    pub status: String,
    pub workflow_run_id: i64,
    pub commit_sha: String,
    pub branch: String,
    pub build_hash: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An action ready to be written; keyed by `workflow_run_id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAction {
    pub repository_id: RepositoryId,
    pub service_id: Option<ServiceId>,
    pub resource_id: Option<ResourceId>,
    pub action_type: ActionType,
    pub status: String,
    pub workflow_run_id: i64,
    pub commit_sha: String,
    pub branch: String,
    pub build_hash: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// What is currently deployed to one (service, environment, region, namespace) target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deployment {
    pub id: DeploymentId,
    pub service_id: ServiceId,
    pub kubernetes_repo_id: RepositoryId,
    pub commit_sha: String,
    pub commit_source: CommitSource,
    pub environment: String,
    pub region: String,
    pub namespace: String,
    pub tag: String,
    pub path: String,
    pub discovered_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A deployment observation ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDeployment {
    pub service_id: ServiceId,
    pub kubernetes_repo_id: RepositoryId,
    pub commit_sha: String,
    pub commit_source: CommitSource,
    pub environment: String,
    pub region: String,
    pub namespace: String,
    pub tag: String,
    pub path: String,
}

/// A planner project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A planner task, optionally linked to a tracker ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub project_id: ProjectId,
    pub title: String,
    pub description: String,
    pub ticket_id: Option<String>,
    pub tracker_title: Option<String>,
    pub status: TaskStatus,
    pub scheduled_date: Option<NaiveDate>,
    pub deadline: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields supplied when creating a task.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NewTask {
    pub project_id: ProjectId,
    pub title: String,
    pub description: String,
    pub ticket_id: Option<String>,
    pub status: TaskStatus,
    pub scheduled_date: Option<NaiveDate>,
    pub deadline: Option<NaiveDate>,
}

impl Default for ProjectId {
    fn default() -> Self {
        Self(0)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
