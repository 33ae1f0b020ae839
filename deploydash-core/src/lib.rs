//! deploydash core library: domain types, lookup outcomes, local settings.
//!
//! - [`types`]: identifiers, enums, and record structs
//! - [`lookup`]: [`Lookup`], the found / not-applicable outcome
//! - [`settings`]: `~/.deploydash/config.yaml` load / save
//! - [`error`]: [`CoreError`]

pub mod error;
pub mod lookup;
pub mod settings;
pub mod types;

pub use error::CoreError;
pub use lookup::Lookup;
pub use settings::{Settings, TrackerAuthMethod, TrackerSettings};
pub use types::{
    Action, ActionId, ActionType, CommitSource, Deployment, DeploymentId, DiscoveredService,
    KubernetesResource, Microservice, NewAction, NewDeployment, NewRepository, NewTask, Project,
    ProjectId, Repository, RepositoryId, RepositoryKind, ResourceId, ResourceManifest, ServiceId,
    Task, TaskId, TaskStatus,
};
