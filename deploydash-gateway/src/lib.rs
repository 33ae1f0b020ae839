//! Remote access for deploydash.
//!
//! - [`gateway::VcsGateway`]: the VCS platform operations the sync engine needs
//! - [`github::GitHubClient`]: blocking `ureq` implementation for GitHub and GitHub Enterprise
//! - [`tracker::TrackerClient`]: issue titles from the ticket tracker
//! - [`types`]: platform records and repository URL parsing

pub mod error;
pub mod gateway;
pub mod github;
pub mod tracker;
pub mod types;

pub use error::GatewayError;
pub use gateway::{join_path, VcsGateway};
pub use github::GitHubClient;
pub use tracker::TrackerClient;
pub use types::{
    parse_repository_url, Commit, ContentEntry, EntryKind, PullRequest, PullRequestState,
    RepoCoordinates, RepositoryInfo, TagRef, Workflow, WorkflowRun,
};
