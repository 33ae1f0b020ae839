//! # deploydash-sync
//!
//! Repository sync and commit correlation.
//!
//! Call [`pipeline::run`] with a [`SyncScope`] to sync one repository or all
//! of them; [`Orchestrator`] holds the per-repository state machine.

pub mod correlate;
pub mod error;
pub mod history;
pub mod matching;
pub mod orchestrator;
pub mod pipeline;
pub mod pull_requests;
pub mod report;
pub mod tracker_titles;

pub use correlate::{is_commit_sha, resolve_commit, Correlation};
pub use error::SyncError;
pub use history::{commit_deployments, CommitDeployments, TargetStatus};
pub use orchestrator::Orchestrator;
pub use pipeline::SyncScope;
pub use pull_requests::service_pull_requests;
pub use report::{RepositoryOutcome, RepositorySyncReport, SyncPassSummary};
pub use tracker_titles::{refresh_tracker_titles, TicketTitles, TitleRefresh};
