//! Per-repository and per-pass sync reports.

use std::time::Duration;

use chrono::{DateTime, Utc};
use deploydash_core::{RepositoryId, RepositoryKind};
use deploydash_store::ServiceReconciliation;
use serde::{Deserialize, Serialize};

use crate::error::SyncError;

/// What one repository sync did.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositorySyncReport {
    pub repository_id: RepositoryId,
    pub name: String,
    pub kind: RepositoryKind,
    /// Monorepos only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub services: Option<ServiceReconciliation>,
    /// Deployment rows written from overlay manifests.
    pub deployments: usize,
    /// Overlay files skipped: unrecognized layout, no tag, or no matching service.
    pub skipped_manifests: usize,
    pub resources: usize,
    pub actions: usize,
    /// Non-fatal problems (one workflow's runs unavailable, manifest walk failed).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    pub duration_ms: u64,
}

impl RepositorySyncReport {
    pub(crate) fn new(repository_id: RepositoryId, name: &str, kind: RepositoryKind) -> Self {
        Self {
            repository_id,
            name: name.to_string(),
            kind,
            services: None,
            deployments: 0,
            skipped_manifests: 0,
            resources: 0,
            actions: 0,
            warnings: Vec::new(),
            duration_ms: 0,
        }
    }

    pub(crate) fn warn(&mut self, message: String) {
        tracing::warn!(repository = %self.name, "{message}");
        self.warnings.push(message);
    }
}

/// Result of syncing one repository inside a pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepositoryOutcome {
    pub repository_id: RepositoryId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report: Option<RepositorySyncReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RepositoryOutcome {
    pub fn from_result(
        repository_id: RepositoryId,
        name: &str,
        result: Result<RepositorySyncReport, SyncError>,
    ) -> Self {
        let (report, error) = match result {
            Ok(report) => (Some(report), None),
            Err(e) => (None, Some(e.to_string())),
        };
        Self {
            repository_id,
            name: name.to_string(),
            report,
            error,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// One pass over a set of repositories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncPassSummary {
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub outcomes: Vec<RepositoryOutcome>,
}

impl SyncPassSummary {
    pub(crate) fn new(started_at: DateTime<Utc>, elapsed: Duration, outcomes: Vec<RepositoryOutcome>) -> Self {
        Self {
            started_at,
            duration_ms: elapsed.as_millis() as u64,
            outcomes,
        }
    }

    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.succeeded()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    /// First failure message, for surfacing a manual sync error.
    pub fn first_error(&self) -> Option<&str> {
        self.outcomes.iter().find_map(|o| o.error.as_deref())
    }
}
