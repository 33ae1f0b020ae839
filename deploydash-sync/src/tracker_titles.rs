//! Refresh cached ticket titles on planner tasks.

use deploydash_core::TaskId;
use deploydash_gateway::{GatewayError, TrackerClient};
use deploydash_store::Store;
use serde::Serialize;

use crate::error::SyncError;

/// Anything that can look up an issue title by key.
pub trait TicketTitles {
    fn issue_title(&self, key: &str) -> Result<String, GatewayError>;
}

impl TicketTitles for TrackerClient {
    fn issue_title(&self, key: &str) -> Result<String, GatewayError> {
        TrackerClient::issue_title(self, key)
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct TitleRefresh {
    pub refreshed: usize,
    pub failures: Vec<TitleFailure>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TitleFailure {
    pub task_id: TaskId,
    pub ticket_id: String,
    pub error: String,
}

/// Fetch and store the title of every task that carries a ticket id.
///
/// A failed lookup is recorded and the rest continue; only store errors
/// abort the refresh.
pub fn refresh_tracker_titles<T: TicketTitles + ?Sized>(
    store: &Store,
    tracker: &T,
) -> Result<TitleRefresh, SyncError> {
    let mut outcome = TitleRefresh::default();
    for task in store.tasks_with_tickets()? {
        let Some(ticket) = task.ticket_id.as_deref().filter(|t| !t.is_empty()) else {
            continue;
        };
        match tracker.issue_title(ticket) {
            Ok(title) => {
                store.set_tracker_title(task.id, &title)?;
                outcome.refreshed += 1;
            }
            Err(e) => {
                tracing::warn!(task = %task.id, ticket, error = %e, "ticket title lookup failed");
                outcome.failures.push(TitleFailure {
                    task_id: task.id,
                    ticket_id: ticket.to_string(),
                    error: e.to_string(),
                });
            }
        }
    }
    tracing::info!(
        refreshed = outcome.refreshed,
        failed = outcome.failures.len(),
        "ticket titles refreshed"
    );
    Ok(outcome)
}
