//! Record store for deploydash: SQLite through `rusqlite`.
//!
//! One [`Store`] wraps one connection behind a mutex and is shared as
//! `Arc<Store>` between the scheduled sync loop and manual syncs. Bulk
//! reconciliation writes each run in a single transaction.

mod actions;
mod deployments;
mod error;
mod planner;
mod repositories;
mod resources;
mod rows;
mod schema;
mod services;
mod stats;
mod transactions;

use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use rusqlite::Connection;

pub use actions::ActionFilter;
pub use error::StoreError;
pub use services::ServiceReconciliation;
pub use stats::DashboardStats;

use crate::error::io_err;

/// Shared handle to the database.
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    /// Open (creating if needed) the database at `path` and bring the schema up to date.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
            }
        }
        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |_| Ok(()))?;
        let store = Self::init(conn)?;
        tracing::debug!(path = %path.display(), "record store opened");
        Ok(store)
    }

    /// Fresh private in-memory database.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        schema::apply(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub(crate) fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }
}
