//! Error types for deploydash-store.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise from record store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Creating the database directory failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// SQLite reported an error; a surrounding transaction has been rolled back.
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    /// A uniqueness constraint rejected the write.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A thread panicked while holding the connection.
    #[error("database connection lock poisoned")]
    Poisoned,
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.into(),
        source,
    }
}

/// Turn a UNIQUE violation into [`StoreError::Conflict`]; pass anything else through.
pub(crate) fn conflict_or(err: rusqlite::Error, message: impl FnOnce() -> String) -> StoreError {
    match &err {
        rusqlite::Error::SqliteFailure(code, _)
            if code.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            StoreError::Conflict(message())
        }
        _ => StoreError::Sqlite(err),
    }
}
