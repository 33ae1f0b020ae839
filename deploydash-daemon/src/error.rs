use std::path::PathBuf;

use thiserror::Error;

/// Error surface for daemon runtime and protocol.
#[derive(Debug, Error)]
pub enum DaemonError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("settings error: {0}")]
    Settings(#[from] deploydash_core::CoreError),

    #[error("store error: {0}")]
    Store(#[from] deploydash_store::StoreError),

    #[error("sync error: {0}")]
    Sync(#[from] deploydash_sync::SyncError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("channel closed: {0}")]
    ChannelClosed(&'static str),

    #[error("daemon protocol error: {0}")]
    Protocol(String),

    /// The daemon answered with an error, e.g. an unknown repository.
    #[error("daemon rejected request: {0}")]
    Rejected(String),

    #[error("daemon is not running (socket missing: {socket})")]
    DaemonNotRunning { socket: PathBuf },
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> DaemonError {
    DaemonError::Io {
        path: path.into(),
        source,
    }
}
