//! Control protocol: one JSON object per line over `~/.deploydash/daemon.sock`.
//!
//! ```text
//! → {"cmd":"sync","repository":3}
//! ← {"reply":"synced","data":{"started_at":"…","duration_ms":812,"outcomes":[…]}}
//! ```

use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;
use std::path::Path;
use std::thread::sleep;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use deploydash_core::{RepositoryId, RepositoryKind};
use deploydash_sync::SyncPassSummary;
use serde::{Deserialize, Serialize};

use crate::error::{io_err, DaemonError};
use crate::paths::socket_path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "cmd", rename_all = "lowercase")]
pub enum DaemonRequest {
    Status,
    /// Queue a pass and wait for it. No repository means all of them.
    Sync {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        repository: Option<RepositoryId>,
    },
    Stop,
}

impl DaemonRequest {
    fn name(&self) -> &'static str {
        match self {
            DaemonRequest::Status => "status",
            DaemonRequest::Sync { .. } => "sync",
            DaemonRequest::Stop => "stop",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "reply", content = "data", rename_all = "lowercase")]
pub enum DaemonReply {
    Status(DaemonStatus),
    Synced(SyncPassSummary),
    Stopping,
    Error(String),
}

/// Answer to `status`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonStatus {
    pub running: bool,
    pub started_at_unix: u64,
    pub interval_secs: u64,
    /// Passes finished since start, scheduled and requested.
    pub passes: u64,
    pub last_pass: Option<PassRecord>,
    pub repositories: Vec<RepositoryStatus>,
    pub socket: String,
}

/// The most recent pass the daemon ran.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassRecord {
    /// `schedule` or `socket`.
    pub source: String,
    /// `all` or `repository <id>`.
    pub target: String,
    pub finished_at: DateTime<Utc>,
    pub succeeded: usize,
    pub failed: usize,
    pub duration_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryStatus {
    pub id: RepositoryId,
    pub name: String,
    pub kind: RepositoryKind,
    pub last_sync_at: Option<DateTime<Utc>>,
}

/// Send one request and read one reply.
pub fn send_request(home: &Path, request: &DaemonRequest) -> Result<DaemonReply, DaemonError> {
    let socket = socket_path(home);
    if !socket.exists() {
        return Err(DaemonError::DaemonNotRunning { socket });
    }

    let mut stream = UnixStream::connect(&socket).map_err(|err| {
        if matches!(
            err.kind(),
            std::io::ErrorKind::NotFound
                | std::io::ErrorKind::ConnectionRefused
                | std::io::ErrorKind::ConnectionReset
        ) {
            DaemonError::DaemonNotRunning {
                socket: socket.clone(),
            }
        } else {
            io_err(&socket, err)
        }
    })?;

    let mut line = serde_json::to_string(request)?;
    line.push('\n');
    stream
        .write_all(line.as_bytes())
        .and_then(|()| stream.flush())
        .map_err(|e| io_err(&socket, e))?;

    let mut reply = String::new();
    let read = BufReader::new(stream)
        .read_line(&mut reply)
        .map_err(|e| io_err(&socket, e))?;
    if read == 0 {
        return Err(DaemonError::Protocol(format!(
            "daemon closed the connection before answering '{}'",
            request.name()
        )));
    }
    Ok(serde_json::from_str(reply.trim_end())?)
}

pub fn request_status(home: &Path) -> Result<DaemonStatus, DaemonError> {
    match send_request(home, &DaemonRequest::Status)? {
        DaemonReply::Status(status) => Ok(status),
        other => Err(unexpected("status", other)),
    }
}

/// Poll `status` until the daemon answers or `timeout` elapses. Covers the
/// window between spawning the daemon and its socket being bound.
pub fn wait_until_running(home: &Path, timeout: Duration) -> Result<DaemonStatus, DaemonError> {
    let deadline = Instant::now() + timeout;
    loop {
        match request_status(home) {
            Err(DaemonError::DaemonNotRunning { .. }) if Instant::now() < deadline => {
                sleep(Duration::from_millis(50));
            }
            result => return result,
        }
    }
}

/// Ask for a pass now and wait for its summary.
pub fn request_sync(
    home: &Path,
    repository: Option<RepositoryId>,
) -> Result<SyncPassSummary, DaemonError> {
    match send_request(home, &DaemonRequest::Sync { repository })? {
        DaemonReply::Synced(summary) => Ok(summary),
        other => Err(unexpected("sync", other)),
    }
}

pub fn request_stop(home: &Path) -> Result<(), DaemonError> {
    match send_request(home, &DaemonRequest::Stop)? {
        DaemonReply::Stopping => Ok(()),
        other => Err(unexpected("stop", other)),
    }
}

fn unexpected(request: &str, reply: DaemonReply) -> DaemonError {
    match reply {
        DaemonReply::Error(message) => DaemonError::Rejected(message),
        other => DaemonError::Protocol(format!("unexpected reply to '{request}': {other:?}")),
    }
}
