use std::fs;
use std::io::ErrorKind;
use std::os::unix::net::UnixStream as StdUnixStream;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use chrono::Utc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::unix::OwnedWriteHalf;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{broadcast, mpsc, oneshot, RwLock};
use tokio::time::MissedTickBehavior;

use deploydash_core::{settings, RepositoryId};
use deploydash_gateway::{GitHubClient, VcsGateway};
use deploydash_store::Store;
use deploydash_sync::pipeline::{self, SyncScope};
use deploydash_sync::SyncPassSummary;

use crate::error::{io_err, DaemonError};
use crate::paths::socket_path;
use crate::protocol::{DaemonReply, DaemonRequest, DaemonStatus, PassRecord, RepositoryStatus};

/// Builds the gateway for one pass. Called per pass so that edited
/// settings (a new token, another API host) apply without a restart.
pub type GatewayFactory =
    Arc<dyn Fn() -> Result<Box<dyn VcsGateway>, DaemonError> + Send + Sync>;

/// Everything the daemon tasks share.
pub struct DaemonContext {
    pub home: PathBuf,
    pub store: Arc<Store>,
    pub gateway: GatewayFactory,
    pub interval: Duration,
}

struct SyncJob {
    scope: SyncScope,
    source: &'static str,
    respond_to: oneshot::Sender<Result<SyncPassSummary, String>>,
}

#[derive(Debug, Default)]
struct DaemonState {
    passes: u64,
    last_pass: Option<PassRecord>,
}

/// Gateway factory reading `config.yaml` under `home` on every pass.
pub fn settings_gateway(home: PathBuf) -> GatewayFactory {
    Arc::new(move || {
        let settings = settings::load_at(&home)?;
        Ok(Box::new(GitHubClient::from_settings(&settings)) as Box<dyn VcsGateway>)
    })
}

/// Start the daemon runtime and block the current thread until it exits.
pub fn start_blocking(home: &Path, log_json: bool) -> Result<(), DaemonError> {
    init_tracing(log_json);

    let settings = settings::load_at(home)?;
    let db_path = settings::database_path_at(home);
    let store = Arc::new(Store::open(&db_path)?);
    let context = DaemonContext {
        home: home.to_path_buf(),
        store,
        gateway: settings_gateway(home.to_path_buf()),
        interval: Duration::from_secs(settings.sync_interval_secs.max(1)),
    };
    tracing::info!(
        db = %db_path.display(),
        interval_secs = context.interval.as_secs(),
        "starting deploydash daemon"
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| io_err("tokio-runtime", e))?;
    runtime.block_on(run(context))
}

/// Run the daemon runtime.
pub async fn run(context: DaemonContext) -> Result<(), DaemonError> {
    let context = Arc::new(context);
    let state = Arc::new(RwLock::new(DaemonState::default()));
    let started_at_unix = unix_seconds_now();

    let (sync_tx, sync_rx) = mpsc::channel::<SyncJob>(64);
    let (shutdown_tx, _) = broadcast::channel::<()>(16);

    let processor_handle = {
        let shutdown = shutdown_tx.clone();
        let context = context.clone();
        let state = state.clone();
        tokio::spawn(async move {
            let result = sync_processor_task(context, state, sync_rx, shutdown.subscribe()).await;
            let _ = shutdown.send(());
            result
        })
    };

    let scheduler_handle = {
        let shutdown = shutdown_tx.clone();
        let sync_tx = sync_tx.clone();
        let interval = context.interval;
        tokio::spawn(async move {
            let result = scheduler_task(interval, sync_tx, shutdown.subscribe()).await;
            let _ = shutdown.send(());
            result
        })
    };

    let socket_handle = {
        let shutdown = shutdown_tx.clone();
        let context = context.clone();
        let state = state.clone();
        let sync_tx = sync_tx.clone();
        tokio::spawn(async move {
            let result = socket_server_task(
                context,
                state,
                sync_tx,
                shutdown.clone(),
                shutdown.subscribe(),
                started_at_unix,
            )
            .await;
            let _ = shutdown.send(());
            result
        })
    };

    let signal_handle = {
        let shutdown = shutdown_tx.clone();
        tokio::spawn(async move {
            let mut shutdown_rx = shutdown.subscribe();
            tokio::select! {
                _ = shutdown_rx.recv() => Ok(()),
                signal = tokio::signal::ctrl_c() => {
                    match signal {
                        Ok(()) => {
                            tracing::info!("received ctrl-c, shutting down daemon");
                            let _ = shutdown.send(());
                            Ok(())
                        }
                        Err(err) => Err(DaemonError::Protocol(format!("ctrl-c handler failed: {err}"))),
                    }
                }
            }
        })
    };

    drop(sync_tx);

    let (processor_result, scheduler_result, socket_result, signal_result) = tokio::join!(
        processor_handle,
        scheduler_handle,
        socket_handle,
        signal_handle
    );

    handle_join("sync_processor", processor_result)?;
    handle_join("scheduler", scheduler_result)?;
    handle_join("socket_server", socket_result)?;
    handle_join("signal_handler", signal_result)?;
    tracing::info!("daemon stopped");
    Ok(())
}

/// Queue a full pass on every tick. The next tick waits for the queued pass
/// to finish, so scheduled passes never overlap; ticks missed meanwhile are
/// skipped.
async fn scheduler_task(
    period: Duration,
    sync_tx: mpsc::Sender<SyncJob>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), DaemonError> {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            _ = interval.tick() => {
                match enqueue_sync(&sync_tx, SyncScope::All, "schedule").await {
                    Ok(summary) => {
                        tracing::info!(
                            succeeded = summary.succeeded(),
                            failed = summary.failed(),
                            duration_ms = summary.duration_ms,
                            "scheduled sync completed",
                        );
                    }
                    Err(DaemonError::ChannelClosed(_)) => break,
                    Err(err) => {
                        tracing::error!(error = %err, "scheduled sync failed");
                    }
                }
            }
        }
    }

    Ok(())
}

/// Run queued passes one at a time on the blocking pool. A pass that has
/// started always runs to completion, even when shutdown is requested.
async fn sync_processor_task(
    context: Arc<DaemonContext>,
    state: Arc<RwLock<DaemonState>>,
    mut sync_rx: mpsc::Receiver<SyncJob>,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), DaemonError> {
    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            maybe_job = sync_rx.recv() => {
                let Some(job) = maybe_job else { break };

                let scope = job.scope;
                let ctx = context.clone();
                let sync_result = tokio::task::spawn_blocking(move || {
                    let gateway = (ctx.gateway)()?;
                    pipeline::run(Arc::clone(&ctx.store), gateway, scope).map_err(DaemonError::from)
                })
                .await
                .map_err(|err| DaemonError::Protocol(format!("sync task join error: {err}")))?;

                let record = pass_record(job.source, scope, &sync_result);
                {
                    let mut guard = state.write().await;
                    guard.passes += 1;
                    guard.last_pass = Some(record);
                }

                let _ = job.respond_to.send(sync_result.map_err(|err| err.to_string()));
            }
        }
    }

    Ok(())
}

async fn socket_server_task(
    context: Arc<DaemonContext>,
    state: Arc<RwLock<DaemonState>>,
    sync_tx: mpsc::Sender<SyncJob>,
    shutdown_tx: broadcast::Sender<()>,
    mut shutdown_rx: broadcast::Receiver<()>,
    started_at_unix: u64,
) -> Result<(), DaemonError> {
    let socket = socket_path(&context.home);
    if let Some(parent) = socket.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
        }
    }
    prepare_socket_for_bind(&socket)?;

    let listener = UnixListener::bind(&socket).map_err(|e| io_err(&socket, e))?;
    set_socket_permissions(&socket)?;
    tracing::info!(socket = %socket.display(), "listening");

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => break,
            accepted = listener.accept() => {
                let (stream, _) = accepted.map_err(|e| io_err(&socket, e))?;
                let context = context.clone();
                let state = state.clone();
                let sync_tx = sync_tx.clone();
                let shutdown_tx = shutdown_tx.clone();
                tokio::spawn(async move {
                    if let Err(err) = handle_socket_client(
                        stream,
                        context,
                        state,
                        sync_tx,
                        shutdown_tx,
                        started_at_unix,
                    ).await {
                        tracing::error!(error = %err, "socket client error");
                    }
                });
            }
        }
    }

    if socket.exists() {
        let _ = fs::remove_file(&socket);
    }
    Ok(())
}

async fn handle_socket_client(
    stream: UnixStream,
    context: Arc<DaemonContext>,
    state: Arc<RwLock<DaemonState>>,
    sync_tx: mpsc::Sender<SyncJob>,
    shutdown_tx: broadcast::Sender<()>,
    started_at_unix: u64,
) -> Result<(), DaemonError> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|e| io_err("daemon socket read", e))?
    {
        if line.trim().is_empty() {
            continue;
        }

        let request: DaemonRequest = match serde_json::from_str(&line) {
            Ok(request) => request,
            Err(err) => {
                write_response(&mut writer, &DaemonReply::Error(format!("invalid request: {err}")))
                    .await?;
                continue;
            }
        };

        let reply = match &request {
            DaemonRequest::Status => match build_status(&context, &state, started_at_unix).await {
                Ok(status) => DaemonReply::Status(status),
                Err(err) => DaemonReply::Error(err.to_string()),
            },
            DaemonRequest::Sync { repository } => {
                let scope = match repository {
                    Some(id) => SyncScope::Repository(*id),
                    None => SyncScope::All,
                };
                match enqueue_sync(&sync_tx, scope, "socket").await {
                    Ok(summary) => DaemonReply::Synced(summary),
                    Err(DaemonError::Protocol(message)) => DaemonReply::Error(message),
                    Err(err) => DaemonReply::Error(err.to_string()),
                }
            }
            DaemonRequest::Stop => {
                let _ = shutdown_tx.send(());
                DaemonReply::Stopping
            }
        };

        write_response(&mut writer, &reply).await?;
        if request == DaemonRequest::Stop {
            break;
        }
    }

    Ok(())
}

async fn build_status(
    context: &Arc<DaemonContext>,
    state: &Arc<RwLock<DaemonState>>,
    started_at_unix: u64,
) -> Result<DaemonStatus, DaemonError> {
    let (passes, last_pass) = {
        let guard = state.read().await;
        (guard.passes, guard.last_pass.clone())
    };

    let store = Arc::clone(&context.store);
    let repositories = tokio::task::spawn_blocking(move || store.list_repositories())
        .await
        .map_err(|err| DaemonError::Protocol(format!("status join error: {err}")))??;

    Ok(DaemonStatus {
        running: true,
        started_at_unix,
        interval_secs: context.interval.as_secs(),
        passes,
        last_pass,
        repositories: repositories
            .into_iter()
            .map(|repo| RepositoryStatus {
                id: repo.id,
                name: repo.name,
                kind: repo.kind,
                last_sync_at: repo.last_sync_at,
            })
            .collect(),
        socket: socket_path(&context.home).display().to_string(),
    })
}

async fn enqueue_sync(
    sync_tx: &mpsc::Sender<SyncJob>,
    scope: SyncScope,
    source: &'static str,
) -> Result<SyncPassSummary, DaemonError> {
    let (tx, rx) = oneshot::channel();
    sync_tx
        .send(SyncJob {
            scope,
            source,
            respond_to: tx,
        })
        .await
        .map_err(|_| DaemonError::ChannelClosed("sync queue"))?;

    let outcome = rx
        .await
        .map_err(|_| DaemonError::ChannelClosed("sync response"))?;
    outcome.map_err(DaemonError::Protocol)
}

fn pass_record(
    source: &'static str,
    scope: SyncScope,
    result: &Result<SyncPassSummary, DaemonError>,
) -> PassRecord {
    let target = match scope {
        SyncScope::All => "all".to_string(),
        SyncScope::Repository(id) => format!("repository {id}"),
    };
    match result {
        Ok(summary) => PassRecord {
            source: source.to_string(),
            target,
            finished_at: Utc::now(),
            succeeded: summary.succeeded(),
            failed: summary.failed(),
            duration_ms: summary.duration_ms,
            error: summary.first_error().map(str::to_string),
        },
        Err(err) => PassRecord {
            source: source.to_string(),
            target,
            finished_at: Utc::now(),
            succeeded: 0,
            failed: 1,
            duration_ms: 0,
            error: Some(err.to_string()),
        },
    }
}

fn prepare_socket_for_bind(socket: &Path) -> Result<(), DaemonError> {
    if !socket.exists() {
        return Ok(());
    }

    match StdUnixStream::connect(socket) {
        Ok(_) => {
            return Err(DaemonError::Protocol(format!(
                "daemon socket already in use: {}",
                socket.display()
            )));
        }
        Err(err) => {
            tracing::warn!(
                socket = %socket.display(),
                error = %err,
                "removing stale daemon socket before bind",
            );
        }
    }

    match fs::remove_file(socket) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => Err(io_err(socket, err)),
    }
}

async fn write_response(
    writer: &mut OwnedWriteHalf,
    reply: &DaemonReply,
) -> Result<(), DaemonError> {
    let payload = serde_json::to_string(reply)?;
    writer
        .write_all(payload.as_bytes())
        .await
        .map_err(|e| io_err("daemon socket write", e))?;
    writer
        .write_all(b"\n")
        .await
        .map_err(|e| io_err("daemon socket write", e))?;
    writer
        .flush()
        .await
        .map_err(|e| io_err("daemon socket flush", e))?;
    Ok(())
}

fn handle_join(
    task: &str,
    result: Result<Result<(), DaemonError>, tokio::task::JoinError>,
) -> Result<(), DaemonError> {
    match result {
        Ok(inner) => inner,
        Err(err) => Err(DaemonError::Protocol(format!(
            "{task} task join failure: {err}"
        ))),
    }
}

fn unix_seconds_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Install the global subscriber: `RUST_LOG` filter (default `info`),
/// human-readable or one JSON object per line.
pub fn init_tracing(json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = fmt().with_env_filter(filter).with_target(false);
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}

#[cfg(unix)]
fn set_socket_permissions(path: &Path) -> Result<(), DaemonError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600)).map_err(|e| io_err(path, e))
}

#[cfg(not(unix))]
fn set_socket_permissions(_path: &Path) -> Result<(), DaemonError> {
    Ok(())
}
