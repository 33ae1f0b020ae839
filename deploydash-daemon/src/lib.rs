//! deploydash daemon runtime: sync scheduler + sync processor + socket server.

mod error;
pub mod paths;
pub mod protocol;
mod runtime;

pub use error::DaemonError;
pub use protocol::{
    request_status, request_stop, request_sync, send_request, wait_until_running, DaemonReply,
    DaemonRequest, DaemonStatus, PassRecord, RepositoryStatus,
};
pub use runtime::{init_tracing, run, settings_gateway, start_blocking, DaemonContext, GatewayFactory};
