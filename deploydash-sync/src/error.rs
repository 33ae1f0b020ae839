//! Error types for deploydash-sync.

use thiserror::Error;

use deploydash_gateway::GatewayError;
use deploydash_store::StoreError;

/// All errors that can abort the sync of one repository.
#[derive(Debug, Error)]
pub enum SyncError {
    /// An error from the record store.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// An error from the VCS platform or ticket tracker.
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

impl SyncError {
    /// Bad URL, missing settings, or rejected credentials: retrying on the
    /// next tick will not help until someone changes the configuration.
    pub fn is_configuration(&self) -> bool {
        match self {
            SyncError::Gateway(GatewayError::InvalidUrl { .. })
            | SyncError::Gateway(GatewayError::NotConfigured(_)) => true,
            SyncError::Gateway(e) => e.is_unauthorized(),
            SyncError::Store(_) => false,
        }
    }
}
