//! Error types for the sync layer

use crate::backend::BackendError;

/// Failures in the sync queue and its processor
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Durable queue storage failed
    #[error("queue storage failed: {0}")]
    Store(#[from] cryotrack_store::StoreError),

    /// A second processor loop was started for the same queue
    #[error("sync processor already running")]
    AlreadyRunning,

    /// Backend write failed
    #[error("backend write failed: {0}")]
    Backend(#[from] BackendError),
}

/// Result alias for sync operations
pub type SyncResult<T> = Result<T, SyncError>;
