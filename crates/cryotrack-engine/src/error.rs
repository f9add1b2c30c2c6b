//! Error types for lifecycle transitions

use cryotrack_core::types::SampleId;

/// Failures applying a lifecycle transition
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Placement resolution failed before any state change
    #[error(transparent)]
    Placement(#[from] cryotrack_core::PlacementError),

    /// Local persistence failed
    #[error(transparent)]
    Store(#[from] cryotrack_store::StoreError),

    /// Enqueueing the backend write failed
    #[error(transparent)]
    Sync(#[from] cryotrack_sync::SyncError),

    /// The sample is not recorded anywhere
    #[error("sample {0} not found")]
    SampleNotFound(SampleId),

    /// A destructive operation was attempted without confirmation
    #[error("operation requires confirmation: {0}")]
    ConfirmationRequired(String),
}

/// Result alias for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
