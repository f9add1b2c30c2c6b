//! Backend write interface
//!
//! The processor treats the backend as an opaque async call that can
//! fail or time out. Nothing here assumes transactionality across rows.

use async_trait::async_trait;

use crate::op::SyncOp;

/// Failures applying a write to the backend
#[derive(Debug, Clone, thiserror::Error)]
pub enum BackendError {
    /// Transient failure worth retrying
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// The backend refused the write; retrying will not help
    #[error("backend rejected write: {0}")]
    Rejected(String),

    /// No response within the deadline
    #[error("backend timed out")]
    Timeout,
}

/// Destination for queued writes
#[async_trait]
pub trait SyncBackend: Send + Sync {
    /// Apply one write
    ///
    /// # Errors
    /// Returns a [`BackendError`] on any delivery failure; the caller
    /// decides whether to retry.
    async fn apply(&self, op: &SyncOp) -> Result<(), BackendError>;
}
