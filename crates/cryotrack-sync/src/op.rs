//! Sync operations
//!
//! Each lifecycle transition that must reach the backend is captured as
//! one [`SyncOp`] and queued durably. Ops are self-contained so they can
//! be replayed after a restart without consulting live state.

use cryotrack_core::types::{Container, ContainerId, Sample, SampleId};
use serde::{Deserialize, Serialize};

/// One pending backend write
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "kebab-case")]
pub enum SyncOp {
    /// Create or replace a sample record
    UpsertSample {
        /// Container the sample belongs to, `None` while checked out
        container_id: Option<ContainerId>,
        /// Full sample state at enqueue time
        sample: Sample,
    },
    /// Remove a sample record
    DeleteSample {
        /// Container the sample belonged to
        container_id: ContainerId,
        /// Which sample to remove
        sample_id: SampleId,
    },
    /// Create or replace a container record
    UpsertContainer {
        /// Full container state at enqueue time
        container: Container,
    },
    /// Remove a container record
    DeleteContainer {
        /// Which container to remove
        container_id: ContainerId,
    },
}

impl SyncOp {
    /// The sample this op concerns, if it is sample-scoped
    ///
    /// Ordering guarantees and the reconciliation rule are both keyed on
    /// this identifier.
    #[must_use]
    pub fn sample_id(&self) -> Option<&SampleId> {
        match self {
            Self::UpsertSample { sample, .. } => Some(&sample.sample_id),
            Self::DeleteSample { sample_id, .. } => Some(sample_id),
            Self::UpsertContainer { .. } | Self::DeleteContainer { .. } => None,
        }
    }

    /// Short label for logs
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UpsertSample { .. } => "upsert-sample",
            Self::DeleteSample { .. } => "delete-sample",
            Self::UpsertContainer { .. } => "upsert-container",
            Self::DeleteContainer { .. } => "delete-container",
        }
    }
}
