//! Remote change reconciliation
//!
//! Realtime notifications from the backend must not clobber local edits
//! that are still waiting in the queue: local queued writes win until
//! acknowledged. A remote update for a sample with pending queue items
//! is deferred; the caller re-delivers it once the queue drains for that
//! sample.

use cryotrack_core::types::{ContainerId, Sample, SampleId};
use cryotrack_store::InventoryRepo;

use crate::error::SyncResult;
use crate::queue::SyncQueue;

/// A change reported by the backend's realtime stream
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteChange {
    /// A sample was created or updated remotely
    UpsertSample {
        /// Container the remote record places the sample in
        container_id: ContainerId,
        /// Remote sample state
        sample: Sample,
    },
    /// A sample was deleted remotely
    DeleteSample {
        /// Container the sample was recorded in
        container_id: ContainerId,
        /// Which sample was removed
        sample_id: SampleId,
    },
}

impl RemoteChange {
    fn sample_id(&self) -> &SampleId {
        match self {
            Self::UpsertSample { sample, .. } => &sample.sample_id,
            Self::DeleteSample { sample_id, .. } => sample_id,
        }
    }
}

/// What happened to one remote change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// Local state now reflects the remote change
    Applied,
    /// A local queued write for this sample is still unacknowledged;
    /// the change was not applied
    Deferred,
}

/// Apply one remote change to local state, unless local writes are pending
///
/// # Errors
/// Returns an error when the local store fails; a deferred change is a
/// normal outcome, not an error.
pub fn apply_remote_change(
    repo: &InventoryRepo<'_>,
    queue: &SyncQueue,
    change: &RemoteChange,
) -> SyncResult<ReconcileOutcome> {
    let sample_id = change.sample_id();
    if queue.has_pending_for(sample_id)? {
        tracing::debug!(sample = %sample_id, "remote change deferred, local write pending");
        return Ok(ReconcileOutcome::Deferred);
    }

    match change {
        RemoteChange::UpsertSample {
            container_id,
            sample,
        } => {
            let mut samples = repo.samples_in(container_id)?;
            match samples.iter_mut().find(|s| s.sample_id == sample.sample_id) {
                Some(slot) => *slot = sample.clone(),
                None => samples.push(sample.clone()),
            }
            repo.save_samples(container_id, &samples)?;
        }
        RemoteChange::DeleteSample {
            container_id,
            sample_id,
        } => {
            let mut samples = repo.samples_in(container_id)?;
            samples.retain(|s| &s.sample_id != sample_id);
            repo.save_samples(container_id, &samples)?;
        }
    }
    tracing::debug!(sample = %sample_id, "remote change applied");
    Ok(ReconcileOutcome::Applied)
}
