//! Sample lifecycle state machine
//!
//! Applies placement decisions and operator actions as explicit
//! transitions. Every transition:
//! 1. mutates local state first (offline-first),
//! 2. enqueues the backend write on the durable sync queue,
//! 3. emits one best-effort audit event,
//! and appends exactly one [`HistoryEntry`] to the affected sample.
//! History is append-only; no transition truncates or rewrites it.

use std::sync::Arc;

use chrono::Utc;
use cryotrack_core::types::{
    Container, ContainerId, HistoryAction, HistoryEntry, Position, Sample, SampleId, SampleStatus,
};
use cryotrack_store::{CheckedOutHolding, InventoryRepo, KeyValueStore};
use cryotrack_sync::{SyncOp, SyncQueue};
use serde_json::json;

use crate::audit::{emit, AuditEvent, AuditSink};
use crate::error::{EngineError, EngineResult};

/// Applies lifecycle transitions against local state and the sync queue
pub struct LifecycleEngine {
    store: Arc<dyn KeyValueStore>,
    queue: Arc<SyncQueue>,
    audit: Arc<dyn AuditSink>,
}

impl LifecycleEngine {
    /// Build an engine over shared state
    #[must_use]
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        queue: Arc<SyncQueue>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            store,
            queue,
            audit,
        }
    }

    /// Repository view over the engine's store
    #[must_use]
    pub fn repo(&self) -> InventoryRepo<'_> {
        InventoryRepo::new(self.store.as_ref())
    }

    /// Holding area view over the engine's store
    #[must_use]
    pub fn holding(&self) -> CheckedOutHolding<'_> {
        CheckedOutHolding::new(self.store.as_ref())
    }

    fn entry(
        action: HistoryAction,
        user: &str,
        from: Option<Position>,
        to: Option<Position>,
        notes: String,
    ) -> HistoryEntry {
        HistoryEntry {
            timestamp: Utc::now(),
            action,
            user: user.to_string(),
            from_position: from,
            to_position: to,
            notes,
        }
    }

    fn save_into(&self, container_id: &ContainerId, sample: Sample) -> EngineResult<Sample> {
        let repo = self.repo();
        let mut samples = repo.samples_in(container_id)?;
        match samples.iter_mut().find(|s| s.sample_id == sample.sample_id) {
            Some(slot) => *slot = sample.clone(),
            None => samples.push(sample.clone()),
        }
        repo.save_samples(container_id, &samples)?;
        Ok(sample)
    }

    /// Place a sample at a position, recovering held history if present
    ///
    /// A sample returning from the checked-out holding area keeps its
    /// full history and storage date; only brand-new identifiers start a
    /// fresh record.
    pub fn check_in(
        &self,
        container_id: &ContainerId,
        sample_id: &SampleId,
        position: &Position,
        user: &str,
    ) -> EngineResult<Sample> {
        let container = self.repo().container(container_id)?;
        let held = self.holding().take(sample_id)?;
        let was_held = held.is_some();
        let mut sample = held.unwrap_or_else(|| Sample::new(sample_id.clone()));

        sample.container_id = Some(container_id.clone());
        sample.position = Some(position.clone());
        sample.status = SampleStatus::InContainer;
        let notes = if was_held {
            format!("Returned to storage in position {position}")
        } else {
            format!("Initial storage in position {position}")
        };
        sample.history.push(Self::entry(
            HistoryAction::CheckIn,
            user,
            None,
            Some(position.clone()),
            notes,
        ));

        let sample = self.save_into(container_id, sample)?;
        self.queue.enqueue(SyncOp::UpsertSample {
            container_id: Some(container_id.clone()),
            sample: sample.clone(),
        })?;
        emit(
            self.audit.as_ref(),
            AuditEvent::sample(
                "sample-check-in",
                sample_id.as_str(),
                format!("Checked in to {} at {position}", container.name),
                json!({
                    "container": container.name,
                    "position": position.as_str(),
                    "recovered_from_holding": was_held,
                }),
            ),
        );
        tracing::info!(sample = %sample_id, container = %container_id, position = %position, "checked in");
        Ok(sample)
    }

    /// Move a sample to a position, within or across containers
    ///
    /// Re-placing a sample at its current position is recorded as an
    /// access, not a move.
    pub fn move_sample(
        &self,
        sample_id: &SampleId,
        dest_id: &ContainerId,
        to: &Position,
        user: &str,
    ) -> EngineResult<Sample> {
        let repo = self.repo();
        let dest = repo.container(dest_id)?;
        let (source, mut sample) = repo
            .find_sample(sample_id)?
            .ok_or_else(|| EngineError::SampleNotFound(sample_id.clone()))?;
        let from = sample.position.clone();

        if source.id == *dest_id && from.as_ref() == Some(to) {
            return self.touch(dest_id, sample, user);
        }

        // At most one in-container sample per (container, position): a
        // different sample already at the destination is displaced to the
        // holding area before the move lands.
        let occupant = repo
            .samples_in(dest_id)?
            .into_iter()
            .find(|s| s.sample_id != *sample_id && s.occupies(to))
            .map(|s| s.sample_id);
        if let Some(occupant) = occupant {
            tracing::info!(sample = %occupant, position = %to, "displacing occupant to holding");
            self.check_out(&occupant, user)?;
        }

        let notes = if source.id == *dest_id {
            match &from {
                Some(from) => format!("Sample moved from position {from} to {to}"),
                None => format!("Sample placed at position {to}"),
            }
        } else {
            match &from {
                Some(from) => format!(
                    "Sample moved from {} position {from} to {} position {to}",
                    source.name, dest.name
                ),
                None => format!("Sample moved to {} position {to}", dest.name),
            }
        };

        if source.id != *dest_id {
            let mut remaining = repo.samples_in(&source.id)?;
            remaining.retain(|s| &s.sample_id != sample_id);
            repo.save_samples(&source.id, &remaining)?;
        }
        sample.container_id = Some(dest_id.clone());
        sample.position = Some(to.clone());
        sample.status = SampleStatus::InContainer;
        sample.history.push(Self::entry(
            HistoryAction::Moved,
            user,
            from.clone(),
            Some(to.clone()),
            notes.clone(),
        ));

        let sample = self.save_into(dest_id, sample)?;
        self.queue.enqueue(SyncOp::UpsertSample {
            container_id: Some(dest_id.clone()),
            sample: sample.clone(),
        })?;
        emit(
            self.audit.as_ref(),
            AuditEvent::sample(
                "sample-moved",
                sample_id.as_str(),
                notes,
                json!({
                    "from_container": source.name,
                    "to_container": dest.name,
                    "from_position": from.as_ref().map(Position::as_str),
                    "to_position": to.as_str(),
                }),
            ),
        );
        tracing::info!(sample = %sample_id, from = %source.id, to = %dest_id, position = %to, "moved");
        Ok(sample)
    }

    // Same container, same position: record the access without moving.
    fn touch(
        &self,
        container_id: &ContainerId,
        mut sample: Sample,
        user: &str,
    ) -> EngineResult<Sample> {
        let position = sample.position.clone();
        sample.last_accessed = Some(Utc::now().date_naive());
        sample.history.push(Self::entry(
            HistoryAction::Accessed,
            user,
            None,
            None,
            match &position {
                Some(p) => format!("Accessed at position {p}"),
                None => "Accessed".to_string(),
            },
        ));
        let sample_id = sample.sample_id.clone();
        let sample = self.save_into(container_id, sample)?;
        self.queue.enqueue(SyncOp::UpsertSample {
            container_id: Some(container_id.clone()),
            sample: sample.clone(),
        })?;
        emit(
            self.audit.as_ref(),
            AuditEvent::sample(
                "sample-accessed",
                sample_id.as_str(),
                "Sample accessed in place".to_string(),
                json!({ "position": position.as_ref().map(Position::as_str) }),
            ),
        );
        Ok(sample)
    }

    /// Remove a sample to the checked-out holding area
    pub fn check_out(&self, sample_id: &SampleId, user: &str) -> EngineResult<Sample> {
        let repo = self.repo();
        let (source, mut sample) = repo
            .find_sample(sample_id)?
            .ok_or_else(|| EngineError::SampleNotFound(sample_id.clone()))?;
        let from = sample.position.clone();

        let mut remaining = repo.samples_in(&source.id)?;
        remaining.retain(|s| &s.sample_id != sample_id);
        repo.save_samples(&source.id, &remaining)?;

        sample.status = SampleStatus::CheckedOut;
        sample.container_id = None;
        sample.position = None;
        sample.last_accessed = Some(Utc::now().date_naive());
        sample.history.push(Self::entry(
            HistoryAction::CheckOut,
            user,
            from.clone(),
            None,
            match &from {
                Some(p) => format!("Checked out from {} position {p}", source.name),
                None => format!("Checked out from {}", source.name),
            },
        ));
        self.holding().put(sample.clone())?;
        self.queue.enqueue(SyncOp::UpsertSample {
            container_id: None,
            sample: sample.clone(),
        })?;
        emit(
            self.audit.as_ref(),
            AuditEvent::sample(
                "sample-check-out",
                sample_id.as_str(),
                format!("Checked out from {}", source.name),
                json!({
                    "container": source.name,
                    "position": from.as_ref().map(Position::as_str),
                }),
            ),
        );
        tracing::info!(sample = %sample_id, container = %source.id, "checked out");
        Ok(sample)
    }

    /// Set a container's archived flag
    ///
    /// Goes through the authoritative backend record so the duplicate
    /// policy, which is evaluated against backend-known containers, sees
    /// the change.
    pub fn set_archived(
        &self,
        container_id: &ContainerId,
        archived: bool,
        user: &str,
    ) -> EngineResult<Container> {
        let repo = self.repo();
        let mut container = repo.container(container_id)?;
        container.is_archived = archived;
        repo.upsert_container(&container)?;
        self.queue.enqueue(SyncOp::UpsertContainer {
            container: container.clone(),
        })?;
        let action = if archived {
            "container-archived"
        } else {
            "container-unarchived"
        };
        emit(
            self.audit.as_ref(),
            AuditEvent::container(
                action,
                container_id.as_str(),
                format!("Container {} archived={archived}", container.name),
                json!({ "user": user, "archived": archived }),
            ),
        );
        tracing::info!(container = %container_id, archived, "archive flag changed");
        Ok(container)
    }

    /// Discard whatever occupies a position
    ///
    /// Destructive: requires explicit confirmation. Clearing an empty
    /// position is a no-op.
    pub fn clear_position(
        &self,
        container_id: &ContainerId,
        position: &Position,
        confirmed: bool,
        user: &str,
    ) -> EngineResult<Option<Sample>> {
        if !confirmed {
            return Err(EngineError::ConfirmationRequired(format!(
                "clearing position {position} discards its sample"
            )));
        }
        let repo = self.repo();
        let container = repo.container(container_id)?;
        let mut samples = repo.samples_in(container_id)?;
        let Some(idx) = samples.iter().position(|s| s.occupies(position)) else {
            return Ok(None);
        };
        let removed = samples.remove(idx);
        repo.save_samples(container_id, &samples)?;
        self.queue.enqueue(SyncOp::DeleteSample {
            container_id: container_id.clone(),
            sample_id: removed.sample_id.clone(),
        })?;
        emit(
            self.audit.as_ref(),
            AuditEvent::sample(
                "position-cleared",
                removed.sample_id.as_str(),
                format!("Cleared {} position {position}", container.name),
                json!({ "user": user, "container": container.name, "position": position.as_str() }),
            )
            .with_severity(crate::audit::AuditSeverity::Critical),
        );
        tracing::info!(sample = %removed.sample_id, container = %container_id, position = %position, "position cleared");
        Ok(Some(removed))
    }

    /// Check out every sample in a container
    ///
    /// Samples land in the holding area with their history intact, one
    /// check-out entry each. Requires explicit confirmation because it
    /// empties the whole container in one action.
    pub fn clear_container(
        &self,
        container_id: &ContainerId,
        confirmed: bool,
        user: &str,
    ) -> EngineResult<usize> {
        if !confirmed {
            return Err(EngineError::ConfirmationRequired(
                "clearing a container checks out all of its samples".to_string(),
            ));
        }
        let repo = self.repo();
        let container = repo.container(container_id)?;
        let ids: Vec<SampleId> = repo
            .samples_in(container_id)?
            .into_iter()
            .map(|s| s.sample_id)
            .collect();
        for id in &ids {
            self.check_out(id, user)?;
        }
        emit(
            self.audit.as_ref(),
            AuditEvent::container(
                "container-cleared",
                container_id.as_str(),
                format!("Cleared {} ({} samples checked out)", container.name, ids.len()),
                json!({ "user": user, "count": ids.len() }),
            )
            .with_severity(crate::audit::AuditSeverity::Warning),
        );
        tracing::info!(container = %container_id, count = ids.len(), "container cleared");
        Ok(ids.len())
    }
}
