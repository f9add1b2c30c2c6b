//! Scan-to-placement workflow
//!
//! Ties the pieces together for one operator scan:
//! normalize the input, resolve it against the whole inventory, apply
//! the resulting transition, then advance the suggested target to the
//! next free address so rapid scanning never needs manual cursor moves.

use cryotrack_core::grid::{DisabledCellTable, Grid, GridDimensions};
use cryotrack_core::resolver::{
    next_scan_target, resolve_placement, Decision, PlacementPolicy,
};
use cryotrack_core::types::{ContainerId, Position, Sample, SampleId};

use crate::error::EngineResult;
use crate::lifecycle::LifecycleEngine;

/// Placement workflow configuration
#[derive(Debug, Clone, Default)]
pub struct ServiceConfig {
    /// Duplicate and move policy
    pub policy: PlacementPolicy,
    /// Layout-scoped disabled cells
    pub disabled_cells: DisabledCellTable,
}

impl ServiceConfig {
    /// Production defaults
    #[must_use]
    pub fn new() -> Self {
        Self {
            policy: PlacementPolicy::new(),
            disabled_cells: DisabledCellTable::standard(),
        }
    }
}

/// Result of processing one scan
#[derive(Debug, Clone, PartialEq)]
pub struct ScanOutcome {
    /// What the scan resolved to
    pub decision: Decision,
    /// Sample state after the transition, when one was applied
    pub applied: Option<Sample>,
    /// Suggested target for the next scan, `None` when the grid is full
    pub next_target: Option<Position>,
}

/// Drives scans through resolution and the lifecycle engine
pub struct PlacementService {
    engine: LifecycleEngine,
    config: ServiceConfig,
}

impl PlacementService {
    /// Build a service over an engine
    #[must_use]
    pub fn new(engine: LifecycleEngine, config: ServiceConfig) -> Self {
        Self { engine, config }
    }

    /// The underlying lifecycle engine
    #[must_use]
    pub fn engine(&self) -> &LifecycleEngine {
        &self.engine
    }

    /// Addressable grid for one container's layout and sample type
    #[must_use]
    pub fn grid_for(
        &self,
        layout: &cryotrack_core::types::ContainerType,
        sample_type: &cryotrack_core::types::SampleType,
    ) -> Grid {
        Grid::generate(
            GridDimensions::from(layout),
            sample_type,
            &self.config.disabled_cells,
        )
    }

    /// Process one scan against a container
    ///
    /// `raw_target` of `None` asks for the next free address. Decisions
    /// that need operator confirmation (`Reject`, `OverwriteRequired`,
    /// confirmation-gated cross-container moves) are returned unapplied;
    /// no state changes until the operator responds.
    pub fn scan(
        &self,
        container_id: &ContainerId,
        raw_id: &str,
        raw_target: Option<&str>,
        user: &str,
    ) -> EngineResult<ScanOutcome> {
        let sample_id = SampleId::new(raw_id);
        let repo = self.engine.repo();
        let current = repo.view(container_id)?;
        let others = repo.other_views(container_id)?;
        let grid = self.grid_for(
            &current.container.container_type,
            &current.container.sample_type,
        );
        let target = raw_target.map(Position::new);

        let decision = resolve_placement(
            &sample_id,
            target.as_ref(),
            &current,
            &others,
            &grid,
            &self.config.policy,
        )?;
        tracing::debug!(sample = %sample_id, container = %container_id, ?decision, "scan resolved");

        let (applied, used) = match &decision {
            Decision::PlaceNew { position } => {
                let sample = self.engine.check_in(container_id, &sample_id, position, user)?;
                (Some(sample), Some(position.clone()))
            }
            Decision::MoveWithinContainer { to, .. } => {
                let sample = self.engine.move_sample(&sample_id, container_id, to, user)?;
                (Some(sample), Some(to.clone()))
            }
            Decision::MoveFromOtherContainer {
                to,
                requires_confirmation,
                ..
            } => {
                if *requires_confirmation {
                    (None, None)
                } else {
                    let sample = self.engine.move_sample(&sample_id, container_id, to, user)?;
                    (Some(sample), Some(to.clone()))
                }
            }
            Decision::Reject(_) | Decision::OverwriteRequired { .. } => (None, None),
        };

        let next_target = match &used {
            Some(used) => {
                // Re-read occupancy so the advance sees the placement.
                let view = self.engine.repo().view(container_id)?;
                next_scan_target(&grid, used, &view)
            }
            None => None,
        };

        Ok(ScanOutcome {
            decision,
            applied,
            next_target,
        })
    }

    /// Apply a cross-container move the operator has confirmed
    pub fn confirm_move(
        &self,
        container_id: &ContainerId,
        sample_id: &SampleId,
        to: &Position,
        user: &str,
    ) -> EngineResult<Sample> {
        self.engine.move_sample(sample_id, container_id, to, user)
    }

    /// Displace a confirmed-overwrite occupant, then place the scan
    ///
    /// The occupant goes to the checked-out holding area rather than
    /// being discarded.
    pub fn confirm_overwrite(
        &self,
        container_id: &ContainerId,
        occupant: &SampleId,
        sample_id: &SampleId,
        position: &Position,
        user: &str,
    ) -> EngineResult<Sample> {
        self.engine.check_out(occupant, user)?;
        self.engine.check_in(container_id, sample_id, position, user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::{AuditSink, MemoryAuditSink};
    use cryotrack_core::types::{Container, ContainerType, SampleType};
    use cryotrack_store::{KeyValueStore, MemoryStore};
    use cryotrack_sync::SyncQueue;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn service_with(container: &Container) -> PlacementService {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let queue = Arc::new(SyncQueue::new(Arc::clone(&store)));
        let audit: Arc<dyn AuditSink> = Arc::new(MemoryAuditSink::new());
        let engine = LifecycleEngine::new(store, queue, audit);
        engine.repo().upsert_container(container).unwrap();
        PlacementService::new(engine, ServiceConfig::new())
    }

    fn dp_box(name: &str) -> Container {
        Container::new(
            name,
            ContainerType::preset("9x9-box").unwrap(),
            SampleType::new(SampleType::DP_POOLS),
        )
    }

    #[test]
    fn scan_places_and_advances_target() {
        let container = dp_box("Box 1");
        let service = service_with(&container);

        let outcome = service.scan(&container.id, "s1", None, "AB").unwrap();
        assert_eq!(
            outcome.decision,
            Decision::PlaceNew {
                position: Position::new("A1")
            }
        );
        assert!(outcome.applied.is_some());
        // Column-major advance within the first column.
        assert_eq!(outcome.next_target, Some(Position::new("B1")));
    }

    #[test]
    fn rescan_at_new_target_moves() {
        let container = dp_box("Box 1");
        let service = service_with(&container);
        service.scan(&container.id, "S1", Some("A1"), "AB").unwrap();

        let outcome = service.scan(&container.id, "S1", Some("A2"), "AB").unwrap();
        assert_eq!(
            outcome.decision,
            Decision::MoveWithinContainer {
                from: Position::new("A1"),
                to: Position::new("A2"),
            }
        );
        let sample = outcome.applied.unwrap();
        assert_eq!(sample.position, Some(Position::new("A2")));
    }

    #[test]
    fn occupied_target_returns_unapplied_overwrite() {
        let container = dp_box("Box 1");
        let service = service_with(&container);
        service.scan(&container.id, "S1", Some("A1"), "AB").unwrap();

        let outcome = service.scan(&container.id, "S2", Some("A1"), "AB").unwrap();
        assert_eq!(
            outcome.decision,
            Decision::OverwriteRequired {
                occupant: SampleId::new("S1"),
                position: Position::new("A1"),
            }
        );
        assert!(outcome.applied.is_none());
        assert!(outcome.next_target.is_none());

        let placed = service
            .confirm_overwrite(
                &container.id,
                &SampleId::new("S1"),
                &SampleId::new("S2"),
                &Position::new("A1"),
                "AB",
            )
            .unwrap();
        assert_eq!(placed.position, Some(Position::new("A1")));
        // The displaced occupant waits in holding with its history.
        let held = service.engine().holding().all().unwrap();
        assert_eq!(held.len(), 1);
        assert_eq!(held[0].sample_id, SampleId::new("S1"));
        assert_eq!(held[0].history.len(), 2);
    }

    #[test]
    fn empty_identifier_is_rejected_before_any_state_change() {
        let container = dp_box("Box 1");
        let service = service_with(&container);

        let err = service.scan(&container.id, "   ", None, "AB").unwrap_err();
        assert!(matches!(
            err,
            crate::error::EngineError::Placement(
                cryotrack_core::PlacementError::EmptyIdentifier
            )
        ));
        assert!(service
            .engine()
            .repo()
            .samples_in(&container.id)
            .unwrap()
            .is_empty());
    }
}
