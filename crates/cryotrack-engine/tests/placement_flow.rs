//! End-to-end scan scenarios across containers

use std::sync::Arc;

use cryotrack_core::resolver::Decision;
use cryotrack_core::types::{
    Container, ContainerType, HistoryAction, Position, SampleId, SampleType,
};
use cryotrack_engine::{
    AuditSink, LifecycleEngine, MemoryAuditSink, PlacementService, ServiceConfig,
};
use cryotrack_store::{KeyValueStore, MemoryStore};
use cryotrack_sync::SyncQueue;

struct World {
    service: PlacementService,
    queue: Arc<SyncQueue>,
    audit: Arc<MemoryAuditSink>,
}

fn world() -> World {
    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let queue = Arc::new(SyncQueue::new(Arc::clone(&store)));
    let audit = Arc::new(MemoryAuditSink::new());
    let engine = LifecycleEngine::new(
        store,
        Arc::clone(&queue),
        Arc::clone(&audit) as Arc<dyn AuditSink>,
    );
    World {
        service: PlacementService::new(engine, ServiceConfig::new()),
        queue,
        audit,
    }
}

fn dp_box(name: &str) -> Container {
    Container::new(
        name,
        ContainerType::preset("9x9-box").unwrap(),
        SampleType::new(SampleType::DP_POOLS),
    )
}

#[test]
fn move_within_container_frees_old_position() {
    let w = world();
    let container = dp_box("Box A");
    w.service.engine().repo().upsert_container(&container).unwrap();

    w.service.scan(&container.id, "X1", Some("A1"), "AB").unwrap();
    let outcome = w.service.scan(&container.id, "X1", Some("A2"), "AB").unwrap();

    assert_eq!(
        outcome.decision,
        Decision::MoveWithinContainer {
            from: Position::new("A1"),
            to: Position::new("A2"),
        }
    );
    let sample = outcome.applied.unwrap();
    assert_eq!(sample.history.len(), 2);
    let entry = sample.history.last().unwrap();
    assert_eq!(entry.action, HistoryAction::Moved);
    assert_eq!(entry.from_position, Some(Position::new("A1")));
    assert_eq!(entry.to_position, Some(Position::new("A2")));

    let view = w.service.engine().repo().view(&container.id).unwrap();
    assert!(!view.is_occupied(&Position::new("A1")));
    assert_eq!(
        view.occupant_at(&Position::new("A2")),
        Some(&SampleId::new("X1"))
    );
}

#[test]
fn move_onto_held_position_checks_out_the_occupant() {
    let w = world();
    let container = dp_box("Box A");
    w.service.engine().repo().upsert_container(&container).unwrap();

    w.service.scan(&container.id, "S1", Some("A1"), "AB").unwrap();
    w.service.scan(&container.id, "S2", Some("A2"), "AB").unwrap();

    // Rescanning S1 at S2's position moves S1 and displaces S2.
    let outcome = w.service.scan(&container.id, "S1", Some("A2"), "AB").unwrap();
    assert_eq!(
        outcome.decision,
        Decision::MoveWithinContainer {
            from: Position::new("A1"),
            to: Position::new("A2"),
        }
    );

    let samples = w.service.engine().repo().samples_in(&container.id).unwrap();
    let at_a2: Vec<_> = samples
        .iter()
        .filter(|s| s.occupies(&Position::new("A2")))
        .collect();
    assert_eq!(at_a2.len(), 1);
    assert_eq!(at_a2[0].sample_id, SampleId::new("S1"));

    let held = w
        .service
        .engine()
        .holding()
        .get(&SampleId::new("S2"))
        .unwrap()
        .unwrap();
    assert_eq!(held.history.last().unwrap().action, HistoryAction::CheckOut);
}

#[test]
fn sample_in_archived_container_relocates_without_confirmation() {
    let w = world();
    let active = dp_box("Active Box");
    let archived = dp_box("Old Box").archived();
    let repo = w.service.engine().repo();
    repo.upsert_container(&active).unwrap();
    repo.upsert_container(&archived).unwrap();
    w.service
        .engine()
        .check_in(&archived.id, &SampleId::new("S1"), &Position::new("D4"), "AB")
        .unwrap();

    let outcome = w.service.scan(&active.id, "S1", Some("A1"), "AB").unwrap();

    match outcome.decision {
        Decision::MoveFromOtherContainer {
            source_container,
            source_position,
            to,
            requires_confirmation,
        } => {
            assert_eq!(source_container, archived.id);
            assert_eq!(source_position, Position::new("D4"));
            assert_eq!(to, Position::new("A1"));
            assert!(!requires_confirmation);
        }
        other => panic!("unexpected decision: {other:?}"),
    }
    // The archived container no longer lists the sample.
    assert!(w
        .service
        .engine()
        .repo()
        .samples_in(&archived.id)
        .unwrap()
        .is_empty());
    let moved = outcome.applied.unwrap();
    assert_eq!(moved.container_id, Some(active.id.clone()));
}

#[test]
fn check_out_and_back_in_appends_two_entries() {
    let w = world();
    let container = dp_box("Box B");
    w.service.engine().repo().upsert_container(&container).unwrap();
    w.service.scan(&container.id, "S1", Some("B3"), "AB").unwrap();
    // In-place rescan records an access, giving pre-existing history.
    let before = w
        .service
        .scan(&container.id, "S1", Some("B3"), "AB")
        .unwrap()
        .applied
        .unwrap()
        .history
        .len();

    w.service
        .engine()
        .check_out(&SampleId::new("S1"), "AB")
        .unwrap();
    let back = w
        .service
        .engine()
        .check_in(&container.id, &SampleId::new("S1"), &Position::new("B3"), "AB")
        .unwrap();

    assert_eq!(back.history.len(), before + 2);
    let tail: Vec<_> = back
        .history
        .iter()
        .rev()
        .take(2)
        .map(|h| h.action)
        .collect();
    assert_eq!(tail, vec![HistoryAction::CheckIn, HistoryAction::CheckOut]);
}

#[test]
fn pooled_layout_skips_disabled_cell_on_advance() {
    let w = world();
    let container = dp_box("DP Box");
    w.service.engine().repo().upsert_container(&container).unwrap();

    let grid = w
        .service
        .grid_for(&container.container_type, &container.sample_type);
    assert_eq!(grid.usable_count(), 80);
    assert!(grid.is_disabled(&Position::new("I9")));

    // Occupy H8 and I8, then ask for the address after I8: the advance
    // continues into column 9 and never proposes I9.
    w.service.scan(&container.id, "P1", Some("H8"), "AB").unwrap();
    let outcome = w.service.scan(&container.id, "P2", Some("I8"), "AB").unwrap();
    let next = outcome.next_target.unwrap();
    assert_ne!(next, Position::new("I9"));
    assert_eq!(next, Position::new("A9"));
}

#[test]
fn every_transition_queues_a_write_and_audits() {
    let w = world();
    let container = dp_box("Box C");
    w.service.engine().repo().upsert_container(&container).unwrap();

    w.service.scan(&container.id, "S1", None, "AB").unwrap();
    w.service.scan(&container.id, "S1", Some("C2"), "AB").unwrap();
    w.service
        .engine()
        .check_out(&SampleId::new("S1"), "AB")
        .unwrap();

    assert_eq!(w.queue.len().unwrap(), 3);
    let actions: Vec<_> = w
        .audit
        .events()
        .into_iter()
        .map(|e| e.action_type)
        .collect();
    assert_eq!(
        actions,
        vec!["sample-check-in", "sample-moved", "sample-check-out"]
    );
}
