//! Queue draining behavior under permanent head failure
//!
//! A permanently failing head item must be dropped after the attempt
//! limit without wedging the queue, and later writes for the same sample
//! must still go out in their original order.

use std::sync::Arc;

use async_trait::async_trait;
use cryotrack_core::types::{Position, Sample, SampleId};
use cryotrack_store::{KeyValueStore, MemoryStore};
use cryotrack_sync::{
    BackendError, StepOutcome, SyncBackend, SyncConfig, SyncOp, SyncProcessor, SyncQueue,
};
use parking_lot::Mutex;

/// Applies every op except those placing a sample at the poisoned position
struct PoisonedPositionBackend {
    poisoned: Position,
    applied: Mutex<Vec<(SampleId, Option<Position>)>>,
}

impl PoisonedPositionBackend {
    fn new(poisoned: &str) -> Self {
        Self {
            poisoned: Position::new(poisoned),
            applied: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl SyncBackend for PoisonedPositionBackend {
    async fn apply(&self, op: &SyncOp) -> Result<(), BackendError> {
        let SyncOp::UpsertSample { sample, .. } = op else {
            return Ok(());
        };
        if sample.position.as_ref() == Some(&self.poisoned) {
            return Err(BackendError::Unavailable("row locked".into()));
        }
        self.applied
            .lock()
            .push((sample.sample_id.clone(), sample.position.clone()));
        Ok(())
    }
}

fn upsert(id: &str, position: &str) -> SyncOp {
    let mut sample = Sample::new(SampleId::new(id));
    sample.position = Some(Position::new(position));
    SyncOp::UpsertSample {
        container_id: None,
        sample,
    }
}

#[tokio::test]
async fn dropped_head_does_not_wedge_queue() {
    let queue = Arc::new(SyncQueue::new(
        Arc::new(MemoryStore::new()) as Arc<dyn KeyValueStore>
    ));
    queue.enqueue(upsert("S1", "A1")).unwrap();
    queue.enqueue(upsert("S2", "B1")).unwrap();
    queue.enqueue(upsert("S1", "A2")).unwrap();

    let backend = Arc::new(PoisonedPositionBackend::new("A1"));
    let config = SyncConfig::new().with_max_attempts(3);
    let processor = SyncProcessor::new(
        Arc::clone(&queue),
        Arc::clone(&backend) as Arc<dyn SyncBackend>,
        config,
    );

    // Head fails twice, then is dropped on the final attempt.
    assert_eq!(processor.step().await.unwrap(), StepOutcome::Backoff(1));
    assert_eq!(processor.step().await.unwrap(), StepOutcome::Backoff(2));
    assert_eq!(processor.step().await.unwrap(), StepOutcome::Dropped);
    assert_eq!(queue.len().unwrap(), 2);

    // The queue continues past the dropped item.
    assert_eq!(processor.step().await.unwrap(), StepOutcome::Delivered);
    assert_eq!(processor.step().await.unwrap(), StepOutcome::Delivered);
    assert_eq!(processor.step().await.unwrap(), StepOutcome::Idle);

    // S1's surviving write is delivered after S2's, in enqueue order.
    let applied = backend.applied.lock().clone();
    assert_eq!(
        applied,
        vec![
            (SampleId::new("S2"), Some(Position::new("B1"))),
            (SampleId::new("S1"), Some(Position::new("A2"))),
        ]
    );
}

#[tokio::test]
async fn failed_head_retries_in_place() {
    let queue = Arc::new(SyncQueue::new(
        Arc::new(MemoryStore::new()) as Arc<dyn KeyValueStore>
    ));
    queue.enqueue(upsert("S1", "A1")).unwrap();
    queue.enqueue(upsert("S2", "B1")).unwrap();

    let backend = Arc::new(PoisonedPositionBackend::new("A1"));
    let processor = SyncProcessor::new(
        Arc::clone(&queue),
        Arc::clone(&backend) as Arc<dyn SyncBackend>,
        SyncConfig::new(),
    );

    assert_eq!(processor.step().await.unwrap(), StepOutcome::Backoff(1));

    // S2 stays behind the failing head until it is resolved.
    assert!(backend.applied.lock().is_empty());
    let head = queue.head().unwrap().unwrap();
    assert_eq!(head.op.sample_id(), Some(&SampleId::new("S1")));
    assert_eq!(head.attempts, 1);
}

#[tokio::test]
async fn reentry_guard_rejects_second_loop() {
    let queue = Arc::new(SyncQueue::new(
        Arc::new(MemoryStore::new()) as Arc<dyn KeyValueStore>
    ));
    let backend = Arc::new(PoisonedPositionBackend::new("A1"));
    let processor = Arc::new(SyncProcessor::new(
        queue,
        backend,
        SyncConfig::new().with_poll_interval(std::time::Duration::from_millis(10)),
    ));

    let handle = processor.start().unwrap();
    assert!(matches!(
        processor.start(),
        Err(cryotrack_sync::SyncError::AlreadyRunning)
    ));

    handle.stop().await.unwrap();
    // After a clean stop the guard clears and a new loop may start.
    let handle = processor.start().unwrap();
    handle.stop().await.unwrap();
}

#[tokio::test]
async fn stopping_keeps_unacknowledged_items() {
    let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
    let queue = Arc::new(SyncQueue::new(Arc::clone(&store)));
    queue.enqueue(upsert("S1", "A1")).unwrap();

    let backend = Arc::new(PoisonedPositionBackend::new("A1"));
    let processor = Arc::new(SyncProcessor::new(
        Arc::clone(&queue),
        backend,
        SyncConfig::new()
            .with_base_backoff(std::time::Duration::from_millis(5))
            .with_max_attempts(u32::MAX),
    ));

    let handle = processor.start().unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    handle.stop().await.unwrap();

    assert_eq!(queue.len().unwrap(), 1);
}
