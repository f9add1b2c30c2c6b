//! Durable FIFO queue of pending backend writes
//!
//! Each item persists under its own `sync-queue-<ulid>` key, so unsent
//! items survive process restarts and concurrent enqueuers never
//! overwrite one another: an enqueue is a single put of a fresh key.
//! FIFO order is the id order; ids come from a monotonic ULID generator,
//! so items enqueued by one process in the same millisecond still sort
//! in enqueue order. A second drainer on the same store can deliver an
//! item twice, never lose it; attempt bookkeeping assumes the
//! single-worker rule enforced by the processor's reentry guard.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use cryotrack_core::types::SampleId;
use cryotrack_store::{get_typed, put_typed, KeyValueStore};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use ulid::{Generator, Ulid};

use crate::error::SyncResult;
use crate::op::SyncOp;

const ITEM_KEY_PREFIX: &str = "sync-queue-";

fn item_key(id: Ulid) -> String {
    format!("{ITEM_KEY_PREFIX}{id}")
}

/// One queued write with its retry bookkeeping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueItem {
    /// Queue-unique id, monotonic by creation time
    pub id: Ulid,
    /// The pending write
    pub op: SyncOp,
    /// Delivery attempts so far
    pub attempts: u32,
    /// When the item was enqueued
    pub created_at: DateTime<Utc>,
}

/// Durable FIFO queue over a key-value store
pub struct SyncQueue {
    store: Arc<dyn KeyValueStore>,
    // Monotonic within this handle; cross-handle order within one
    // millisecond falls back to the ids' random part.
    ids: Mutex<Generator>,
}

impl SyncQueue {
    /// Open the queue on a store
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            ids: Mutex::new(Generator::new()),
        }
    }

    fn load(&self) -> SyncResult<Vec<QueueItem>> {
        let mut items = Vec::new();
        for key in self.store.keys()? {
            if !key.starts_with(ITEM_KEY_PREFIX) {
                continue;
            }
            if let Some(item) = get_typed::<QueueItem>(self.store.as_ref(), &key)? {
                items.push(item);
            }
        }
        items.sort_by_key(|i| i.id);
        Ok(items)
    }

    /// Append an op and return its item id; never blocks on the backend
    pub fn enqueue(&self, op: SyncOp) -> SyncResult<Ulid> {
        let id = self
            .ids
            .lock()
            .generate()
            .unwrap_or_else(|_| Ulid::new());
        let item = QueueItem {
            id,
            op,
            attempts: 0,
            created_at: Utc::now(),
        };
        tracing::debug!(item = %id, kind = item.op.kind(), "enqueued");
        put_typed(self.store.as_ref(), &item_key(id), &item)?;
        Ok(id)
    }

    /// The oldest pending item, if any
    pub fn head(&self) -> SyncResult<Option<QueueItem>> {
        Ok(self.load()?.into_iter().next())
    }

    /// Remove an item by id; absent ids are a no-op
    pub fn remove(&self, id: Ulid) -> SyncResult<()> {
        self.store.delete(&item_key(id))?;
        Ok(())
    }

    /// Increment an item's attempt count, returning the new count
    ///
    /// Returns 0 when the item vanished between head and bump.
    pub fn bump_attempts(&self, id: Ulid) -> SyncResult<u32> {
        let key = item_key(id);
        let Some(mut item) = get_typed::<QueueItem>(self.store.as_ref(), &key)? else {
            return Ok(0);
        };
        item.attempts += 1;
        put_typed(self.store.as_ref(), &key, &item)?;
        Ok(item.attempts)
    }

    /// Number of pending items
    pub fn len(&self) -> SyncResult<usize> {
        Ok(self
            .store
            .keys()?
            .iter()
            .filter(|k| k.starts_with(ITEM_KEY_PREFIX))
            .count())
    }

    /// True when nothing is pending
    pub fn is_empty(&self) -> SyncResult<bool> {
        Ok(self.len()? == 0)
    }

    /// True when any pending item concerns the given sample
    ///
    /// Remote updates for a sample must wait while this holds.
    pub fn has_pending_for(&self, id: &SampleId) -> SyncResult<bool> {
        Ok(self
            .load()?
            .iter()
            .any(|i| i.op.sample_id() == Some(id)))
    }

    /// Snapshot of all pending items in FIFO order
    pub fn items(&self) -> SyncResult<Vec<QueueItem>> {
        self.load()
    }
}
