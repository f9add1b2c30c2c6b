//! Cryotrack Sync - offline-first backend delivery
//!
//! Lifecycle transitions commit locally first, then reach the backend
//! through a durable FIFO queue:
//! - [`op`]: self-contained write operations
//! - [`queue`]: the durable queue with retry bookkeeping
//! - [`backend`]: the opaque async write interface
//! - [`processor`]: the single sequential draining worker
//! - [`reconcile`]: realtime remote changes vs pending local writes
//!
//! Per-sample write order is preserved end to end; writes for different
//! samples have no ordering relationship.

#![warn(unreachable_pub)]

pub mod backend;
pub mod error;
pub mod op;
pub mod processor;
pub mod queue;
pub mod reconcile;

pub use backend::{BackendError, SyncBackend};
pub use error::{SyncError, SyncResult};
pub use op::SyncOp;
pub use processor::{ProcessorHandle, StepOutcome, SyncConfig, SyncProcessor};
pub use queue::{QueueItem, SyncQueue};
pub use reconcile::{apply_remote_change, ReconcileOutcome, RemoteChange};
