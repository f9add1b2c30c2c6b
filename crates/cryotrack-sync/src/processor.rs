//! Queue draining loop
//!
//! One cooperative worker per process drains the queue head-first:
//! - empty queue: sleep `poll_interval`, re-check
//! - head item: attempt the backend write
//! - success: remove the item
//! - failure: bump `attempts`; drop the item once `max_attempts` is
//!   reached (loudly), otherwise back off `base_backoff * attempts`
//!
//! Strictly sequential delivery preserves per-sample write order. The
//! reentry guard rejects a second loop on the same processor; stopping
//! the loop never touches the durable store, so unacknowledged items
//! survive teardown.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;

use crate::backend::SyncBackend;
use crate::error::{SyncError, SyncResult};
use crate::queue::SyncQueue;

/// Tunables for the draining loop
///
/// The defaults match long-observed production behavior; both intervals
/// are deliberately coarse because the backend is remote and rate-limited.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Sleep between checks while the queue is empty
    pub poll_interval: Duration,
    /// Backoff unit; actual wait is `base_backoff * attempts`
    pub base_backoff: Duration,
    /// Delivery attempts before an item is dropped
    pub max_attempts: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(1000),
            base_backoff: Duration::from_millis(500),
            max_attempts: 5,
        }
    }
}

impl SyncConfig {
    /// Default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the empty-queue poll interval
    #[inline]
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the backoff unit
    #[inline]
    #[must_use]
    pub fn with_base_backoff(mut self, backoff: Duration) -> Self {
        self.base_backoff = backoff;
        self
    }

    /// Set the attempt limit
    #[inline]
    #[must_use]
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }
}

/// Handle for stopping a running processor loop
pub struct ProcessorHandle {
    stop: watch::Sender<bool>,
    task: tokio::task::JoinHandle<SyncResult<()>>,
}

impl ProcessorHandle {
    /// Signal the loop to stop and wait for it to finish
    ///
    /// Pending items stay in the durable queue.
    pub async fn stop(self) -> SyncResult<()> {
        let _ = self.stop.send(true);
        match self.task.await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(error = %e, "sync processor task panicked");
                Ok(())
            }
        }
    }
}

/// Sequential queue drainer
pub struct SyncProcessor {
    queue: Arc<SyncQueue>,
    backend: Arc<dyn SyncBackend>,
    config: SyncConfig,
    running: AtomicBool,
}

impl SyncProcessor {
    /// Build a processor over a queue and backend
    #[must_use]
    pub fn new(queue: Arc<SyncQueue>, backend: Arc<dyn SyncBackend>, config: SyncConfig) -> Self {
        Self {
            queue,
            backend,
            config,
            running: AtomicBool::new(false),
        }
    }

    /// Spawn the draining loop on the current runtime
    ///
    /// # Errors
    /// Returns [`SyncError::AlreadyRunning`] when a loop is already live
    /// for this processor.
    pub fn start(self: &Arc<Self>) -> SyncResult<ProcessorHandle> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(SyncError::AlreadyRunning);
        }
        let (stop, stop_rx) = watch::channel(false);
        let this = Arc::clone(self);
        let task = tokio::spawn(async move {
            let result = this.run(stop_rx).await;
            this.running.store(false, Ordering::Release);
            result
        });
        Ok(ProcessorHandle { stop, task })
    }

    /// Drain until stopped
    ///
    /// Exposed for deterministic driving in tests; production code goes
    /// through [`SyncProcessor::start`].
    pub async fn run(&self, mut stop: watch::Receiver<bool>) -> SyncResult<()> {
        tracing::info!(
            max_attempts = self.config.max_attempts,
            "sync processor started"
        );
        loop {
            if *stop.borrow() {
                break;
            }
            let wait = match self.step().await? {
                StepOutcome::Delivered | StepOutcome::Dropped => continue,
                StepOutcome::Idle => self.config.poll_interval,
                StepOutcome::Backoff(attempts) => self.config.base_backoff * attempts,
            };
            tokio::select! {
                _ = stop.changed() => {}
                () = tokio::time::sleep(wait) => {}
            }
        }
        tracing::info!("sync processor stopped");
        Ok(())
    }

    /// Process at most one queue item
    pub async fn step(&self) -> SyncResult<StepOutcome> {
        let Some(item) = self.queue.head()? else {
            return Ok(StepOutcome::Idle);
        };
        match self.backend.apply(&item.op).await {
            Ok(()) => {
                self.queue.remove(item.id)?;
                tracing::debug!(item = %item.id, kind = item.op.kind(), "delivered");
                Ok(StepOutcome::Delivered)
            }
            Err(e) => {
                let attempts = self.queue.bump_attempts(item.id)?;
                if attempts >= self.config.max_attempts {
                    // Accepted data loss, but never silent: the local
                    // record remains the only copy until reconciled.
                    tracing::error!(
                        item = %item.id,
                        kind = item.op.kind(),
                        attempts,
                        error = %e,
                        "dropping item after exhausting retries"
                    );
                    self.queue.remove(item.id)?;
                    Ok(StepOutcome::Dropped)
                } else {
                    tracing::warn!(
                        item = %item.id,
                        kind = item.op.kind(),
                        attempts,
                        error = %e,
                        "backend write failed, will retry"
                    );
                    Ok(StepOutcome::Backoff(attempts))
                }
            }
        }
    }
}

/// What one processor step did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Queue was empty
    Idle,
    /// Head item reached the backend and was removed
    Delivered,
    /// Head item failed; retry after backoff scaled by the attempt count
    Backoff(u32),
    /// Head item failed for the last time and was dropped
    Dropped,
}
