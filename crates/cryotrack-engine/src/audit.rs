//! Audit event emission
//!
//! Every lifecycle transition emits one structured event to an
//! [`AuditSink`]. Delivery is strictly best-effort: a sink failure is
//! logged and swallowed, never propagated into the transition.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How serious an audited action was
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditSeverity {
    /// Routine operation
    #[default]
    Info,
    /// Unusual but handled
    Warning,
    /// Destructive or policy-relevant
    Critical,
}

/// One structured audit event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    /// What happened, e.g. `sample-moved`
    pub action_type: String,
    /// Kind of resource acted on: `sample` or `container`
    pub resource_type: String,
    /// Identifier of the resource
    pub resource_id: String,
    /// Human-readable summary
    pub description: String,
    /// Structured details, positions and container names included
    pub metadata: Value,
    /// Severity classification
    #[serde(default)]
    pub severity: AuditSeverity,
    /// Whether the underlying operation succeeded
    #[serde(default = "default_true")]
    pub success: bool,
}

fn default_true() -> bool {
    true
}

impl AuditEvent {
    /// Build a sample-scoped event
    #[must_use]
    pub fn sample(action_type: &str, sample_id: &str, description: String, metadata: Value) -> Self {
        Self {
            action_type: action_type.to_string(),
            resource_type: "sample".to_string(),
            resource_id: sample_id.to_string(),
            description,
            metadata,
            severity: AuditSeverity::Info,
            success: true,
        }
    }

    /// Build a container-scoped event
    #[must_use]
    pub fn container(
        action_type: &str,
        container_id: &str,
        description: String,
        metadata: Value,
    ) -> Self {
        Self {
            action_type: action_type.to_string(),
            resource_type: "container".to_string(),
            resource_id: container_id.to_string(),
            description,
            metadata,
            severity: AuditSeverity::Info,
            success: true,
        }
    }

    /// Override the severity
    #[inline]
    #[must_use]
    pub fn with_severity(mut self, severity: AuditSeverity) -> Self {
        self.severity = severity;
        self
    }

    /// Mark the underlying operation as failed
    #[inline]
    #[must_use]
    pub fn failed(mut self) -> Self {
        self.success = false;
        self
    }
}

/// Failure delivering an audit event
#[derive(Debug, thiserror::Error)]
#[error("audit delivery failed: {0}")]
pub struct AuditError(pub String);

/// Destination for audit events
pub trait AuditSink: Send + Sync {
    /// Deliver one event
    ///
    /// # Errors
    /// Returns an error on delivery failure; callers must treat this as
    /// non-fatal.
    fn record(&self, event: AuditEvent) -> Result<(), AuditError>;
}

/// Deliver an event, logging instead of failing when the sink is down
pub(crate) fn emit(sink: &dyn AuditSink, event: AuditEvent) {
    let action = event.action_type.clone();
    let resource = event.resource_id.clone();
    if let Err(e) = sink.record(event) {
        tracing::warn!(action, resource, error = %e, "audit event lost");
    }
}

/// Sink that writes events to the log stream
#[derive(Debug, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, event: AuditEvent) -> Result<(), AuditError> {
        tracing::info!(
            action = event.action_type,
            resource_type = event.resource_type,
            resource = event.resource_id,
            severity = ?event.severity,
            success = event.success,
            metadata = %event.metadata,
            "{}",
            event.description
        );
        Ok(())
    }
}

/// In-memory sink for tests
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    events: Mutex<Vec<AuditEvent>>,
}

impl MemoryAuditSink {
    /// Empty sink
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of recorded events in order
    #[must_use]
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().clone()
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, event: AuditEvent) -> Result<(), AuditError> {
        self.events.lock().push(event);
        Ok(())
    }
}
