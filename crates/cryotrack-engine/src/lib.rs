//! Cryotrack Engine - lifecycle transitions and the scan workflow
//!
//! Where decisions become state changes:
//! - [`lifecycle`]: the sample state machine; local-first writes, one
//!   history entry and one audit event per transition
//! - [`service`]: normalize, resolve, apply, advance for one scan
//! - [`audit`]: best-effort structured audit emission

#![warn(unreachable_pub)]

pub mod audit;
pub mod error;
pub mod lifecycle;
pub mod service;

pub use audit::{
    AuditError, AuditEvent, AuditSeverity, AuditSink, MemoryAuditSink, TracingAuditSink,
};
pub use error::{EngineError, EngineResult};
pub use lifecycle::LifecycleEngine;
pub use service::{PlacementService, ScanOutcome, ServiceConfig};
