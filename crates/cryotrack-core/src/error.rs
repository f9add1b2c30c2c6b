//! Error types for placement decisions
//!
//! Decision-level functions are total: these errors are ordinary return
//! values reported before any state mutation, never panics.

use crate::types::Position;

/// Failures while resolving a placement request
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlacementError {
    /// Scanned identifier normalized to nothing usable
    #[error("empty sample identifier")]
    EmptyIdentifier,

    /// Target address does not exist in this layout
    #[error("position {0} not in grid")]
    UnknownPosition(Position),

    /// Target address is policy-excluded for this sample type
    #[error("position {0} is disabled for this layout")]
    DisabledPosition(Position),

    /// No usable free address remains anywhere in the grid
    #[error("container full")]
    ContainerFull,
}
