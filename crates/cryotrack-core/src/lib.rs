//! Cryotrack Core - placement decision logic
//!
//! The pure heart of the inventory:
//! - Canonicalizes scanned identifiers and position strings
//! - Generates addressable grids with layout-specific quirks
//! - Resolves what a scan means against every known container
//!
//! Everything here is synchronous, side-effect-free and total; outcomes
//! are reported through return values, never panics. I/O lives in the
//! store, sync and engine crates.

#![warn(unreachable_pub)]

pub mod error;
pub mod grid;
pub mod normalize;
pub mod resolver;
pub mod types;

// Re-exports for convenience
pub use error::PlacementError;
pub use grid::{DisabledCellRule, DisabledCellTable, Grid, GridCell, GridDimensions};
pub use normalize::{normalize_position, normalize_sample_id};
pub use resolver::{
    next_scan_target, resolve_placement, ConflictLocation, ContainerView, Decision,
    MoveConfirmation, PlacementPolicy, RejectReason,
};
pub use types::{
    Container, ContainerId, ContainerType, HistoryAction, HistoryEntry, Position, Sample,
    SampleId, SampleStatus, SampleType,
};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with the placement core
    pub use crate::{
        resolve_placement, Container, ContainerId, ContainerView, Decision, DisabledCellTable,
        Grid, GridDimensions, PlacementPolicy, Position, Sample, SampleId, SampleStatus,
        SampleType,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
