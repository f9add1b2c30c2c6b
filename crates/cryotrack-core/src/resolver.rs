//! Placement resolution
//!
//! Given a scanned identifier and a target address, decides what the scan
//! means: a new placement, an in-place move, a cross-container move, an
//! overwrite needing confirmation, or a policy rejection. The resolver
//! consults every known container but never mutates anything; its decision
//! is consumed by the lifecycle engine.

use crate::error::PlacementError;
use crate::grid::Grid;
use crate::types::{Container, ContainerId, Position, SampleId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Read-only snapshot of one container's occupancy, as the resolver sees it
#[derive(Debug, Clone)]
pub struct ContainerView {
    /// Container metadata
    pub container: Container,
    /// Occupied addresses, by canonical position
    occupancy: HashMap<Position, SampleId>,
}

impl ContainerView {
    /// Build a view from the container and its placed samples
    #[must_use]
    pub fn new(container: Container, placed: impl IntoIterator<Item = (Position, SampleId)>) -> Self {
        Self {
            container,
            occupancy: placed.into_iter().collect(),
        }
    }

    /// Where the identifier sits in this container, if anywhere
    #[must_use]
    pub fn position_of(&self, id: &SampleId) -> Option<&Position> {
        self.occupancy
            .iter()
            .find_map(|(pos, sid)| (sid == id).then_some(pos))
    }

    /// The identifier occupying an address, if any
    #[inline]
    #[must_use]
    pub fn occupant_at(&self, position: &Position) -> Option<&SampleId> {
        self.occupancy.get(position)
    }

    /// Whether the address is occupied
    #[inline]
    #[must_use]
    pub fn is_occupied(&self, position: &Position) -> bool {
        self.occupancy.contains_key(position)
    }

    /// Number of placed samples
    #[inline]
    #[must_use]
    pub fn occupied_count(&self) -> usize {
        self.occupancy.len()
    }
}

/// When a cross-container auto-move demands operator confirmation
///
/// Observed production behavior moved silently in all cases; whether that
/// is safe when the displaced sample has meaningful history is a policy
/// question, so it is configuration rather than hard-coded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveConfirmation {
    /// Move silently, matching observed behavior
    #[default]
    Never,
    /// Confirm only when the move crosses the archived/active boundary
    CrossArchiveOnly,
    /// Confirm every cross-container move, like overwrites
    Always,
}

/// Policy knobs consulted while resolving a scan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementPolicy {
    /// Relocate a duplicate found in another container instead of
    /// rejecting the scan
    pub auto_move_across_containers: bool,
    /// Confirmation requirement for cross-container moves
    pub confirm_moves: MoveConfirmation,
}

impl PlacementPolicy {
    /// Production defaults
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Disable auto-moves; cross-container duplicates become rejections
    #[inline]
    #[must_use]
    pub fn with_auto_move_disabled(mut self) -> Self {
        self.auto_move_across_containers = false;
        self
    }

    /// Set the move-confirmation requirement
    #[inline]
    #[must_use]
    pub fn with_confirmation(mut self, confirm: MoveConfirmation) -> Self {
        self.confirm_moves = confirm;
        self
    }
}

impl Default for PlacementPolicy {
    fn default() -> Self {
        Self {
            auto_move_across_containers: true,
            confirm_moves: MoveConfirmation::Never,
        }
    }
}

/// A conflicting location reported with a rejection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConflictLocation {
    /// Container holding the duplicate
    pub container_id: ContainerId,
    /// Its display name, for the operator message
    pub container_name: String,
    /// Where the duplicate sits
    pub position: Position,
}

/// Why a scan was rejected
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RejectReason {
    /// Identifier already placed in the active population and auto-move
    /// is disabled; every conflicting location is listed
    DuplicateInActive(Vec<ConflictLocation>),
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RejectReason::DuplicateInActive(locations) => {
                let listed: Vec<String> = locations
                    .iter()
                    .map(|l| format!("{} ({})", l.container_name, l.position))
                    .collect();
                write!(f, "duplicate sample id in: {}", listed.join(", "))
            }
        }
    }
}

/// What a scan means
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Identifier not known anywhere; occupy the address
    PlaceNew {
        /// Address to occupy
        position: Position,
    },
    /// Identifier already lives in this container at another address
    MoveWithinContainer {
        /// Current address
        from: Position,
        /// Scanned target
        to: Position,
    },
    /// Identifier found in a different container; relocate it here
    MoveFromOtherContainer {
        /// Container currently holding the sample
        source_container: ContainerId,
        /// Address there
        source_position: Position,
        /// Scanned target here
        to: Position,
        /// Operator must confirm before the move proceeds
        requires_confirmation: bool,
    },
    /// Scan violates the duplicate policy
    Reject(RejectReason),
    /// Target already holds a different identifier; explicit confirmation
    /// must precede displacing the occupant
    OverwriteRequired {
        /// Identifier currently at the target
        occupant: SampleId,
        /// The contested address
        position: Position,
    },
}

/// Resolve a scan against the current container and the rest of the system.
///
/// `target` of `None` means "next free address, column-major". The duplicate
/// policy is evaluated in fixed order: archived containers first (exempt),
/// then the active population, then archived holdings, then target
/// occupancy. Capacity exhaustion is reported before any decision that
/// would need an address.
pub fn resolve_placement(
    scanned_id: &SampleId,
    target: Option<&Position>,
    current: &ContainerView,
    others: &[ContainerView],
    grid: &Grid,
    policy: &PlacementPolicy,
) -> Result<Decision, PlacementError> {
    if scanned_id.is_empty() {
        return Err(PlacementError::EmptyIdentifier);
    }

    let to = match target {
        Some(pos) => {
            if !grid.contains(pos) {
                return Err(PlacementError::UnknownPosition(pos.clone()));
            }
            if grid.is_disabled(pos) {
                return Err(PlacementError::DisabledPosition(pos.clone()));
            }
            pos.clone()
        }
        None => grid
            .first_free(|p| current.is_occupied(p))
            .ok_or(PlacementError::ContainerFull)?,
    };

    // A rescan inside the same container is always a move, archived or not.
    if let Some(from) = current.position_of(scanned_id) {
        return Ok(Decision::MoveWithinContainer {
            from: from.clone(),
            to,
        });
    }

    // Archived containers are exempt from the uniqueness policy entirely.
    if !current.container.is_archived {
        let found: Vec<(&ContainerView, &Position)> = others
            .iter()
            .filter_map(|view| view.position_of(scanned_id).map(|pos| (view, pos)))
            .collect();

        let active: Vec<&(&ContainerView, &Position)> = found
            .iter()
            .filter(|(view, _)| !view.container.is_archived)
            .collect();

        if !active.is_empty() && !policy.auto_move_across_containers {
            let locations = active
                .iter()
                .map(|(view, pos)| ConflictLocation {
                    container_id: view.container.id.clone(),
                    container_name: view.container.name.clone(),
                    position: (*pos).clone(),
                })
                .collect();
            return Ok(Decision::Reject(RejectReason::DuplicateInActive(locations)));
        }

        // A scan signals physical presence here, superseding the recorded
        // location: relocate from the active population first, otherwise
        // pull the sample out of archive.
        let source = active.first().copied().or(found.first());
        if let Some((view, pos)) = source {
            let requires_confirmation = match policy.confirm_moves {
                MoveConfirmation::Never => false,
                MoveConfirmation::Always => true,
                MoveConfirmation::CrossArchiveOnly => view.container.is_archived,
            };
            return Ok(Decision::MoveFromOtherContainer {
                source_container: view.container.id.clone(),
                source_position: (*pos).clone(),
                to,
                requires_confirmation,
            });
        }
    }

    if let Some(occupant) = current.occupant_at(&to) {
        if occupant != scanned_id {
            return Ok(Decision::OverwriteRequired {
                occupant: occupant.clone(),
                position: to,
            });
        }
    }

    Ok(Decision::PlaceNew { position: to })
}

/// Propose the address the scanner should target next: the first usable
/// free cell after the one just used, wrapping around; `None` means the
/// container is full.
#[must_use]
pub fn next_scan_target(grid: &Grid, just_used: &Position, current: &ContainerView) -> Option<Position> {
    grid.next_free_after(just_used, |p| current.is_occupied(p))
}
