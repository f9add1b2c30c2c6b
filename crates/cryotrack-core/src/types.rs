//! Core types for the sample inventory
//!
//! Defines the domain model shared by every crate:
//! - Sample identity and grid addresses
//! - Containers and their layouts
//! - The append-only sample history

use crate::normalize::{normalize_position, normalize_sample_id};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Canonicalized sample identifier
///
/// Construction always goes through [`normalize_sample_id`], so two
/// `SampleId`s compare equal iff the scanned strings denote the same
/// physical specimen.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SampleId(String);

impl SampleId {
    /// Canonicalize a scanned or typed identifier
    #[inline]
    #[must_use]
    pub fn new(raw: &str) -> Self {
        Self(normalize_sample_id(raw))
    }

    /// True when the raw input had no usable content
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The canonical string form
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SampleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Canonical grid address, e.g. `A14`
///
/// Construction always goes through [`normalize_position`]; every
/// duplicate/move decision depends on address equality.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Position(String);

impl Position {
    /// Canonicalize a free-form position token
    #[inline]
    #[must_use]
    pub fn new(raw: &str) -> Self {
        Self(normalize_position(raw))
    }

    /// Build from already-canonical parts (grid generation)
    #[inline]
    #[must_use]
    pub(crate) fn from_canonical(s: String) -> Self {
        Self(s)
    }

    /// True when the raw input had no usable content
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The canonical string form
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Unique container identifier (ULID for sortability)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContainerId(String);

impl ContainerId {
    /// Generate a new container id
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new().to_string())
    }

    /// Wrap a backend-assigned id
    #[inline]
    #[must_use]
    pub fn from_string(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as a string
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ContainerId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ContainerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle action recorded in a sample's history
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HistoryAction {
    /// Sample entered a container position
    #[serde(rename = "check-in")]
    CheckIn,
    /// Sample removed to the checked-out holding area
    #[serde(rename = "check-out")]
    CheckOut,
    /// Sample moved between positions or containers
    #[serde(rename = "moved")]
    Moved,
    /// Sample touched without relocation
    #[serde(rename = "accessed")]
    Accessed,
}

/// Immutable record of one lifecycle transition
///
/// Created only by the lifecycle engine and never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// When the transition happened
    pub timestamp: DateTime<Utc>,
    /// What happened
    pub action: HistoryAction,
    /// Operator initials
    pub user: String,
    /// Position vacated, for moves
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_position: Option<Position>,
    /// Position occupied, for moves
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_position: Option<Position>,
    /// Free-text note
    #[serde(default)]
    pub notes: String,
}

/// Whether a sample currently occupies a container position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleStatus {
    /// Stored at a container position
    InContainer,
    /// In the checked-out holding area
    CheckedOut,
}

/// One physical specimen's current state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Canonical identifier
    pub sample_id: SampleId,
    /// Containing unit; `None` while checked out
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container_id: Option<ContainerId>,
    /// Grid address; `None` while checked out
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    /// Calendar date of first storage
    pub storage_date: NaiveDate,
    /// Calendar date of last access, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_accessed: Option<NaiveDate>,
    /// Placement status
    pub status: SampleStatus,
    /// Archival flag, orthogonal to status
    #[serde(default)]
    pub is_archived: bool,
    /// Append-only lifecycle history; never truncated or rewritten
    pub history: Vec<HistoryEntry>,
}

impl Sample {
    /// Fresh unplaced sample with today's storage date and empty history
    #[must_use]
    pub fn new(sample_id: SampleId) -> Self {
        Self {
            sample_id,
            container_id: None,
            position: None,
            storage_date: Utc::now().date_naive(),
            last_accessed: None,
            status: SampleStatus::InContainer,
            is_archived: false,
            history: Vec::new(),
        }
    }

    /// True when the sample occupies the given position
    #[inline]
    #[must_use]
    pub fn occupies(&self, position: &Position) -> bool {
        self.status == SampleStatus::InContainer && self.position.as_ref() == Some(position)
    }
}

/// Physical layout of a container, determining row/column counts
///
/// The known codes mirror the production type table; custom layouts are
/// allowed since types are database-managed, not compiled in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContainerType {
    /// Layout code, e.g. `9x9-box`
    pub code: String,
    /// Row count
    pub rows: usize,
    /// Column count
    pub cols: usize,
}

impl ContainerType {
    /// Build a custom layout
    #[inline]
    #[must_use]
    pub fn new(code: impl Into<String>, rows: usize, cols: usize) -> Self {
        Self {
            code: code.into(),
            rows,
            cols,
        }
    }

    /// Look up one of the known layout codes
    #[must_use]
    pub fn preset(code: &str) -> Option<Self> {
        let (rows, cols) = match code {
            "9x9-box" | "9x9-rack" => (9, 9),
            "5x5-box" => (5, 5),
            "5x4-rack" => (5, 4),
            "7x14-rack" => (14, 7),
            _ => return None,
        };
        Some(Self::new(code, rows, cols))
    }

    /// All known layout codes
    #[must_use]
    pub fn known_codes() -> &'static [&'static str] {
        &["9x9-box", "5x5-box", "5x4-rack", "9x9-rack", "7x14-rack"]
    }

    /// Geometric capacity before disabled-cell exclusions
    #[inline]
    #[must_use]
    pub fn total_cells(&self) -> usize {
        self.rows * self.cols
    }
}

/// Kind of specimen stored in a container
///
/// Determines policy defaults such as disabled-cell exclusions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SampleType(String);

impl SampleType {
    /// Pooled samples stored in sets of four; 9x9 layouts lose one cell
    pub const DP_POOLS: &'static str = "DP Pools";
    /// IDT plates, stored in the inverted 14x7 rack orientation
    pub const IDT_PLATES: &'static str = "IDT Plates";

    /// Wrap a sample type name
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// All known sample type names
    #[must_use]
    pub fn known_names() -> &'static [&'static str] {
        &[
            "DP Pools",
            "cfDNA Tubes",
            "DTC Tubes",
            "MNC Tubes",
            "PA Pool Tubes",
            "Plasma Tubes",
            "BC Tubes",
            "IDT Plates",
        ]
    }

    /// The type name
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SampleType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A physical storage unit: box, rack or plate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Container {
    /// Unique id
    pub id: ContainerId,
    /// Display name
    pub name: String,
    /// Layout, determining the addressable grid
    pub container_type: ContainerType,
    /// Specimen kind, determining policy defaults
    pub sample_type: SampleType,
    /// Archived containers are exempt from the duplicate policy
    #[serde(default)]
    pub is_archived: bool,
}

impl Container {
    /// Create a container with a fresh id
    #[inline]
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        container_type: ContainerType,
        sample_type: SampleType,
    ) -> Self {
        Self {
            id: ContainerId::new(),
            name: name.into(),
            container_type,
            sample_type,
            is_archived: false,
        }
    }

    /// Mark archived
    #[inline]
    #[must_use]
    pub fn archived(mut self) -> Self {
        self.is_archived = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn container_id_generation() {
        let id1 = ContainerId::new();
        let id2 = ContainerId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn sample_id_canonical_equality() {
        assert_eq!(SampleId::new("  x1 "), SampleId::new("X1"));
    }

    #[test]
    fn container_type_presets() {
        let rack = ContainerType::preset("7x14-rack").unwrap();
        assert_eq!(rack.rows, 14);
        assert_eq!(rack.cols, 7);
        assert_eq!(rack.total_cells(), 98);

        assert!(ContainerType::preset("3x3-dish").is_none());
    }

    #[test]
    fn history_action_wire_format() {
        let json = serde_json::to_string(&HistoryAction::CheckIn).unwrap();
        assert_eq!(json, "\"check-in\"");
        let back: HistoryAction = serde_json::from_str("\"moved\"").unwrap();
        assert_eq!(back, HistoryAction::Moved);
    }

    #[test]
    fn sample_occupies_position() {
        let sample = Sample {
            sample_id: SampleId::new("S1"),
            container_id: Some(ContainerId::new()),
            position: Some(Position::new("A1")),
            storage_date: NaiveDate::from_ymd_opt(2026, 1, 5).unwrap(),
            last_accessed: None,
            status: SampleStatus::InContainer,
            is_archived: false,
            history: Vec::new(),
        };
        assert!(sample.occupies(&Position::new("a1")));
        assert!(!sample.occupies(&Position::new("A2")));
    }
}
