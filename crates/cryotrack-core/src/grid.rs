//! Grid addressing for container layouts
//!
//! Translates a container's row/column dimensions into the addressable
//! grid of canonical positions, including:
//! - the inverted orientation used by 14x7 racks
//! - table-driven disabled cells (policy-excluded, not geometric)
//! - column-major free-cell search for scan auto-advance

use crate::types::{ContainerType, Position, SampleType};
use serde::{Deserialize, Serialize};

/// Row/column dimensions of a layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridDimensions {
    /// Row count
    pub rows: usize,
    /// Column count
    pub cols: usize,
}

impl GridDimensions {
    /// Create dimensions
    #[inline]
    #[must_use]
    pub fn new(rows: usize, cols: usize) -> Self {
        Self { rows, cols }
    }

    /// The one rack geometry read in the opposite physical orientation:
    /// 14 rows by 7 columns, labelled `<colLetter><rowNumber>` with row
    /// numbers descending.
    #[inline]
    #[must_use]
    pub fn is_inverted(&self) -> bool {
        self.rows == 14 && self.cols == 7
    }
}

impl From<&ContainerType> for GridDimensions {
    fn from(ct: &ContainerType) -> Self {
        Self::new(ct.rows, ct.cols)
    }
}

/// Spreadsheet-style letters for a zero-based index: `A..Z, AA, AB, …`
#[must_use]
pub fn index_to_letters(index: usize) -> String {
    let mut result = String::new();
    let mut i = index as i64;
    while i >= 0 {
        result.insert(0, (b'A' + (i % 26) as u8) as char);
        i = i / 26 - 1;
    }
    result
}

/// One cell-exclusion rule, keyed by sample type and layout dimensions
///
/// Disabled cells are policy decisions carried in data, so new layouts can
/// add exclusions without code changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisabledCellRule {
    /// Sample type the rule applies to
    pub sample_type: SampleType,
    /// Layout dimensions the rule applies to
    pub dimensions: GridDimensions,
    /// Addresses excluded from placement
    pub cells: Vec<Position>,
}

/// Lookup table of disabled-cell rules
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DisabledCellTable {
    rules: Vec<DisabledCellRule>,
}

impl DisabledCellTable {
    /// Empty table: no exclusions anywhere
    #[inline]
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// The production defaults: pooled samples come in sets of four, so a
    /// 9x9 layout holds 80, with the last-row/last-column cell excluded.
    #[must_use]
    pub fn standard() -> Self {
        let dims = GridDimensions::new(9, 9);
        Self::empty().with_last_cell_disabled(SampleType::new(SampleType::DP_POOLS), dims)
    }

    /// Add a rule
    #[inline]
    #[must_use]
    pub fn with_rule(mut self, rule: DisabledCellRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Add a rule excluding the final cell of a layout
    #[must_use]
    pub fn with_last_cell_disabled(self, sample_type: SampleType, dims: GridDimensions) -> Self {
        let last = standard_address(dims.rows - 1, dims.cols - 1, dims);
        self.with_rule(DisabledCellRule {
            sample_type,
            dimensions: dims,
            cells: vec![last],
        })
    }

    /// Excluded addresses for a sample type on a layout
    #[must_use]
    pub fn cells_for(&self, sample_type: &SampleType, dims: GridDimensions) -> Vec<&Position> {
        self.rules
            .iter()
            .filter(|r| &r.sample_type == sample_type && r.dimensions == dims)
            .flat_map(|r| r.cells.iter())
            .collect()
    }
}

/// One addressable grid cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridCell {
    /// Canonical address
    pub position: Position,
    /// Zero-based row index, top to bottom
    pub row: usize,
    /// Zero-based column index, left to right
    pub col: usize,
    /// Policy-excluded from placement
    pub disabled: bool,
}

/// The addressable grid of one container layout
///
/// Cells are stored in row-major generation order; free-cell search runs
/// column-major (left to right, top to bottom within a column), which is
/// the order operators fill boxes.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    dims: GridDimensions,
    cells: Vec<GridCell>,
}

impl Grid {
    /// Generate the grid for a layout and sample type
    #[must_use]
    pub fn generate(
        dims: GridDimensions,
        sample_type: &SampleType,
        disabled: &DisabledCellTable,
    ) -> Self {
        let excluded = disabled.cells_for(sample_type, dims);
        let mut cells = Vec::with_capacity(dims.rows * dims.cols);
        for row in 0..dims.rows {
            for col in 0..dims.cols {
                let position = address(row, col, dims);
                let disabled = excluded.iter().any(|p| **p == position);
                cells.push(GridCell {
                    position,
                    row,
                    col,
                    disabled,
                });
            }
        }
        Self { dims, cells }
    }

    /// Layout dimensions
    #[inline]
    #[must_use]
    pub fn dimensions(&self) -> GridDimensions {
        self.dims
    }

    /// Cells in row-major generation order
    #[inline]
    pub fn cells(&self) -> impl Iterator<Item = &GridCell> {
        self.cells.iter()
    }

    /// Number of cells usable for placement
    #[inline]
    #[must_use]
    pub fn usable_count(&self) -> usize {
        self.cells.iter().filter(|c| !c.disabled).count()
    }

    /// Whether the address exists in this grid
    #[inline]
    #[must_use]
    pub fn contains(&self, position: &Position) -> bool {
        self.cell(position).is_some()
    }

    /// The cell at an address, if it exists
    #[must_use]
    pub fn cell(&self, position: &Position) -> Option<&GridCell> {
        self.cells.iter().find(|c| &c.position == position)
    }

    /// Whether the address is policy-excluded
    #[inline]
    #[must_use]
    pub fn is_disabled(&self, position: &Position) -> bool {
        self.cell(position).is_some_and(|c| c.disabled)
    }

    /// Cells in column-major order: left to right, top to bottom within a
    /// column.
    fn column_major(&self) -> impl Iterator<Item = &GridCell> {
        let mut ordered: Vec<&GridCell> = self.cells.iter().collect();
        ordered.sort_by_key(|c| (c.col, c.row));
        ordered.into_iter()
    }

    /// First usable free cell in column-major order
    #[must_use]
    pub fn first_free(&self, is_occupied: impl Fn(&Position) -> bool) -> Option<Position> {
        self.column_major()
            .find(|c| !c.disabled && !is_occupied(&c.position))
            .map(|c| c.position.clone())
    }

    /// Next usable free cell strictly after `after` in column-major order,
    /// wrapping to the grid's first free cell if none remain past it.
    ///
    /// Returns `None` only when no usable free cell exists anywhere, which
    /// callers must surface as "container full".
    #[must_use]
    pub fn next_free_after(
        &self,
        after: &Position,
        is_occupied: impl Fn(&Position) -> bool,
    ) -> Option<Position> {
        let anchor = self.cell(after).map(|c| (c.col, c.row));
        if let Some(anchor) = anchor {
            let found = self
                .column_major()
                .filter(|c| (c.col, c.row) > anchor)
                .find(|c| !c.disabled && !is_occupied(&c.position))
                .map(|c| c.position.clone());
            if found.is_some() {
                return found;
            }
        }
        self.first_free(is_occupied)
    }
}

/// Address of a cell under the layout's labelling mode
fn address(row: usize, col: usize, dims: GridDimensions) -> Position {
    if dims.is_inverted() {
        inverted_address(row, col, dims)
    } else {
        standard_address(row, col, dims)
    }
}

/// Standard mode: `<rowLetters><colNumber>`, rows `A..`, columns `1..=N`
fn standard_address(row: usize, col: usize, _dims: GridDimensions) -> Position {
    Position::from_canonical(format!("{}{}", index_to_letters(row), col + 1))
}

/// Inverted mode: `<colLetter><rowNumber>`, columns `A..G`, row numbers
/// descending from the row count. The physical rack is read in the
/// opposite orientation to a standard box; labels must match the plastic.
fn inverted_address(row: usize, col: usize, dims: GridDimensions) -> Position {
    Position::from_canonical(format!("{}{}", index_to_letters(col), dims.rows - row))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashSet;

    fn dp_pools() -> SampleType {
        SampleType::new(SampleType::DP_POOLS)
    }

    fn plasma() -> SampleType {
        SampleType::new("Plasma Tubes")
    }

    #[test]
    fn letters_roll_over_past_z() {
        assert_eq!(index_to_letters(0), "A");
        assert_eq!(index_to_letters(25), "Z");
        assert_eq!(index_to_letters(26), "AA");
        assert_eq!(index_to_letters(27), "AB");
    }

    #[test]
    fn standard_grid_addresses() {
        let grid = Grid::generate(
            GridDimensions::new(2, 3),
            &plasma(),
            &DisabledCellTable::empty(),
        );
        let addrs: Vec<&str> = grid.cells().map(|c| c.position.as_str()).collect();
        assert_eq!(addrs, vec!["A1", "A2", "A3", "B1", "B2", "B3"]);
    }

    #[test]
    fn inverted_grid_descends_from_row_count() {
        let grid = Grid::generate(
            GridDimensions::new(14, 7),
            &SampleType::new(SampleType::IDT_PLATES),
            &DisabledCellTable::standard(),
        );

        // Top row is A14..G14, bottom row is A1..G1.
        let addrs: Vec<&str> = grid.cells().map(|c| c.position.as_str()).collect();
        assert_eq!(&addrs[..7], &["A14", "B14", "C14", "D14", "E14", "F14", "G14"]);
        assert_eq!(addrs.last(), Some(&"G1"));

        // Row numbers strictly descend top to bottom within each column.
        for col in 0..7 {
            let numbers: Vec<usize> = grid
                .cells()
                .filter(|c| c.col == col)
                .map(|c| c.position.as_str()[1..].parse().unwrap())
                .collect();
            assert_eq!(numbers, (1..=14).rev().collect::<Vec<_>>());
        }
        assert_eq!(grid.usable_count(), 98);
    }

    #[test]
    fn dp_pools_nine_by_nine_has_eighty_usable() {
        let grid = Grid::generate(
            GridDimensions::new(9, 9),
            &dp_pools(),
            &DisabledCellTable::standard(),
        );
        assert_eq!(grid.usable_count(), 80);
        assert!(grid.is_disabled(&Position::new("I9")));
        assert!(!grid.is_disabled(&Position::new("I8")));
    }

    #[test]
    fn disabled_rule_is_layout_scoped() {
        // Same sample type on a different layout keeps every cell.
        let grid = Grid::generate(
            GridDimensions::new(5, 5),
            &dp_pools(),
            &DisabledCellTable::standard(),
        );
        assert_eq!(grid.usable_count(), 25);
    }

    #[test]
    fn first_free_runs_column_major() {
        let grid = Grid::generate(
            GridDimensions::new(3, 3),
            &plasma(),
            &DisabledCellTable::empty(),
        );
        let occupied: HashSet<Position> = [Position::new("A1"), Position::new("B1")]
            .into_iter()
            .collect();
        // Column 1 fills top to bottom before column 2 is touched.
        let free = grid.first_free(|p| occupied.contains(p));
        assert_eq!(free, Some(Position::new("C1")));
    }

    #[test]
    fn next_free_wraps_to_start() {
        let grid = Grid::generate(
            GridDimensions::new(2, 2),
            &plasma(),
            &DisabledCellTable::empty(),
        );
        let occupied: HashSet<Position> = [Position::new("A2"), Position::new("B2")]
            .into_iter()
            .collect();
        let next = grid.next_free_after(&Position::new("B1"), |p| occupied.contains(p));
        assert_eq!(next, Some(Position::new("A1")));
    }

    #[test]
    fn next_free_skips_disabled_cell() {
        let grid = Grid::generate(
            GridDimensions::new(9, 9),
            &dp_pools(),
            &DisabledCellTable::standard(),
        );
        // Everything before I9 in column-major order is occupied; the
        // disabled I9 must be skipped, reporting the grid as full.
        let next = grid.next_free_after(&Position::new("H9"), |p| p != &Position::new("I9"));
        assert_eq!(next, None);
    }

    #[test]
    fn full_grid_reports_none() {
        let grid = Grid::generate(
            GridDimensions::new(2, 2),
            &plasma(),
            &DisabledCellTable::empty(),
        );
        assert_eq!(grid.first_free(|_| true), None);
    }
}
