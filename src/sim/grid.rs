//! Arena grid: world <-> cell transforms and auto-sizing
//!
//! The inner playfield is `cols x rows` cells starting at `(margin, margin)`.
//! World size adds the margin on both sides.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::{Rect, Settings};

/// Smallest allowed grid dimension
pub const MIN_GRID_DIM: u32 = 3;
/// Largest allowed grid dimension
pub const MAX_GRID_DIM: u32 = 256;

/// Guard against a zero or negative budget fraction
const FRACTION_EPSILON: f64 = 0.0001;

/// Cell address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellAddr {
    pub row: u32,
    pub col: u32,
}

impl CellAddr {
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    pub fn label(&self) -> String {
        cell_label(self.row, self.col)
    }
}

/// Cell partition of the arena. Immutable for an epoch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArenaGrid {
    pub cols: u32,
    pub rows: u32,
    pub cell_width: f32,
    pub cell_height: f32,
    pub margin: f32,
}

impl ArenaGrid {
    pub fn new(cols: u32, rows: u32, cell_width: f32, cell_height: f32, margin: f32) -> Self {
        Self {
            cols: cols.clamp(MIN_GRID_DIM, MAX_GRID_DIM),
            rows: rows.clamp(MIN_GRID_DIM, MAX_GRID_DIM),
            cell_width,
            cell_height,
            margin,
        }
    }

    /// Grid as configured (call after `Settings::finalized`)
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.grid_cols,
            settings.grid_rows,
            settings.cell_width,
            settings.cell_height,
            settings.arena_margin,
        )
    }

    pub fn cell_count(&self) -> u64 {
        u64::from(self.cols) * u64::from(self.rows)
    }

    /// Total world size including the margin on both sides
    pub fn world_size(&self) -> Vec2 {
        Vec2::new(
            self.margin * 2.0 + self.cols as f32 * self.cell_width,
            self.margin * 2.0 + self.rows as f32 * self.cell_height,
        )
    }

    /// Inner playfield (the walled area)
    pub fn playfield(&self) -> Rect {
        let min = Vec2::splat(self.margin);
        let max = min
            + Vec2::new(
                self.cols as f32 * self.cell_width,
                self.rows as f32 * self.cell_height,
            );
        Rect::new(min, max)
    }

    /// Cell containing a world point, or `None` outside the playfield
    pub fn world_to_cell(&self, p: Vec2) -> Option<CellAddr> {
        if !self.playfield().contains(p) {
            return None;
        }
        let col = ((p.x - self.margin) / self.cell_width).floor() as u32;
        let row = ((p.y - self.margin) / self.cell_height).floor() as u32;
        // Float rounding right below the far edge can land one past the end
        Some(CellAddr::new(row.min(self.rows - 1), col.min(self.cols - 1)))
    }

    /// World-space center of a cell
    pub fn cell_to_center(&self, addr: CellAddr) -> Vec2 {
        Vec2::new(
            self.margin + addr.col as f32 * self.cell_width + self.cell_width / 2.0,
            self.margin + addr.row as f32 * self.cell_height + self.cell_height / 2.0,
        )
    }

    /// Every cell address in row-major order
    pub fn cells(&self) -> impl Iterator<Item = CellAddr> + '_ {
        (0..self.rows).flat_map(move |row| (0..self.cols).map(move |col| CellAddr::new(row, col)))
    }
}

/// Human-readable label: bijective base-26 row letters then 1-based column.
/// Row 0 -> "A", 25 -> "Z", 26 -> "AA".
pub fn cell_label(row: u32, col: u32) -> String {
    let mut letters = Vec::new();
    let mut r = row as i64;
    while r >= 0 {
        letters.push((b'A' + (r % 26) as u8) as char);
        r = r / 26 - 1;
    }
    letters.reverse();
    let mut label: String = letters.into_iter().collect();
    label.push_str(&(col + 1).to_string());
    label
}

/// Smallest roughly-square grid whose cell count keeps `requested` specials
/// within `max_fraction` of all cells. Both dimensions are at least 3.
pub fn auto_size(requested: u32, max_fraction: f32) -> (u32, u32) {
    let fraction = (max_fraction as f64).max(FRACTION_EPSILON);
    let min_cells = ((requested as f64 / fraction).ceil() as u64).max(1);
    let cols = (min_cells as f64).sqrt().ceil() as u64;
    let rows = min_cells.div_ceil(cols);
    (
        (cols.min(u32::MAX as u64) as u32).max(MIN_GRID_DIM),
        (rows.min(u32::MAX as u64) as u32).max(MIN_GRID_DIM),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn six_by_six() -> ArenaGrid {
        ArenaGrid::new(6, 6, 600.0, 600.0, 56.0)
    }

    #[test]
    fn test_world_size_and_corners() {
        let grid = six_by_six();
        assert_eq!(grid.world_size(), Vec2::new(3656.0, 3656.0));

        let a1 = grid.world_to_cell(Vec2::new(56.0, 56.0)).unwrap();
        assert_eq!(a1, CellAddr::new(0, 0));
        assert_eq!(a1.label(), "A1");

        let f6 = grid.world_to_cell(Vec2::new(3655.0, 3655.0)).unwrap();
        assert_eq!(f6, CellAddr::new(5, 5));
        assert_eq!(f6.label(), "F6");
    }

    #[test]
    fn test_outside_playfield() {
        let grid = six_by_six();
        assert_eq!(grid.world_to_cell(Vec2::new(55.9, 100.0)), None);
        assert_eq!(grid.world_to_cell(Vec2::new(3656.0, 100.0)), None);
        assert_eq!(grid.world_to_cell(Vec2::new(-500.0, 9000.0)), None);
    }

    #[test]
    fn test_cell_center() {
        let grid = six_by_six();
        assert_eq!(grid.cell_to_center(CellAddr::new(0, 0)), Vec2::new(356.0, 356.0));
        assert_eq!(grid.cell_to_center(CellAddr::new(1, 2)), Vec2::new(1556.0, 956.0));
        let back = grid.world_to_cell(grid.cell_to_center(CellAddr::new(4, 3)));
        assert_eq!(back, Some(CellAddr::new(4, 3)));
    }

    #[test]
    fn test_labels() {
        assert_eq!(cell_label(0, 0), "A1");
        assert_eq!(cell_label(1, 3), "B4");
        assert_eq!(cell_label(25, 9), "Z10");
        assert_eq!(cell_label(26, 0), "AA1");
        assert_eq!(cell_label(27, 1), "AB2");
        assert_eq!(cell_label(701, 0), "ZZ1");
        assert_eq!(cell_label(702, 0), "AAA1");
    }

    #[test]
    fn test_auto_size_scenarios() {
        assert_eq!(auto_size(8, 1.0 / 3.0), (5, 5));
        assert_eq!(auto_size(0, 1.0 / 3.0), (3, 3));
        assert_eq!(auto_size(6, 1.0 / 3.0), (5, 4));
        assert_eq!(auto_size(100, 1.0), (10, 10));
        // Zero fraction falls back to epsilon instead of dividing by zero
        let (c, r) = auto_size(1, 0.0);
        assert!(c as u64 * r as u64 >= 10_000);
    }

    #[test]
    fn test_grid_never_degenerate() {
        let grid = ArenaGrid::new(1, 0, 10.0, 10.0, 0.0);
        assert_eq!((grid.cols, grid.rows), (3, 3));
        assert_eq!(grid.cells().count(), 9);

        let grid = ArenaGrid::new(70_000, u32::MAX, 10.0, 10.0, 0.0);
        assert_eq!((grid.cols, grid.rows), (MAX_GRID_DIM, MAX_GRID_DIM));
        assert_eq!(grid.cell_count(), 65_536);
    }

    proptest! {
        #[test]
        fn prop_auto_size_fits_budget(requested in 0u32..2_000, fraction in 0.01f32..=1.0) {
            let (cols, rows) = auto_size(requested, fraction);
            prop_assert!(cols >= 3 && rows >= 3);
            let needed = (requested as f64 / fraction as f64).ceil() as u64;
            prop_assert!(cols as u64 * rows as u64 >= needed);
        }

        #[test]
        fn prop_inside_points_map_to_valid_cells(x in 56.0f32..3656.0, y in 56.0f32..3656.0) {
            let grid = six_by_six();
            let cell = grid.world_to_cell(Vec2::new(x, y));
            prop_assert!(cell.is_some());
            let cell = cell.unwrap();
            prop_assert!(cell.row < 6 && cell.col < 6);
        }
    }
}
