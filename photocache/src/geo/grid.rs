//! Grid partitioning of a bounding box.
//!
//! A [`Grid`] divides a bounding box into `n × n` cells of equal size in
//! degrees. Cells are only used to compare how photos spread relative to each
//! other, so equal area on the sphere is not required.
//!
//! Points outside the box are clamped to the nearest edge cell. Upstream
//! rounding can leave a photo a hair outside the box that selected it, and
//! such photos still belong to the query.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{BoundingBox, GeoPoint};

/// Default number of cells per axis.
pub const DEFAULT_GRID_SIZE: u16 = 10;

/// Largest accepted number of cells per axis.
pub const MAX_GRID_SIZE: u16 = 64;

/// Errors produced when constructing a grid.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridError {
    #[error("Invalid grid size: {0}. Must be between 1 and 64")]
    InvalidSize(u16),
}

/// One rectangle of an `n × n` partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridCell {
    pub grid_x: u16,
    pub grid_y: u16,
}

impl GridCell {
    pub fn new(grid_x: u16, grid_y: u16) -> Self {
        Self { grid_x, grid_y }
    }
}

impl fmt::Display for GridCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.grid_x, self.grid_y)
    }
}

/// Square grid specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grid {
    size: u16,
}

impl Grid {
    /// Create a grid with `size` cells per axis.
    pub fn new(size: u16) -> Result<Self, GridError> {
        if size == 0 || size > MAX_GRID_SIZE {
            return Err(GridError::InvalidSize(size));
        }
        Ok(Self { size })
    }

    /// Cells per axis.
    pub fn size(&self) -> u16 {
        self.size
    }

    /// Total number of cells (`size²`).
    pub fn total_cells(&self) -> usize {
        self.size as usize * self.size as usize
    }

    /// Cell containing `point` within `bbox`.
    #[inline]
    pub fn cell_for(&self, point: GeoPoint, bbox: &BoundingBox) -> GridCell {
        GridCell {
            grid_x: self.axis_index(point.lon, bbox.min_lon, bbox.width()),
            grid_y: self.axis_index(point.lat, bbox.min_lat, bbox.height()),
        }
    }

    fn axis_index(&self, value: f64, min: f64, extent: f64) -> u16 {
        // Degenerate axis: every point shares the single column/row.
        if extent <= 0.0 || !extent.is_finite() {
            return 0;
        }
        let scaled = ((value - min) / extent * self.size as f64).floor();
        let max_index = (self.size - 1) as f64;
        // NaN compares false on both sides and falls through to 0.
        if scaled >= max_index {
            self.size - 1
        } else if scaled > 0.0 {
            scaled as u16
        } else {
            0
        }
    }
}

impl Default for Grid {
    fn default() -> Self {
        Self {
            size: DEFAULT_GRID_SIZE,
        }
    }
}

/// Map `point` to its cell in an `grid.size() × grid.size()` partition of `bbox`.
///
/// Pure and infallible: out-of-range points are clamped to edge cells.
#[inline]
pub fn cell_for(point: GeoPoint, bbox: &BoundingBox, grid: Grid) -> GridCell {
    grid.cell_for(point, bbox)
}
