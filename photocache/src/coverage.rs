//! Coverage classification and per-region coverage records.
//!
//! A live fetch that returns fewer photos than it asked for has exhausted the
//! region: coverage is complete. One that returns as many as it asked for (or
//! more) may have left photos behind: coverage is incomplete.
//!
//! The verdict is recorded against a [`RegionKey`] and consulted on later
//! requests. It is never re-derived from the cache's own row count, since that
//! reflects what was fetched, not what exists upstream.
//!
//! # Region keys
//!
//! Keys snap each bbox edge outward onto a lattice of `cell_degrees`, so
//! near-identical viewports share one record:
//!
//! ```text
//! bbox 9.99312,53.5501,10.0044,53.5612  @ 0.01°  →  r0.01:999:5355:1001:5357
//! ```

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::geo::BoundingBox;

/// Default lattice spacing for region keys, in degrees.
pub const DEFAULT_REGION_CELL_DEGREES: f64 = 0.01;

/// Coverage verdict for a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverageStatus {
    /// Every photo in the region is believed cached.
    Complete,
    /// More photos may exist upstream than were fetched.
    Incomplete,
    /// No live fetch has been recorded.
    Unknown,
}

impl CoverageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CoverageStatus::Complete => "complete",
            CoverageStatus::Incomplete => "incomplete",
            CoverageStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for CoverageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a live fetch by how many photos it asked for and received.
///
/// Complete iff `returned_count < requested_count`.
#[inline]
pub fn classify(requested_count: usize, returned_count: usize) -> CoverageStatus {
    if returned_count < requested_count {
        CoverageStatus::Complete
    } else {
        CoverageStatus::Incomplete
    }
}

/// Stable identifier of a quantized region.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RegionKey(String);

impl RegionKey {
    /// Key for `bbox` on a lattice of `cell_degrees`.
    ///
    /// Non-positive or non-finite spacings fall back to
    /// [`DEFAULT_REGION_CELL_DEGREES`].
    pub fn for_bbox(bbox: &BoundingBox, cell_degrees: f64) -> Self {
        let cell = if cell_degrees.is_finite() && cell_degrees > 0.0 {
            cell_degrees
        } else {
            DEFAULT_REGION_CELL_DEGREES
        };
        let snap_down = |v: f64| (v / cell).floor() as i64;
        let snap_up = |v: f64| (v / cell).ceil() as i64;

        let x0 = snap_down(bbox.min_lon);
        let y0 = snap_down(bbox.min_lat);
        // A degenerate axis still spans one lattice cell.
        let x1 = snap_up(bbox.max_lon).max(x0 + 1);
        let y1 = snap_up(bbox.max_lat).max(y0 + 1);

        RegionKey(format!("r{cell}:{x0}:{y0}:{x1}:{y1}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RegionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of the most recent live fetch for a region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverageRecord {
    pub region: RegionKey,
    pub status: CoverageStatus,
    pub last_fetched_count: usize,
    pub last_requested_count: usize,
    pub last_checked_at: DateTime<Utc>,
}

impl CoverageRecord {
    /// Record a live fetch that asked for `requested` and received `fetched`.
    pub fn from_fetch(region: RegionKey, requested: usize, fetched: usize) -> Self {
        Self {
            region,
            status: classify(requested, fetched),
            last_fetched_count: fetched,
            last_requested_count: requested,
            last_checked_at: Utc::now(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.status == CoverageStatus::Complete
    }
}
