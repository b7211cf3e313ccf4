//! Distribution scoring of a photo set over a bounding box.
//!
//! The score combines two terms:
//!
//! ```text
//! base    = occupied_cells / min(total_cells, photo_count)      (capped at 1.0)
//! damping = 1 / (1 + cv)       cv = coefficient of variation of per-cell counts
//! score   = clamp(base * damping, 0, 1)
//! ```
//!
//! The `min` in the base term keeps small sets from being penalized for not
//! filling cells they could never fill. The damping term pulls the score down
//! when a few cells hoard most photos. Only occupied cells enter `cv`.

use std::collections::HashMap;

use crate::geo::{BoundingBox, Grid, GridCell};
use crate::photo::CachedPhoto;

/// Count photos per occupied cell.
pub fn cell_counts(photos: &[CachedPhoto], bbox: &BoundingBox, grid: Grid) -> HashMap<GridCell, usize> {
    let mut counts = HashMap::new();
    for photo in photos {
        *counts.entry(grid.cell_for(photo.point(), bbox)).or_insert(0) += 1;
    }
    counts
}

/// Score how evenly `photos` cover the cells of `bbox`.
///
/// Returns a value in `[0, 1]`; an empty set scores 0.
pub fn score(photos: &[CachedPhoto], bbox: &BoundingBox, grid: Grid) -> f64 {
    let counts = cell_counts(photos, bbox, grid);
    score_counts(counts.values().copied(), photos.len(), grid.total_cells())
}

/// Score from per-cell counts of occupied cells.
///
/// `photo_count` must equal the sum of `counts`.
pub fn score_counts<I>(counts: I, photo_count: usize, total_cells: usize) -> f64
where
    I: IntoIterator<Item = usize>,
{
    if photo_count == 0 || total_cells == 0 {
        return 0.0;
    }

    let counts: Vec<f64> = counts.into_iter().map(|c| c as f64).collect();
    let occupied = counts.len();
    if occupied == 0 {
        return 0.0;
    }

    let reachable = total_cells.min(photo_count);
    let base = (occupied as f64 / reachable as f64).min(1.0);

    let damping = 1.0 / (1.0 + coefficient_of_variation(&counts));

    (base * damping).clamp(0.0, 1.0)
}

/// Population coefficient of variation (`σ / μ`). Zero for fewer than two values.
fn coefficient_of_variation(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    if mean <= 0.0 {
        return 0.0;
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    variance.sqrt() / mean
}
