//! Spatial sampling of an oversized candidate pool.
//!
//! The sampler picks `target_count` photos by visiting grid cells round-robin:
//! each pass takes the next most recent photo from every non-empty cell, in a
//! cell order shuffled once per call. A cell holding 490 of 500 candidates
//! therefore contributes its second photo only after every other occupied
//! cell has contributed its first.
//!
//! # Example
//!
//! ```ignore
//! use photocache::sampling::SpatialSampler;
//!
//! let sampler = SpatialSampler::new(grid).with_seed(7);
//! let result = sampler.sample(&candidates, &bbox, 450)?;
//! assert_eq!(result.photos.len(), 450);
//! ```

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Serialize;
use thiserror::Error;

use crate::distribution;
use crate::geo::{BoundingBox, Grid, GridCell};
use crate::photo::{recency_order, CachedPhoto};

/// Sampler precondition failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SampleError {
    /// Fewer candidates than requested; callers should take the simple path.
    #[error("Cannot sample {target} photos from {available} candidates")]
    InsufficientCandidates { available: usize, target: usize },
}

/// Photos chosen by the sampler and the score of exactly that subset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleResult {
    pub photos: Vec<CachedPhoto>,
    pub distribution_score: f64,
}

/// Round-robin spatial sampler.
#[derive(Debug, Clone, Copy)]
pub struct SpatialSampler {
    grid: Grid,
    seed: Option<u64>,
}

impl SpatialSampler {
    /// Sampler with an OS-seeded cell order.
    pub fn new(grid: Grid) -> Self {
        Self { grid, seed: None }
    }

    /// Fix the cell-order seed so results are reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Select `target_count` photos spread across the cells of `bbox`.
    ///
    /// # Errors
    ///
    /// [`SampleError::InsufficientCandidates`] if `photos.len() < target_count`.
    pub fn sample(
        &self,
        photos: &[CachedPhoto],
        bbox: &BoundingBox,
        target_count: usize,
    ) -> Result<SampleResult, SampleError> {
        if photos.len() < target_count {
            return Err(SampleError::InsufficientCandidates {
                available: photos.len(),
                target: target_count,
            });
        }

        let mut cells = self.group_by_cell(photos, bbox);
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        cells.shuffle(&mut rng);

        let selected = round_robin(&cells, target_count);
        let distribution_score = distribution::score(&selected, bbox, self.grid);

        Ok(SampleResult {
            photos: selected,
            distribution_score,
        })
    }

    /// Group photos per cell, each group most recent first, cells in grid order.
    fn group_by_cell<'a>(
        &self,
        photos: &'a [CachedPhoto],
        bbox: &BoundingBox,
    ) -> Vec<Vec<&'a CachedPhoto>> {
        let mut groups: BTreeMap<GridCell, Vec<&CachedPhoto>> = BTreeMap::new();
        for photo in photos {
            groups
                .entry(self.grid.cell_for(photo.point(), bbox))
                .or_default()
                .push(photo);
        }
        groups
            .into_values()
            .map(|mut group| {
                group.sort_by(|a, b| recency_order(a, b));
                group
            })
            .collect()
    }
}

/// Take one photo per non-empty cell per pass until `target` are collected.
fn round_robin(cells: &[Vec<&CachedPhoto>], target: usize) -> Vec<CachedPhoto> {
    let mut selected = Vec::with_capacity(target);
    let deepest = cells.iter().map(Vec::len).max().unwrap_or(0);

    'passes: for pass in 0..deepest {
        for group in cells {
            if selected.len() == target {
                break 'passes;
            }
            if let Some(photo) = group.get(pass) {
                selected.push((*photo).clone());
            }
        }
    }
    selected
}

/// Sample with a fresh OS-seeded sampler.
pub fn sample(
    photos: &[CachedPhoto],
    bbox: &BoundingBox,
    grid: Grid,
    target_count: usize,
) -> Result<SampleResult, SampleError> {
    SpatialSampler::new(grid).sample(photos, bbox, target_count)
}
