//! Read interfaces onto the photo cache and the coverage records.
//!
//! The decision engine talks to persistence only through these traits. Both
//! are dyn-compatible (`Arc<dyn PhotoStore>`) and return boxed futures so a
//! database-backed implementation can live outside this crate.
//!
//! An unreachable store must surface as [`StoreError`], never as an empty
//! result: treating an outage as a cache miss would push every request to the
//! live provider and hide the outage.

mod memory;

pub use memory::{MemoryCoverageStore, MemoryPhotoStore, DEFAULT_MAX_REGIONS};

use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

use crate::coverage::{CoverageRecord, RegionKey};
use crate::geo::BoundingBox;
use crate::photo::CachedPhoto;

/// Boxed future type for dyn-compatible async methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Errors raised by a store backend.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// The backend could not be reached.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// The backend answered with an error.
    #[error("Store backend error: {0}")]
    Backend(String),
}

/// Region counts across all coverage records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CoverageSummary {
    pub total_regions: u64,
    pub complete_regions: u64,
}

/// Cached photos, queryable by bounding box.
pub trait PhotoStore: Send + Sync {
    /// Number of cached photos inside `bbox`.
    fn count_in_bbox(&self, bbox: BoundingBox) -> BoxFuture<'_, Result<usize, StoreError>>;

    /// Cached photos inside `bbox`, most recent first, at most `limit` if given.
    fn photos_in_bbox(
        &self,
        bbox: BoundingBox,
        limit: Option<usize>,
    ) -> BoxFuture<'_, Result<Vec<CachedPhoto>, StoreError>>;

    /// Insert photos not already present (matched by provider id).
    ///
    /// Returns the number of newly inserted photos.
    fn store_photos(&self, photos: Vec<CachedPhoto>) -> BoxFuture<'_, Result<usize, StoreError>>;

    /// Total number of cached photos.
    fn total_count(&self) -> BoxFuture<'_, Result<u64, StoreError>>;
}

/// Coverage records keyed by region. Writes are last-writer-wins.
pub trait CoverageStore: Send + Sync {
    fn get(&self, region: RegionKey) -> BoxFuture<'_, Result<Option<CoverageRecord>, StoreError>>;

    fn put(&self, record: CoverageRecord) -> BoxFuture<'_, Result<(), StoreError>>;

    fn summary(&self) -> BoxFuture<'_, Result<CoverageSummary, StoreError>>;
}
