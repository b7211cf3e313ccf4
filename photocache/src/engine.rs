//! Cache decision engine.
//!
//! Decides per request whether cached photos can answer a bounding-box query
//! and, if so, whether they are returned as-is or spatially sampled.
//!
//! # State Machine
//!
//! ```text
//! no coverage record ─────────────────────────────► live fetch, record coverage
//! complete   ── cached_count <= max_photos ───────► cache_simple  (score 1.0)
//!            ── cached_count >  max_photos ───────► cache_sampled
//! incomplete ── sample min(max, cached) ─┬─ score >= threshold ─► cache_sampled
//!                                        └─ score <  threshold ─► live fetch, record coverage
//! ```
//!
//! A failed live fetch leaves coverage untouched and surfaces as
//! [`ResolveError::UpstreamFetchFailed`]. A failed store read surfaces as
//! [`ResolveError::StoreUnavailable`] and is never treated as an empty cache.
//!
//! Two concurrent misses for the same region may both fetch live. That only
//! costs a duplicate call: coverage writes are last-writer-wins and photo
//! inserts deduplicate by provider id.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::coverage::{CoverageRecord, CoverageStatus, RegionKey, DEFAULT_REGION_CELL_DEGREES};
use crate::distribution;
use crate::error::ResolveError;
use crate::geo::{BoundingBox, Grid, DEFAULT_GRID_SIZE};
use crate::metrics::{CacheStats, EngineMetrics, LiveReason, MetricsSnapshot};
use crate::photo::CachedPhoto;
use crate::provider::{LiveFetch, LiveFetcher};
use crate::sampling::SpatialSampler;
use crate::store::{CoverageStore, PhotoStore};

/// Minimum distribution score for accepting an incomplete-coverage sample.
pub const DEFAULT_DISTRIBUTION_THRESHOLD: f64 = 0.90;

/// Where the returned photos came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PhotoSource {
    /// Every cached photo in the box, unsampled.
    CacheSimple,
    /// A spatial sample of the cached photos.
    CacheSampled,
    /// Straight from the live provider.
    Live,
}

impl PhotoSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            PhotoSource::CacheSimple => "cache_simple",
            PhotoSource::CacheSampled => "cache_sampled",
            PhotoSource::Live => "live",
        }
    }
}

impl fmt::Display for PhotoSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result handed back to the request layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resolution {
    pub photos: Vec<CachedPhoto>,
    pub source: PhotoSource,
    pub distribution_score: f64,
}

/// Engine tuning. Passed in at construction; the engine never reads the
/// process environment.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// When false every request goes straight to the live fetcher.
    pub cache_enabled: bool,
    /// Cells per axis for scoring and sampling.
    pub grid_size: u16,
    /// Minimum score at which an incomplete-coverage sample is accepted.
    pub distribution_threshold: f64,
    /// Lattice spacing for region keys, in degrees.
    pub region_cell_degrees: f64,
    /// Fixed sampler seed; `None` seeds from the OS per request.
    pub sampler_seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache_enabled: true,
            grid_size: DEFAULT_GRID_SIZE,
            distribution_threshold: DEFAULT_DISTRIBUTION_THRESHOLD,
            region_cell_degrees: DEFAULT_REGION_CELL_DEGREES,
            sampler_seed: None,
        }
    }
}

impl EngineConfig {
    pub fn with_cache_enabled(mut self, enabled: bool) -> Self {
        self.cache_enabled = enabled;
        self
    }

    pub fn with_grid_size(mut self, grid_size: u16) -> Self {
        self.grid_size = grid_size;
        self
    }

    pub fn with_distribution_threshold(mut self, threshold: f64) -> Self {
        self.distribution_threshold = threshold;
        self
    }

    pub fn with_region_cell_degrees(mut self, degrees: f64) -> Self {
        self.region_cell_degrees = degrees;
        self
    }

    pub fn with_sampler_seed(mut self, seed: u64) -> Self {
        self.sampler_seed = Some(seed);
        self
    }

    fn validate(&self) -> Result<Grid, ResolveError> {
        if !(0.0..=1.0).contains(&self.distribution_threshold) {
            return Err(ResolveError::InvalidArgument(format!(
                "distribution threshold {} outside [0, 1]",
                self.distribution_threshold
            )));
        }
        if !(self.region_cell_degrees.is_finite() && self.region_cell_degrees > 0.0) {
            return Err(ResolveError::InvalidArgument(format!(
                "region cell size {} must be positive",
                self.region_cell_degrees
            )));
        }
        Ok(Grid::new(self.grid_size)?)
    }
}

/// Whether a sampled score clears the acceptance threshold. Inclusive.
#[inline]
pub fn meets_threshold(score: f64, threshold: f64) -> bool {
    score >= threshold
}

/// Chooses between cached, sampled and live answers for bbox queries.
pub struct CacheDecisionEngine {
    config: EngineConfig,
    grid: Grid,
    photos: Arc<dyn PhotoStore>,
    coverage: Arc<dyn CoverageStore>,
    fetcher: Arc<dyn LiveFetcher>,
    metrics: EngineMetrics,
}

impl CacheDecisionEngine {
    /// Create an engine over the given collaborators.
    ///
    /// # Errors
    ///
    /// [`ResolveError::InvalidArgument`] if `config` is out of range.
    pub fn new(
        config: EngineConfig,
        photos: Arc<dyn PhotoStore>,
        coverage: Arc<dyn CoverageStore>,
        fetcher: Arc<dyn LiveFetcher>,
    ) -> Result<Self, ResolveError> {
        let grid = config.validate()?;
        Ok(Self {
            config,
            grid,
            photos,
            coverage,
            fetcher,
            metrics: EngineMetrics::new(),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Region key the engine uses for `bbox`.
    pub fn region_key(&self, bbox: &BoundingBox) -> RegionKey {
        RegionKey::for_bbox(bbox, self.config.region_cell_degrees)
    }

    /// Answer a request for up to `max_photos` photos inside `bbox`.
    pub async fn resolve(
        &self,
        bbox: BoundingBox,
        max_photos: usize,
    ) -> Result<Resolution, ResolveError> {
        self.metrics.request_started();
        let result = self.resolve_request(bbox, max_photos).await;
        if let Err(e) = &result {
            self.metrics.request_failed();
            debug!(bbox = %bbox, error = %e, "Request failed");
        }
        result
    }

    /// Summary of cached photos and coverage records.
    pub async fn cache_stats(&self) -> Result<CacheStats, ResolveError> {
        let total_photos = self.photos.total_count().await?;
        let summary = self.coverage.summary().await?;
        Ok(CacheStats::new(
            total_photos,
            summary.total_regions,
            summary.complete_regions,
        ))
    }

    async fn resolve_request(
        &self,
        bbox: BoundingBox,
        max_photos: usize,
    ) -> Result<Resolution, ResolveError> {
        bbox.validate()?;
        if max_photos == 0 {
            return Err(ResolveError::InvalidArgument(
                "max_photos must be positive".to_string(),
            ));
        }

        if !self.config.cache_enabled {
            let fetch = self.fetcher.fetch_live(bbox, max_photos).await?;
            self.metrics.live_served(LiveReason::Bypass);
            return Ok(self.live_resolution(&bbox, fetch));
        }

        let region = self.region_key(&bbox);
        let status = self
            .coverage
            .get(region.clone())
            .await?
            .map(|record| record.status)
            .unwrap_or(CoverageStatus::Unknown);

        match status {
            CoverageStatus::Unknown => {
                debug!(region = %region, "No coverage record, fetching live");
                self.fetch_and_record(bbox, max_photos, region, LiveReason::Miss)
                    .await
            }
            CoverageStatus::Complete => self.resolve_complete(bbox, max_photos, &region).await,
            CoverageStatus::Incomplete => self.resolve_incomplete(bbox, max_photos, region).await,
        }
    }

    async fn resolve_complete(
        &self,
        bbox: BoundingBox,
        max_photos: usize,
        region: &RegionKey,
    ) -> Result<Resolution, ResolveError> {
        let cached_count = self.photos.count_in_bbox(bbox).await?;

        if cached_count <= max_photos {
            let photos = self.photos.photos_in_bbox(bbox, Some(max_photos)).await?;
            debug!(region = %region, cached_count, max_photos, "Complete coverage, simple path");
            return Ok(self.simple_resolution(photos));
        }

        let candidates = self.photos.photos_in_bbox(bbox, None).await?;
        // The store may have shrunk between count and list.
        if candidates.len() <= max_photos {
            return Ok(self.simple_resolution(candidates));
        }

        let sample = self.sampler().sample(&candidates, &bbox, max_photos)?;
        debug!(
            region = %region,
            cached_count,
            max_photos,
            score = sample.distribution_score,
            "Complete coverage, sampled path"
        );
        self.metrics.cache_served(PhotoSource::CacheSampled);
        Ok(Resolution {
            photos: sample.photos,
            source: PhotoSource::CacheSampled,
            distribution_score: sample.distribution_score,
        })
    }

    async fn resolve_incomplete(
        &self,
        bbox: BoundingBox,
        max_photos: usize,
        region: RegionKey,
    ) -> Result<Resolution, ResolveError> {
        let cached_count = self.photos.count_in_bbox(bbox).await?;
        let candidates = if cached_count == 0 {
            Vec::new()
        } else {
            self.photos.photos_in_bbox(bbox, None).await?
        };

        let target = max_photos.min(candidates.len());
        let sample = self.sampler().sample(&candidates, &bbox, target)?;

        if meets_threshold(sample.distribution_score, self.config.distribution_threshold) {
            debug!(
                region = %region,
                cached_count,
                score = sample.distribution_score,
                "Incomplete coverage, sample accepted"
            );
            self.metrics.cache_served(PhotoSource::CacheSampled);
            return Ok(Resolution {
                photos: sample.photos,
                source: PhotoSource::CacheSampled,
                distribution_score: sample.distribution_score,
            });
        }

        info!(
            region = %region,
            cached_count,
            score = sample.distribution_score,
            threshold = self.config.distribution_threshold,
            "Cached photos poorly distributed, falling back to live"
        );
        self.fetch_and_record(bbox, max_photos, region, LiveReason::Fallback)
            .await
    }

    /// Fetch live, persist the photos, then record coverage.
    ///
    /// Coverage is written only after the photos are persisted, so a region
    /// is never marked covered while its photos are missing from the store.
    async fn fetch_and_record(
        &self,
        bbox: BoundingBox,
        max_photos: usize,
        region: RegionKey,
        reason: LiveReason,
    ) -> Result<Resolution, ResolveError> {
        let provider = self.fetcher.name();
        let fetch = self.fetcher.fetch_live(bbox, max_photos).await?;
        let record =
            CoverageRecord::from_fetch(region.clone(), fetch.requested_count, fetch.returned_count);

        match self.photos.store_photos(fetch.photos.clone()).await {
            Ok(inserted) => match self.coverage.put(record.clone()).await {
                Ok(()) => info!(
                    region = %region,
                    provider,
                    status = %record.status,
                    requested = record.last_requested_count,
                    returned = record.last_fetched_count,
                    inserted,
                    "Coverage updated from live fetch"
                ),
                Err(e) => {
                    // Region stays unknown: later requests keep missing until writes recover.
                    self.metrics.coverage_write_failed();
                    warn!(error = %e, region = %region, provider, "Coverage write failed");
                }
            },
            Err(e) => {
                self.metrics.persist_failed();
                warn!(
                    error = %e,
                    region = %region,
                    provider,
                    "Persisting live photos failed, coverage not recorded"
                );
            }
        }

        self.metrics.live_served(reason);
        Ok(self.live_resolution(&bbox, fetch))
    }

    fn simple_resolution(&self, photos: Vec<CachedPhoto>) -> Resolution {
        self.metrics.cache_served(PhotoSource::CacheSimple);
        Resolution {
            photos,
            source: PhotoSource::CacheSimple,
            distribution_score: 1.0,
        }
    }

    fn live_resolution(&self, bbox: &BoundingBox, fetch: LiveFetch) -> Resolution {
        let distribution_score = distribution::score(&fetch.photos, bbox, self.grid);
        Resolution {
            photos: fetch.photos,
            source: PhotoSource::Live,
            distribution_score,
        }
    }

    fn sampler(&self) -> SpatialSampler {
        let sampler = SpatialSampler::new(self.grid);
        match self.config.sampler_seed {
            Some(seed) => sampler.with_seed(seed),
            None => sampler,
        }
    }
}
