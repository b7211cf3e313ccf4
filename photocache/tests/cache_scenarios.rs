//! End-to-end scenarios for the cache decision engine.
//!
//! These tests drive the engine against in-memory stores and a pool-backed
//! provider and verify:
//! - live miss → coverage recorded → cached answers on repeat
//! - sampling of clustered caches without live fallback
//! - the complete/incomplete asymmetry of coverage classification
//! - the exact 0.90 acceptance boundary for incomplete coverage
//! - duplicate live fetches under concurrent misses
//! - provider and store failures surfacing as errors, not as cache misses
//!
//! Run with: `cargo test --test cache_scenarios`

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{TimeZone, Utc};
use futures::future::join_all;
use tokio::sync::Barrier;

use photocache::coverage::{CoverageRecord, CoverageStatus};
use photocache::engine::{CacheDecisionEngine, EngineConfig, PhotoSource};
use photocache::geo::{BoundingBox, Grid, GridCell};
use photocache::photo::CachedPhoto;
use photocache::provider::{FetchError, LiveFetch, LiveFetcher, PoolFetcher};
use photocache::store::{
    BoxFuture, CoverageStore, MemoryCoverageStore, MemoryPhotoStore, PhotoStore, StoreError,
};
use photocache::ResolveError;

// ============================================================================
// Helper Functions
// ============================================================================

/// Query box around Hamburg, 0.2° × 0.2°.
fn hamburg() -> BoundingBox {
    BoundingBox::new(9.9, 53.5, 10.1, 53.7).unwrap()
}

fn photo(i: usize, lon: f64, lat: f64) -> CachedPhoto {
    CachedPhoto::new(
        format!("mly-{i}"),
        lon,
        lat,
        Utc.timestamp_opt(1_600_000_000 + i as i64 * 60, 0).unwrap(),
    )
}

/// Photo at the centre of cell (x, y) of a 10×10 grid over `hamburg()`.
fn in_cell(i: usize, x: usize, y: usize) -> CachedPhoto {
    let bbox = hamburg();
    let cell_w = bbox.width() / 10.0;
    let cell_h = bbox.height() / 10.0;
    photo(
        i,
        bbox.min_lon + (x as f64 + 0.5) * cell_w,
        bbox.min_lat + (y as f64 + 0.5) * cell_h,
    )
}

/// `n` photos spread one per cell, wrapping after 100.
fn spread(n: usize) -> Vec<CachedPhoto> {
    (0..n).map(|i| in_cell(i, i % 10, (i / 10) % 10)).collect()
}

/// `cells` cells occupied by `per_cell` photos each.
fn even_cells(cells: usize, per_cell: usize) -> Vec<CachedPhoto> {
    (0..cells * per_cell)
        .map(|i| {
            let cell = i / per_cell;
            in_cell(i, cell % 10, cell / 10)
        })
        .collect()
}

fn cell_of(photo: &CachedPhoto) -> GridCell {
    Grid::new(10).unwrap().cell_for(photo.point(), &hamburg())
}

struct Setup {
    engine: CacheDecisionEngine,
    photos: Arc<MemoryPhotoStore>,
    coverage: Arc<MemoryCoverageStore>,
    upstream: Arc<PoolFetcher>,
}

fn setup(upstream: Vec<CachedPhoto>, cached: Vec<CachedPhoto>) -> Setup {
    let photos = Arc::new(MemoryPhotoStore::with_photos(cached));
    let coverage = Arc::new(MemoryCoverageStore::default());
    let upstream = Arc::new(PoolFetcher::new(upstream));
    let config = EngineConfig::default()
        .with_grid_size(10)
        .with_sampler_seed(11);
    let engine =
        CacheDecisionEngine::new(config, photos.clone(), coverage.clone(), upstream.clone())
            .unwrap();
    Setup {
        engine,
        photos,
        coverage,
        upstream,
    }
}

async fn coverage_status(s: &Setup) -> Option<CoverageStatus> {
    s.coverage
        .get(s.engine.region_key(&hamburg()))
        .await
        .unwrap()
        .map(|r| r.status)
}

async fn mark_incomplete(s: &Setup) {
    let key = s.engine.region_key(&hamburg());
    s.coverage
        .put(CoverageRecord::from_fetch(key, 100, 100))
        .await
        .unwrap();
}

/// Provider that is always rate limited.
struct RateLimitedFetcher;

impl LiveFetcher for RateLimitedFetcher {
    fn fetch_live(
        &self,
        _bbox: BoundingBox,
        _max_photos: usize,
    ) -> BoxFuture<'_, Result<LiveFetch, FetchError>> {
        Box::pin(async { Err(FetchError::RateLimited { retry_after: None }) })
    }

    fn name(&self) -> &str {
        "rate-limited"
    }
}

/// Pool provider that holds every call until `parties` calls are in flight.
struct GatedFetcher {
    inner: PoolFetcher,
    gate: Barrier,
}

impl GatedFetcher {
    fn new(pool: Vec<CachedPhoto>, parties: usize) -> Self {
        Self {
            inner: PoolFetcher::new(pool),
            gate: Barrier::new(parties),
        }
    }
}

impl LiveFetcher for GatedFetcher {
    fn fetch_live(
        &self,
        bbox: BoundingBox,
        max_photos: usize,
    ) -> BoxFuture<'_, Result<LiveFetch, FetchError>> {
        Box::pin(async move {
            self.gate.wait().await;
            self.inner.fetch_live(bbox, max_photos).await
        })
    }

    fn name(&self) -> &str {
        "gated-pool"
    }
}

/// Photo store whose database is down.
struct OfflinePhotoStore;

impl PhotoStore for OfflinePhotoStore {
    fn count_in_bbox(&self, _bbox: BoundingBox) -> BoxFuture<'_, Result<usize, StoreError>> {
        Box::pin(async { Err(StoreError::Unavailable("pool exhausted".to_string())) })
    }

    fn photos_in_bbox(
        &self,
        _bbox: BoundingBox,
        _limit: Option<usize>,
    ) -> BoxFuture<'_, Result<Vec<CachedPhoto>, StoreError>> {
        Box::pin(async { Err(StoreError::Unavailable("pool exhausted".to_string())) })
    }

    fn store_photos(&self, _photos: Vec<CachedPhoto>) -> BoxFuture<'_, Result<usize, StoreError>> {
        Box::pin(async { Err(StoreError::Unavailable("pool exhausted".to_string())) })
    }

    fn total_count(&self) -> BoxFuture<'_, Result<u64, StoreError>> {
        Box::pin(async { Err(StoreError::Unavailable("pool exhausted".to_string())) })
    }
}

// ============================================================================
// Scenarios
// ============================================================================

/// Scenario A: a small region is fetched once and then served whole from cache.
#[tokio::test]
async fn test_small_region_served_from_cache_after_first_fetch() {
    let s = setup(spread(20), vec![]);

    let first = s.engine.resolve(hamburg(), 70).await.unwrap();
    assert_eq!(first.source, PhotoSource::Live);
    assert_eq!(first.photos.len(), 20);
    assert_eq!(coverage_status(&s).await, Some(CoverageStatus::Complete));
    assert_eq!(s.photos.count_in_bbox(hamburg()).await.unwrap(), 20);

    let second = s.engine.resolve(hamburg(), 70).await.unwrap();
    assert_eq!(second.source, PhotoSource::CacheSimple);
    assert_eq!(second.distribution_score, 1.0);

    let cached = s.photos.photos_in_bbox(hamburg(), None).await.unwrap();
    assert_eq!(second.photos, cached);
    assert_eq!(s.upstream.calls(), 1);
}

/// Scenario B: a clustered but complete cache is sampled, not refetched.
#[tokio::test]
async fn test_clustered_complete_cache_is_sampled_not_refetched() {
    // 480 photos in one cell, 20 over five more.
    let mut pool: Vec<_> = (0..480).map(|i| in_cell(i, 2, 2)).collect();
    pool.extend((0..20).map(|k| in_cell(480 + k, 3 + k % 5, 7)));
    let s = setup(pool, vec![]);

    let first = s.engine.resolve(hamburg(), 550).await.unwrap();
    assert_eq!(first.source, PhotoSource::Live);
    assert_eq!(first.photos.len(), 500);
    assert_eq!(coverage_status(&s).await, Some(CoverageStatus::Complete));

    let second = s.engine.resolve(hamburg(), 450).await.unwrap();
    assert_eq!(second.source, PhotoSource::CacheSampled);
    assert_eq!(second.photos.len(), 450);
    assert!(second.distribution_score > 0.0);

    let cells: HashSet<_> = second.photos.iter().map(cell_of).collect();
    assert_eq!(cells.len(), 6, "sample should draw from every occupied cell");
    assert_eq!(s.upstream.calls(), 1);
}

/// Scenario C: returned < requested is complete regardless of magnitude.
#[tokio::test]
async fn test_large_request_with_smaller_return_is_complete() {
    let s = setup(spread(505), vec![]);

    let first = s.engine.resolve(hamburg(), 2050).await.unwrap();
    assert_eq!(first.photos.len(), 505);
    assert_eq!(coverage_status(&s).await, Some(CoverageStatus::Complete));

    let second = s.engine.resolve(hamburg(), 2050).await.unwrap();
    assert_eq!(second.source, PhotoSource::CacheSimple);
    assert_eq!(second.photos.len(), 505);
}

/// The mirror of scenario C: a fetch filled to the brim is incomplete.
#[tokio::test]
async fn test_exactly_filled_fetch_is_incomplete() {
    let s = setup(spread(505), vec![]);

    let first = s.engine.resolve(hamburg(), 505).await.unwrap();
    assert_eq!(first.photos.len(), 505);
    assert_eq!(coverage_status(&s).await, Some(CoverageStatus::Incomplete));

    // 505 photos over all 100 cells is well spread: the sample is accepted.
    let second = s.engine.resolve(hamburg(), 200).await.unwrap();
    assert_eq!(second.source, PhotoSource::CacheSampled);
    assert_eq!(second.photos.len(), 200);
    assert_eq!(s.upstream.calls(), 1);
}

/// A sampled score of exactly 0.90 is accepted.
#[tokio::test]
async fn test_incomplete_score_at_threshold_is_accepted() {
    // 90 of 100 cells, two photos each: score is exactly 0.9.
    let s = setup(spread(100), even_cells(90, 2));
    mark_incomplete(&s).await;

    let res = s.engine.resolve(hamburg(), 200).await.unwrap();
    assert_eq!(res.source, PhotoSource::CacheSampled);
    assert_eq!(res.distribution_score, 0.9);
    assert_eq!(res.photos.len(), 180);
    assert_eq!(s.upstream.calls(), 0);
}

/// A sampled score just under 0.90 falls back to live.
#[tokio::test]
async fn test_incomplete_score_below_threshold_falls_back() {
    let s = setup(spread(100), even_cells(89, 2));
    mark_incomplete(&s).await;

    let res = s.engine.resolve(hamburg(), 200).await.unwrap();
    assert_eq!(res.source, PhotoSource::Live);
    assert_eq!(res.photos.len(), 100);
    assert_eq!(s.upstream.calls(), 1);
    // 100 returned out of 200 requested: now complete.
    assert_eq!(coverage_status(&s).await, Some(CoverageStatus::Complete));
    assert_eq!(s.engine.metrics().live_fallback, 1);
}

/// Simultaneous misses each fetch live, then converge on one record.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_misses_converge() {
    const REQUESTS: usize = 4;

    let photos = Arc::new(MemoryPhotoStore::new());
    let coverage = Arc::new(MemoryCoverageStore::default());
    // No fetch completes until all requests have looked up coverage and missed.
    let upstream = Arc::new(GatedFetcher::new(spread(40), REQUESTS));
    let engine = Arc::new(
        CacheDecisionEngine::new(
            EngineConfig::default(),
            photos.clone(),
            coverage.clone(),
            upstream.clone(),
        )
        .unwrap(),
    );

    let handles: Vec<_> = (0..REQUESTS)
        .map(|_| {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move { engine.resolve(hamburg(), 100).await })
        })
        .collect();

    for joined in join_all(handles).await {
        let res = joined.unwrap().unwrap();
        assert_eq!(res.source, PhotoSource::Live);
        assert_eq!(res.photos.len(), 40);
    }

    assert_eq!(upstream.inner.calls(), REQUESTS);
    assert_eq!(engine.metrics().live_miss, REQUESTS as u64);
    // Every fetch returned the same 40 ids; inserts dedupe.
    assert_eq!(photos.len(), 40);

    let stats = engine.cache_stats().await.unwrap();
    assert_eq!(stats.total_cached_photos, 40);
    assert_eq!(stats.total_regions, 1);
    assert_eq!(stats.complete_regions, 1);

    let record = coverage
        .get(engine.region_key(&hamburg()))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.status, CoverageStatus::Complete);
    assert_eq!(record.last_requested_count, 100);
    assert_eq!(record.last_fetched_count, 40);

    // Once recorded, the region is served from cache.
    let after = engine.resolve(hamburg(), 100).await.unwrap();
    assert_eq!(after.source, PhotoSource::CacheSimple);
    assert_eq!(upstream.inner.calls(), REQUESTS);
}

/// Near-identical viewports share one coverage record.
#[tokio::test]
async fn test_nudged_viewport_reuses_coverage() {
    let s = setup(spread(20), vec![]);
    s.engine.resolve(hamburg(), 70).await.unwrap();

    let nudged = BoundingBox::new(9.9004, 53.5003, 10.0998, 53.6996).unwrap();
    let res = s.engine.resolve(nudged, 70).await.unwrap();
    assert_eq!(res.source, PhotoSource::CacheSimple);
    assert_eq!(s.upstream.calls(), 1);
}

/// With the cache switched off the engine never records coverage.
#[tokio::test]
async fn test_disabled_cache_always_goes_live() {
    let photos = Arc::new(MemoryPhotoStore::new());
    let coverage = Arc::new(MemoryCoverageStore::default());
    let upstream = Arc::new(PoolFetcher::new(spread(20)));
    let engine = CacheDecisionEngine::new(
        EngineConfig::default().with_cache_enabled(false),
        photos.clone(),
        coverage.clone(),
        upstream.clone(),
    )
    .unwrap();

    for _ in 0..3 {
        let res = engine.resolve(hamburg(), 70).await.unwrap();
        assert_eq!(res.source, PhotoSource::Live);
    }
    assert_eq!(upstream.calls(), 3);
    assert!(photos.is_empty());
    assert_eq!(coverage.summary().await.unwrap().total_regions, 0);
    assert_eq!(engine.metrics().live_bypass, 3);
}

/// A rate-limited provider fails the request and leaves coverage unknown.
#[tokio::test]
async fn test_upstream_failure_records_nothing() {
    let coverage = Arc::new(MemoryCoverageStore::default());
    let engine = CacheDecisionEngine::new(
        EngineConfig::default(),
        Arc::new(MemoryPhotoStore::new()),
        coverage.clone(),
        Arc::new(RateLimitedFetcher),
    )
    .unwrap();

    let err = engine.resolve(hamburg(), 70).await.unwrap_err();
    assert!(matches!(
        err,
        ResolveError::UpstreamFetchFailed(FetchError::RateLimited { .. })
    ));
    assert!(err.is_retryable());
    assert!(coverage
        .get(engine.region_key(&hamburg()))
        .await
        .unwrap()
        .is_none());
    assert_eq!(engine.metrics().failures, 1);
}

/// A store outage on a covered region is an error, not a trip to the provider.
#[tokio::test]
async fn test_store_outage_does_not_fall_back_to_live() {
    let coverage = Arc::new(MemoryCoverageStore::default());
    let upstream = Arc::new(PoolFetcher::new(spread(20)));
    let engine = CacheDecisionEngine::new(
        EngineConfig::default(),
        Arc::new(OfflinePhotoStore),
        coverage.clone(),
        upstream.clone(),
    )
    .unwrap();
    coverage
        .put(CoverageRecord::from_fetch(engine.region_key(&hamburg()), 100, 100))
        .await
        .unwrap();

    let err = engine.resolve(hamburg(), 70).await.unwrap_err();
    assert!(matches!(err, ResolveError::StoreUnavailable(_)));
    assert_eq!(upstream.calls(), 0);
}
