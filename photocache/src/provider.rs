//! Live photo provider abstraction.
//!
//! The external provider client (pagination, rate limiting, retries) lives
//! behind [`LiveFetcher`]. The decision engine calls it on a cache miss or a
//! fallback and propagates its failures unchanged.
//!
//! [`PoolFetcher`] serves an in-memory photo pool as if it were the provider.
//! It backs the offline `resolve` command and the tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use thiserror::Error;

use crate::geo::BoundingBox;
use crate::photo::{sort_by_recency, CachedPhoto};
use crate::store::BoxFuture;

/// Errors reported by a live fetcher.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Network or server failure that may succeed on retry.
    #[error("Transient provider failure: {0}")]
    Transient(String),

    /// The provider rejected the call for exceeding its rate limit.
    #[error("Provider rate limit exceeded")]
    RateLimited { retry_after: Option<Duration> },

    /// The provider answered with an error that will not clear on retry.
    #[error("Provider error: {0}")]
    Provider(String),
}

impl FetchError {
    /// Whether the caller may reasonably try again later.
    pub fn is_transient(&self) -> bool {
        matches!(self, FetchError::Transient(_) | FetchError::RateLimited { .. })
    }
}

/// Outcome of one live fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveFetch {
    /// Photos as returned by the provider.
    pub photos: Vec<CachedPhoto>,
    /// How many photos the fetch asked the provider for.
    pub requested_count: usize,
    /// How many photos the provider actually returned.
    pub returned_count: usize,
}

impl LiveFetch {
    /// Build an outcome whose `returned_count` is the number of `photos`.
    pub fn new(photos: Vec<CachedPhoto>, requested_count: usize) -> Self {
        let returned_count = photos.len();
        Self {
            photos,
            requested_count,
            returned_count,
        }
    }
}

/// Client for the external photo-by-location provider.
pub trait LiveFetcher: Send + Sync {
    /// Fetch up to `max_photos` photos inside `bbox`.
    fn fetch_live(
        &self,
        bbox: BoundingBox,
        max_photos: usize,
    ) -> BoxFuture<'_, Result<LiveFetch, FetchError>>;

    /// Human-readable provider name.
    fn name(&self) -> &str;
}

/// Provider stand-in backed by a fixed photo pool.
///
/// Returns the most recent photos of the pool inside the requested box, at
/// most `max_photos` of them, and counts how often it was called.
#[derive(Debug, Default)]
pub struct PoolFetcher {
    pool: Vec<CachedPhoto>,
    calls: AtomicUsize,
}

impl PoolFetcher {
    pub fn new(pool: Vec<CachedPhoto>) -> Self {
        Self {
            pool,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of `fetch_live` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

impl LiveFetcher for PoolFetcher {
    fn fetch_live(
        &self,
        bbox: BoundingBox,
        max_photos: usize,
    ) -> BoxFuture<'_, Result<LiveFetch, FetchError>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::Relaxed);
            let mut photos: Vec<_> = self
                .pool
                .iter()
                .filter(|p| p.is_within(&bbox))
                .cloned()
                .collect();
            sort_by_recency(&mut photos);
            photos.truncate(max_photos);
            Ok(LiveFetch::new(photos, max_photos))
        })
    }

    fn name(&self) -> &str {
        "pool"
    }
}
