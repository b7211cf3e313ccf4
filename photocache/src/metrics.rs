//! Resolution counters and cache statistics.
//!
//! [`EngineMetrics`] uses lock-free atomic counters so the request path pays
//! only a relaxed increment. [`MetricsSnapshot`] is a point-in-time copy for
//! display.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::engine::PhotoSource;

/// Why a request was answered from the live provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiveReason {
    /// No coverage record existed for the region.
    Miss,
    /// Cached photos were too poorly distributed.
    Fallback,
    /// The cache is disabled.
    Bypass,
}

/// Counters for every resolution outcome.
#[derive(Debug, Default)]
pub struct EngineMetrics {
    requests: AtomicU64,
    cache_simple: AtomicU64,
    cache_sampled: AtomicU64,
    live_miss: AtomicU64,
    live_fallback: AtomicU64,
    live_bypass: AtomicU64,
    failures: AtomicU64,
    persist_failures: AtomicU64,
    coverage_write_failures: AtomicU64,
}

impl EngineMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_started(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a request answered from the cache.
    pub fn cache_served(&self, source: PhotoSource) {
        match source {
            PhotoSource::CacheSimple => self.cache_simple.fetch_add(1, Ordering::Relaxed),
            PhotoSource::CacheSampled => self.cache_sampled.fetch_add(1, Ordering::Relaxed),
            PhotoSource::Live => return,
        };
    }

    pub fn live_served(&self, reason: LiveReason) {
        let counter = match reason {
            LiveReason::Miss => &self.live_miss,
            LiveReason::Fallback => &self.live_fallback,
            LiveReason::Bypass => &self.live_bypass,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn request_failed(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Live photos could not be persisted after a successful fetch.
    pub fn persist_failed(&self) {
        self.persist_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Photos were persisted but the coverage record was rejected.
    pub fn coverage_write_failed(&self) {
        self.coverage_write_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests: self.requests.load(Ordering::Relaxed),
            cache_simple: self.cache_simple.load(Ordering::Relaxed),
            cache_sampled: self.cache_sampled.load(Ordering::Relaxed),
            live_miss: self.live_miss.load(Ordering::Relaxed),
            live_fallback: self.live_fallback.load(Ordering::Relaxed),
            live_bypass: self.live_bypass.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            persist_failures: self.persist_failures.load(Ordering::Relaxed),
            coverage_write_failures: self.coverage_write_failures.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`EngineMetrics`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub requests: u64,
    pub cache_simple: u64,
    pub cache_sampled: u64,
    pub live_miss: u64,
    pub live_fallback: u64,
    pub live_bypass: u64,
    pub failures: u64,
    /// Successful live fetches whose photos were not persisted.
    pub persist_failures: u64,
    /// Successful live fetches whose coverage record was not written.
    pub coverage_write_failures: u64,
}

impl MetricsSnapshot {
    /// Requests answered from the cache.
    pub fn cache_hits(&self) -> u64 {
        self.cache_simple + self.cache_sampled
    }

    /// Requests answered by the live provider.
    pub fn live_total(&self) -> u64 {
        self.live_miss + self.live_fallback + self.live_bypass
    }

    /// Fraction of successful requests served from cache (0.0 when idle).
    pub fn cache_hit_rate(&self) -> f64 {
        let served = self.cache_hits() + self.live_total();
        if served == 0 {
            0.0
        } else {
            self.cache_hits() as f64 / served as f64
        }
    }
}

impl fmt::Display for MetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "requests={} cache_simple={} cache_sampled={} live_miss={} live_fallback={} live_bypass={} failures={} persist_failures={} coverage_write_failures={} hit_rate={:.1}%",
            self.requests,
            self.cache_simple,
            self.cache_sampled,
            self.live_miss,
            self.live_fallback,
            self.live_bypass,
            self.failures,
            self.persist_failures,
            self.coverage_write_failures,
            self.cache_hit_rate() * 100.0
        )
    }
}

/// Summary of what the cache holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CacheStats {
    pub total_cached_photos: u64,
    pub total_regions: u64,
    pub complete_regions: u64,
    /// Percentage of regions with complete coverage.
    pub cache_efficiency: f64,
}

impl CacheStats {
    pub fn new(total_cached_photos: u64, total_regions: u64, complete_regions: u64) -> Self {
        let cache_efficiency = if total_regions > 0 {
            complete_regions as f64 / total_regions as f64 * 100.0
        } else {
            0.0
        };
        Self {
            total_cached_photos,
            total_regions,
            complete_regions,
            cache_efficiency,
        }
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} photos, {} regions ({} complete, {:.1}% efficiency)",
            self.total_cached_photos, self.total_regions, self.complete_regions, self.cache_efficiency
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let metrics = EngineMetrics::new();
        metrics.request_started();
        metrics.request_started();
        metrics.request_started();
        metrics.cache_served(PhotoSource::CacheSimple);
        metrics.cache_served(PhotoSource::CacheSampled);
        metrics.live_served(LiveReason::Fallback);

        let snap = metrics.snapshot();
        assert_eq!(snap.requests, 3);
        assert_eq!(snap.cache_hits(), 2);
        assert_eq!(snap.live_total(), 1);
        assert!((snap.cache_hit_rate() - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_live_source_not_counted_as_cache() {
        let metrics = EngineMetrics::new();
        metrics.cache_served(PhotoSource::Live);
        assert_eq!(metrics.snapshot().cache_hits(), 0);
    }

    #[test]
    fn test_write_failures_are_counted_separately() {
        let metrics = EngineMetrics::new();
        metrics.coverage_write_failed();
        metrics.coverage_write_failed();
        metrics.persist_failed();

        let snap = metrics.snapshot();
        assert_eq!(snap.coverage_write_failures, 2);
        assert_eq!(snap.persist_failures, 1);
        assert_eq!(snap.failures, 0);
        assert!(snap.to_string().contains("coverage_write_failures=2"));
    }

    #[test]
    fn test_idle_hit_rate_is_zero() {
        assert_eq!(MetricsSnapshot::default().cache_hit_rate(), 0.0);
    }

    #[test]
    fn test_cache_stats_efficiency() {
        let stats = CacheStats::new(500, 4, 3);
        assert!((stats.cache_efficiency - 75.0).abs() < 1e-12);
        assert_eq!(CacheStats::new(0, 0, 0).cache_efficiency, 0.0);
        assert!(stats.to_string().contains("75.0% efficiency"));
    }
}
