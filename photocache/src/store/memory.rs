//! In-memory store implementations.
//!
//! `MemoryPhotoStore` keeps photos in a `DashMap` keyed by provider id, which
//! gives insert-if-absent deduplication for free. `MemoryCoverageStore` wraps
//! `moka::future::Cache` so the number of tracked regions stays bounded and
//! old records can expire.

use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use moka::future::Cache as MokaCache;

use super::{BoxFuture, CoverageStore, CoverageSummary, PhotoStore, StoreError};
use crate::coverage::{CoverageRecord, RegionKey};
use crate::geo::BoundingBox;
use crate::photo::{sort_by_recency, CachedPhoto};

/// Default bound on tracked coverage regions.
pub const DEFAULT_MAX_REGIONS: u64 = 100_000;

/// Photo store held in process memory.
#[derive(Debug, Default)]
pub struct MemoryPhotoStore {
    photos: DashMap<String, CachedPhoto>,
}

impl MemoryPhotoStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with `photos` (duplicates by id are dropped).
    pub fn with_photos(photos: impl IntoIterator<Item = CachedPhoto>) -> Self {
        let store = Self::new();
        for photo in photos {
            store.photos.entry(photo.id.clone()).or_insert(photo);
        }
        store
    }

    pub fn len(&self) -> usize {
        self.photos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.photos.is_empty()
    }

    fn within(&self, bbox: &BoundingBox) -> Vec<CachedPhoto> {
        self.photos
            .iter()
            .filter(|entry| entry.value().is_within(bbox))
            .map(|entry| entry.value().clone())
            .collect()
    }
}

impl PhotoStore for MemoryPhotoStore {
    fn count_in_bbox(&self, bbox: BoundingBox) -> BoxFuture<'_, Result<usize, StoreError>> {
        Box::pin(async move {
            Ok(self
                .photos
                .iter()
                .filter(|entry| entry.value().is_within(&bbox))
                .count())
        })
    }

    fn photos_in_bbox(
        &self,
        bbox: BoundingBox,
        limit: Option<usize>,
    ) -> BoxFuture<'_, Result<Vec<CachedPhoto>, StoreError>> {
        Box::pin(async move {
            let mut photos = self.within(&bbox);
            sort_by_recency(&mut photos);
            if let Some(limit) = limit {
                photos.truncate(limit);
            }
            Ok(photos)
        })
    }

    fn store_photos(&self, photos: Vec<CachedPhoto>) -> BoxFuture<'_, Result<usize, StoreError>> {
        Box::pin(async move {
            let mut inserted = 0;
            for photo in photos {
                if let Entry::Vacant(slot) = self.photos.entry(photo.id.clone()) {
                    slot.insert(photo);
                    inserted += 1;
                }
            }
            Ok(inserted)
        })
    }

    fn total_count(&self) -> BoxFuture<'_, Result<u64, StoreError>> {
        Box::pin(async move { Ok(self.photos.len() as u64) })
    }
}

/// Coverage records held in a bounded moka cache.
pub struct MemoryCoverageStore {
    records: MokaCache<RegionKey, CoverageRecord>,
}

impl MemoryCoverageStore {
    /// Create a store tracking at most `max_regions`, optionally expiring
    /// records `ttl` after they were written.
    pub fn new(max_regions: u64, ttl: Option<Duration>) -> Self {
        let mut builder = MokaCache::builder().max_capacity(max_regions);
        if let Some(ttl) = ttl {
            builder = builder.time_to_live(ttl);
        }
        Self {
            records: builder.build(),
        }
    }
}

impl Default for MemoryCoverageStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_REGIONS, None)
    }
}

impl CoverageStore for MemoryCoverageStore {
    fn get(&self, region: RegionKey) -> BoxFuture<'_, Result<Option<CoverageRecord>, StoreError>> {
        Box::pin(async move { Ok(self.records.get(&region).await) })
    }

    fn put(&self, record: CoverageRecord) -> BoxFuture<'_, Result<(), StoreError>> {
        Box::pin(async move {
            self.records.insert(record.region.clone(), record).await;
            Ok(())
        })
    }

    fn summary(&self) -> BoxFuture<'_, Result<CoverageSummary, StoreError>> {
        Box::pin(async move {
            self.records.run_pending_tasks().await;
            let mut summary = CoverageSummary::default();
            for (_, record) in self.records.iter() {
                summary.total_regions += 1;
                if record.is_complete() {
                    summary.complete_regions += 1;
                }
            }
            Ok(summary)
        })
    }
}
