//! Photocache - coverage-driven caching for bounding-box photo queries
//!
//! This library decides whether a request for photos inside a bounding box
//! can be answered from a local cache of a rate-limited external provider,
//! picks a geographically even subset when the cache holds more photos than
//! were asked for, and falls back to a live fetch when cached coverage is too
//! sparse or skewed.
//!
//! # Architecture
//!
//! ```text
//! request ──► CacheDecisionEngine ──┬─► CoverageStore   (complete / incomplete verdicts)
//!                                   ├─► PhotoStore      (count + list by bbox)
//!                                   ├─► SpatialSampler ─► distribution::score ─► Grid
//!                                   └─► LiveFetcher     (miss / fallback)
//! ```
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use photocache::engine::{CacheDecisionEngine, EngineConfig};
//! use photocache::store::{MemoryCoverageStore, MemoryPhotoStore};
//!
//! let engine = CacheDecisionEngine::new(
//!     EngineConfig::default(),
//!     Arc::new(MemoryPhotoStore::new()),
//!     Arc::new(MemoryCoverageStore::default()),
//!     Arc::new(my_provider),
//! )?;
//! let resolution = engine.resolve("9.9,53.5,10.1,53.6".parse()?, 200).await?;
//! println!("{} photos from {}", resolution.photos.len(), resolution.source);
//! ```

pub mod config;
pub mod coverage;
pub mod distribution;
pub mod engine;
pub mod error;
pub mod geo;
pub mod logging;
pub mod metrics;
pub mod photo;
pub mod provider;
pub mod sampling;
pub mod store;

pub use coverage::{classify, CoverageRecord, CoverageStatus, RegionKey};
pub use engine::{CacheDecisionEngine, EngineConfig, PhotoSource, Resolution};
pub use error::ResolveError;
pub use geo::{BoundingBox, Grid, GridCell};
pub use photo::CachedPhoto;
pub use sampling::{SampleResult, SpatialSampler};
