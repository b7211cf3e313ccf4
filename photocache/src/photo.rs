//! Cached photo records.
//!
//! A [`CachedPhoto`] is owned by the persistence layer; the decision engine
//! only reads it. Ordering helpers here define "recency" once so the store,
//! the sampler and the simple path all agree on it.

use std::cmp::Ordering;
use std::io::{Read, Write};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geo::{BoundingBox, GeoPoint};

/// Errors reading or writing photo files.
#[derive(Debug, Error)]
pub enum PhotoFileError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid photo JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Immutable photo record as stored in the cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedPhoto {
    /// Provider-assigned unique identifier.
    pub id: String,
    /// WGS84 longitude in degrees.
    pub longitude: f64,
    /// WGS84 latitude in degrees.
    pub latitude: f64,
    /// Capture time, used as the recency tiebreak.
    pub captured_at: DateTime<Utc>,
}

impl CachedPhoto {
    pub fn new(
        id: impl Into<String>,
        longitude: f64,
        latitude: f64,
        captured_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            longitude,
            latitude,
            captured_at,
        }
    }

    /// Photo position as a point.
    pub fn point(&self) -> GeoPoint {
        GeoPoint::new(self.longitude, self.latitude)
    }

    /// Whether the photo falls inside `bbox`.
    pub fn is_within(&self, bbox: &BoundingBox) -> bool {
        bbox.contains(self.point())
    }
}

/// Most recent first; equal timestamps fall back to id so the order is total.
pub fn recency_order(a: &CachedPhoto, b: &CachedPhoto) -> Ordering {
    b.captured_at
        .cmp(&a.captured_at)
        .then_with(|| a.id.cmp(&b.id))
}

/// Sort photos most recent first.
pub fn sort_by_recency(photos: &mut [CachedPhoto]) {
    photos.sort_by(recency_order);
}

/// Read a JSON array of photos.
pub fn read_photos<R: Read>(reader: R) -> Result<Vec<CachedPhoto>, PhotoFileError> {
    Ok(serde_json::from_reader(reader)?)
}

/// Write photos as a pretty-printed JSON array.
pub fn write_photos<W: Write>(writer: W, photos: &[CachedPhoto]) -> Result<(), PhotoFileError> {
    serde_json::to_writer_pretty(writer, photos)?;
    Ok(())
}
