//! Geographic primitives for bounding-box photo queries.
//!
//! Coordinates are WGS84 degrees. A [`BoundingBox`] is validated on
//! construction; degenerate (zero width or height) boxes are accepted here
//! because expanding them is the caller's concern, but inverted or
//! out-of-range boxes are rejected.

pub mod grid;

pub use grid::{cell_for, Grid, GridCell, GridError, DEFAULT_GRID_SIZE, MAX_GRID_SIZE};

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Minimum valid latitude in degrees.
pub const MIN_LAT: f64 = -90.0;
/// Maximum valid latitude in degrees.
pub const MAX_LAT: f64 = 90.0;
/// Minimum valid longitude in degrees.
pub const MIN_LON: f64 = -180.0;
/// Maximum valid longitude in degrees.
pub const MAX_LON: f64 = 180.0;

/// Errors produced when validating a bounding box.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BoundsError {
    /// A coordinate was NaN or infinite.
    #[error("Bounding box coordinate is not finite")]
    NotFinite,

    /// Latitude outside [-90, 90].
    #[error("Invalid latitude: {0}. Must be between -90 and 90")]
    InvalidLatitude(f64),

    /// Longitude outside [-180, 180].
    #[error("Invalid longitude: {0}. Must be between -180 and 180")]
    InvalidLongitude(f64),

    /// Minimum exceeds maximum on one axis.
    #[error("Inverted bounding box: min {min} > max {max} on {axis} axis")]
    Inverted {
        axis: &'static str,
        min: f64,
        max: f64,
    },

    /// Text form could not be parsed.
    #[error("Cannot parse bounding box '{0}': expected min_lon,min_lat,max_lon,max_lat")]
    Parse(String),
}

/// A point in WGS84 degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lon: f64,
    pub lat: f64,
}

impl GeoPoint {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }
}

/// Axis-aligned geographic bounding box.
///
/// Invariant: `min_lon <= max_lon` and `min_lat <= max_lat`, all finite and
/// inside the WGS84 ranges.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl BoundingBox {
    /// Create a validated bounding box.
    ///
    /// # Errors
    ///
    /// Returns [`BoundsError`] if a coordinate is not finite, lies outside
    /// the WGS84 range, or if a minimum exceeds its maximum.
    pub fn new(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Result<Self, BoundsError> {
        let bbox = Self {
            min_lon,
            min_lat,
            max_lon,
            max_lat,
        };
        bbox.validate()?;
        Ok(bbox)
    }

    /// Check the invariants of a box that may have been built field by field.
    pub fn validate(&self) -> Result<(), BoundsError> {
        let coords = [self.min_lon, self.min_lat, self.max_lon, self.max_lat];
        if coords.iter().any(|c| !c.is_finite()) {
            return Err(BoundsError::NotFinite);
        }
        for lat in [self.min_lat, self.max_lat] {
            if !(MIN_LAT..=MAX_LAT).contains(&lat) {
                return Err(BoundsError::InvalidLatitude(lat));
            }
        }
        for lon in [self.min_lon, self.max_lon] {
            if !(MIN_LON..=MAX_LON).contains(&lon) {
                return Err(BoundsError::InvalidLongitude(lon));
            }
        }
        if self.min_lon > self.max_lon {
            return Err(BoundsError::Inverted {
                axis: "longitude",
                min: self.min_lon,
                max: self.max_lon,
            });
        }
        if self.min_lat > self.max_lat {
            return Err(BoundsError::Inverted {
                axis: "latitude",
                min: self.min_lat,
                max: self.max_lat,
            });
        }
        Ok(())
    }

    /// Width of the box in degrees of longitude.
    pub fn width(&self) -> f64 {
        self.max_lon - self.min_lon
    }

    /// Height of the box in degrees of latitude.
    pub fn height(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    /// Whether the point lies inside the box, edges included.
    pub fn contains(&self, point: GeoPoint) -> bool {
        (self.min_lon..=self.max_lon).contains(&point.lon)
            && (self.min_lat..=self.max_lat).contains(&point.lat)
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{}",
            self.min_lon, self.min_lat, self.max_lon, self.max_lat
        )
    }
}

impl FromStr for BoundingBox {
    type Err = BoundsError;

    /// Parse `min_lon,min_lat,max_lon,max_lat`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<f64> = s
            .split(',')
            .map(|p| p.trim().parse::<f64>())
            .collect::<Result<_, _>>()
            .map_err(|_| BoundsError::Parse(s.to_string()))?;

        match parts.as_slice() {
            [min_lon, min_lat, max_lon, max_lat] => {
                BoundingBox::new(*min_lon, *min_lat, *max_lon, *max_lat)
            }
            _ => Err(BoundsError::Parse(s.to_string())),
        }
    }
}
