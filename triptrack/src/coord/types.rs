//! Coordinate and bounding box types.

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

/// Errors produced when constructing coordinates.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordError {
    /// Latitude outside [-90, 90] or not finite.
    #[error("Invalid latitude: {0}")]
    InvalidLatitude(f64),

    /// Longitude outside [-180, 180] or not finite.
    #[error("Invalid longitude: {0}")]
    InvalidLongitude(f64),
}

/// A WGS84 position in decimal degrees.
///
/// Values built through [`Coordinate::new`] are guaranteed to be finite and
/// within the valid latitude/longitude ranges.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    /// Create a validated coordinate.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, CoordError> {
        if !latitude.is_finite() || !(MIN_LAT..=MAX_LAT).contains(&latitude) {
            return Err(CoordError::InvalidLatitude(latitude));
        }
        if !longitude.is_finite() || !(MIN_LON..=MAX_LON).contains(&longitude) {
            return Err(CoordError::InvalidLongitude(longitude));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.5}, {:.5})", self.latitude, self.longitude)
    }
}

/// Geographic bounding rectangle in degrees.
///
/// Longitudes are treated linearly; rectangles never wrap the antimeridian.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoBounds {
    /// Minimum (southernmost) latitude
    pub min_lat: f64,
    /// Maximum (northernmost) latitude
    pub max_lat: f64,
    /// Minimum (westernmost) longitude
    pub min_lon: f64,
    /// Maximum (easternmost) longitude
    pub max_lon: f64,
}

impl GeoBounds {
    /// Create a new bounding box.
    pub fn new(min_lat: f64, max_lat: f64, min_lon: f64, max_lon: f64) -> Self {
        Self {
            min_lat,
            max_lat,
            min_lon,
            max_lon,
        }
    }

    /// Create a zero-area bounding box around a single coordinate.
    pub fn from_coordinate(coord: Coordinate) -> Self {
        Self::new(
            coord.latitude,
            coord.latitude,
            coord.longitude,
            coord.longitude,
        )
    }

    /// Bounding box of a set of coordinates, or `None` when empty.
    pub fn from_coordinates<'a, I>(coords: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Coordinate>,
    {
        let mut iter = coords.into_iter();
        let first = iter.next()?;
        let mut bounds = Self::from_coordinate(*first);
        for coord in iter {
            bounds.extend(*coord);
        }
        Some(bounds)
    }

    /// Grow this bounding box minimally so it includes `coord`.
    pub fn extend(&mut self, coord: Coordinate) {
        self.min_lat = self.min_lat.min(coord.latitude);
        self.max_lat = self.max_lat.max(coord.latitude);
        self.min_lon = self.min_lon.min(coord.longitude);
        self.max_lon = self.max_lon.max(coord.longitude);
    }

    /// Whether `coord` lies inside or on the edge of this box.
    pub fn contains(&self, coord: Coordinate) -> bool {
        (self.min_lat..=self.max_lat).contains(&coord.latitude)
            && (self.min_lon..=self.max_lon).contains(&coord.longitude)
    }

    /// Whether `other` lies entirely inside this box.
    pub fn contains_bounds(&self, other: &GeoBounds) -> bool {
        self.min_lat <= other.min_lat
            && self.max_lat >= other.max_lat
            && self.min_lon <= other.min_lon
            && self.max_lon >= other.max_lon
    }

    /// Center of the box.
    pub fn center(&self) -> Coordinate {
        Coordinate {
            latitude: (self.min_lat + self.max_lat) / 2.0,
            longitude: (self.min_lon + self.max_lon) / 2.0,
        }
    }

    /// Width of the box in degrees of longitude.
    pub fn width(&self) -> f64 {
        self.max_lon - self.min_lon
    }

    /// Height of the box in degrees of latitude.
    pub fn height(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    /// True when the box has zero width and zero height.
    pub fn is_point(&self) -> bool {
        self.width() == 0.0 && self.height() == 0.0
    }

    /// Expand every side by `factor` times the span on that axis,
    /// clamped to the valid coordinate ranges.
    pub fn padded(&self, factor: f64) -> Self {
        let factor = factor.max(0.0);
        let dlat = self.height() * factor;
        let dlon = self.width() * factor;
        Self {
            min_lat: (self.min_lat - dlat).max(MIN_LAT),
            max_lat: (self.max_lat + dlat).min(MAX_LAT),
            min_lon: (self.min_lon - dlon).max(MIN_LON),
            max_lon: (self.max_lon + dlon).min(MAX_LON),
        }
    }
}
