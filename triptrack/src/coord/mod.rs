//! Coordinate module
//!
//! Provides validated WGS84 coordinates, bounding rectangles and the small
//! amount of spherical math the camera needs to turn meters into degrees.

mod types;

pub use types::{CoordError, Coordinate, GeoBounds, MAX_LAT, MAX_LON, MIN_LAT, MIN_LON};

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_METERS: f64 = 6_371_008.8;

/// Meters per degree of latitude (constant on a sphere).
pub const METERS_PER_DEGREE_LAT: f64 = EARTH_RADIUS_METERS * std::f64::consts::PI / 180.0;

/// Smallest cosine used when converting meters to degrees of longitude.
///
/// Keeps the conversion finite near the poles.
const MIN_COS_LAT: f64 = 0.01;

/// Convert a north-south distance in meters to degrees of latitude.
#[inline]
pub fn meters_to_lat_degrees(meters: f64) -> f64 {
    meters / METERS_PER_DEGREE_LAT
}

/// Convert an east-west distance in meters to degrees of longitude at `latitude`.
#[inline]
pub fn meters_to_lon_degrees(meters: f64, latitude: f64) -> f64 {
    let cos_lat = latitude.to_radians().cos().abs().max(MIN_COS_LAT);
    meters / (METERS_PER_DEGREE_LAT * cos_lat)
}

/// Great-circle distance between two coordinates in meters (haversine).
pub fn haversine_meters(a: Coordinate, b: Coordinate) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let dlat = lat2 - lat1;
    let dlon = (b.longitude - a.longitude).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_METERS * h.sqrt().asin()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meters_to_lat_degrees() {
        let deg = meters_to_lat_degrees(METERS_PER_DEGREE_LAT);
        assert!((deg - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_meters_to_lon_degrees_widens_with_latitude() {
        let at_equator = meters_to_lon_degrees(2000.0, 0.0);
        let at_london = meters_to_lon_degrees(2000.0, 51.5);
        assert!(at_london > at_equator);
        assert!(meters_to_lon_degrees(2000.0, 90.0).is_finite());
    }

    #[test]
    fn test_haversine_known_distance() {
        // Westminster to Baker Street, roughly 3.1 km.
        let a = Coordinate::new(51.5034, -0.1276).unwrap();
        let b = Coordinate::new(51.5238, -0.1586).unwrap();
        let d = haversine_meters(a, b);
        assert!((2_900.0..3_300.0).contains(&d), "distance was {d}");
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_haversine_symmetric(
                lat1 in -90.0..90.0_f64,
                lon1 in -180.0..180.0_f64,
                lat2 in -90.0..90.0_f64,
                lon2 in -180.0..180.0_f64,
            ) {
                let a = Coordinate::new(lat1, lon1)?;
                let b = Coordinate::new(lat2, lon2)?;
                let ab = haversine_meters(a, b);
                let ba = haversine_meters(b, a);
                prop_assert!((ab - ba).abs() < 1e-6);
                prop_assert!(ab >= 0.0);
            }
        }
    }
}
