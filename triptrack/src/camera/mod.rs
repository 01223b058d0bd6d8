//! Map camera framing.
//!
//! [`fit`] computes the viewport that frames a route and a set of points
//! (pickup, drop, live vehicle position). It is a pure function: the same
//! inputs always give the same viewport, and nothing is retained between
//! calls. Deciding *when* to re-fit is the caller's concern.
//!
//! # Algorithm
//!
//! ```text
//! route polyline (>= 2 distinct points)?  ── yes ──► route bbox ∪ points
//!            │ no
//! any points?                             ── yes ──► bbox of points
//!            │ no
//!            └──────────────────────────────────────► Viewport::Automatic
//!
//! zero-extent axis  ──► widened to the single-point radius
//! result            ──► padded by padding_factor on every side
//! ```

use crate::coord::{meters_to_lat_degrees, meters_to_lon_degrees, Coordinate, GeoBounds};

/// Default padding added on each side, as a fraction of the span.
pub const DEFAULT_PADDING_FACTOR: f64 = 0.35;

/// Default half-extent of the region used to frame a single point.
pub const DEFAULT_SINGLE_POINT_RADIUS_METERS: f64 = 2_000.0;

/// Tunables for [`fit_with`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitOptions {
    /// Padding on each side as a fraction of the span (0.35 = 35%).
    pub padding_factor: f64,
    /// Half-extent used when the framed area has no width or height.
    pub single_point_radius_meters: f64,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            padding_factor: DEFAULT_PADDING_FACTOR,
            single_point_radius_meters: DEFAULT_SINGLE_POINT_RADIUS_METERS,
        }
    }
}

/// What the map camera should show.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Viewport {
    /// Nothing to frame; the rendering layer picks its own default.
    Automatic,
    /// A concrete region.
    Region(MapRegion),
}

impl Viewport {
    /// The framed region, if any.
    pub fn region(&self) -> Option<&MapRegion> {
        match self {
            Viewport::Automatic => None,
            Viewport::Region(region) => Some(region),
        }
    }

    pub fn is_automatic(&self) -> bool {
        matches!(self, Viewport::Automatic)
    }
}

/// A framed map region.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapRegion {
    /// Center of the padded bounds.
    pub center: Coordinate,
    /// Padded bounds.
    pub bounds: GeoBounds,
    /// Latitude extent in degrees.
    pub latitude_delta: f64,
    /// Longitude extent in degrees.
    pub longitude_delta: f64,
    /// Padding factor that was applied.
    pub padding_factor: f64,
}

impl MapRegion {
    fn from_bounds(bounds: GeoBounds, padding_factor: f64) -> Self {
        Self {
            center: bounds.center(),
            bounds,
            latitude_delta: bounds.height(),
            longitude_delta: bounds.width(),
            padding_factor,
        }
    }

    /// Whether `coord` is visible in this region.
    pub fn contains(&self, coord: Coordinate) -> bool {
        self.bounds.contains(coord)
    }
}

/// Frame `points` and an optional route polyline with the default single-point radius.
pub fn fit(
    points: &[Coordinate],
    route_polyline: Option<&[Coordinate]>,
    padding_factor: f64,
) -> Viewport {
    fit_with(
        points,
        route_polyline,
        &FitOptions {
            padding_factor,
            ..FitOptions::default()
        },
    )
}

/// Frame `points` and an optional route polyline.
pub fn fit_with(
    points: &[Coordinate],
    route_polyline: Option<&[Coordinate]>,
    options: &FitOptions,
) -> Viewport {
    let route = route_polyline.unwrap_or(&[]);

    let bounds = if is_non_degenerate(route) {
        // Route frame dominates; points only push its edges outward
        GeoBounds::from_coordinates(route).map(|mut bounds| {
            for point in points {
                if !bounds.contains(*point) {
                    bounds.extend(*point);
                }
            }
            bounds
        })
    } else {
        GeoBounds::from_coordinates(points.iter().chain(route.iter()))
    };

    let Some(bounds) = bounds else {
        return Viewport::Automatic;
    };

    let bounds = widen_degenerate(bounds, options.single_point_radius_meters);
    Viewport::Region(MapRegion::from_bounds(
        bounds.padded(options.padding_factor),
        options.padding_factor,
    ))
}

/// A polyline frames a route when it has at least two distinct coordinates.
fn is_non_degenerate(polyline: &[Coordinate]) -> bool {
    match polyline.split_first() {
        Some((first, rest)) => rest.iter().any(|c| c != first),
        None => false,
    }
}

/// Give any zero-extent axis a fixed half-extent around the center.
fn widen_degenerate(bounds: GeoBounds, radius_meters: f64) -> GeoBounds {
    let radius_meters = radius_meters.max(1.0);
    let center = bounds.center();
    let mut widened = bounds;

    if bounds.height() == 0.0 {
        let dlat = meters_to_lat_degrees(radius_meters);
        widened.min_lat = (center.latitude - dlat).max(crate::coord::MIN_LAT);
        widened.max_lat = (center.latitude + dlat).min(crate::coord::MAX_LAT);
    }
    if bounds.width() == 0.0 {
        let dlon = meters_to_lon_degrees(radius_meters, center.latitude);
        widened.min_lon = (center.longitude - dlon).max(crate::coord::MIN_LON);
        widened.max_lon = (center.longitude + dlon).min(crate::coord::MAX_LON);
    }

    widened
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(lat: f64, lon: f64) -> Coordinate {
        Coordinate::new(lat, lon).unwrap()
    }

    fn region(viewport: Viewport) -> MapRegion {
        *viewport.region().expect("expected a region")
    }

    #[test]
    fn test_no_input_is_automatic() {
        assert_eq!(fit(&[], None, 0.35), Viewport::Automatic);
        assert_eq!(fit(&[], Some(&[]), 0.35), Viewport::Automatic);
    }

    #[test]
    fn test_route_bounds_padded() {
        let route = [c(51.0, -1.0), c(52.0, 1.0)];
        let region = region(fit(&[], Some(&route), 0.5));

        assert!((region.bounds.min_lat - 50.5).abs() < 1e-9);
        assert!((region.bounds.max_lat - 52.5).abs() < 1e-9);
        assert!((region.bounds.min_lon - -2.0).abs() < 1e-9);
        assert!((region.bounds.max_lon - 2.0).abs() < 1e-9);
        assert_eq!(region.center, c(51.5, 0.0));
        assert_eq!(region.padding_factor, 0.5);
    }

    #[test]
    fn test_live_position_inside_route_does_not_change_frame() {
        let route = [c(51.0, -1.0), c(52.0, 1.0)];
        let with_point = fit(&[c(51.5, 0.0)], Some(&route), 0.35);
        let without = fit(&[], Some(&route), 0.35);
        assert_eq!(with_point, without);
    }

    #[test]
    fn test_live_position_outside_route_extends_minimally() {
        let route = [c(51.0, -1.0), c(52.0, 1.0)];
        let region = region(fit(&[c(53.0, 0.0)], Some(&route), 0.0));

        assert_eq!(region.bounds, GeoBounds::new(51.0, 53.0, -1.0, 1.0));
    }

    #[test]
    fn test_points_only_frame() {
        let pickup = c(51.5238, -0.1586);
        let drop = c(51.5034, -0.1276);
        let region = region(fit(&[pickup, drop], None, 0.0));

        assert_eq!(region.bounds, GeoBounds::new(51.5034, 51.5238, -0.1586, -0.1276));
    }

    #[test]
    fn test_single_point_uses_fixed_radius() {
        let drop = c(51.5034, -0.1276);
        let region = region(fit(&[drop], None, 0.0));

        assert!(region.latitude_delta > 0.0);
        assert!(region.longitude_delta > 0.0);
        assert!(region.contains(drop));
        // 2 km each way is about 0.036 degrees of latitude in total
        assert!((region.latitude_delta - 0.03597).abs() < 1e-3);
        assert!((region.center.latitude - drop.latitude).abs() < 1e-9);
        assert!((region.center.longitude - drop.longitude).abs() < 1e-9);
    }

    #[test]
    fn test_custom_single_point_radius() {
        let options = FitOptions {
            padding_factor: 0.0,
            single_point_radius_meters: 500.0,
        };
        let small = region(fit_with(&[c(10.0, 10.0)], None, &options));
        let default = region(fit(&[c(10.0, 10.0)], None, 0.0));
        assert!(small.latitude_delta < default.latitude_delta);
    }

    #[test]
    fn test_degenerate_route_falls_back_to_points() {
        let stop = c(40.0, -74.0);
        let route = [stop, stop];
        let other = c(40.1, -74.1);
        let region = region(fit(&[other], Some(&route), 0.0));

        assert_eq!(region.bounds, GeoBounds::new(40.0, 40.1, -74.1, -74.0));
    }

    #[test]
    fn test_axis_aligned_points_keep_non_zero_area() {
        let region = region(fit(&[c(10.0, 5.0), c(11.0, 5.0)], None, 0.35));
        assert!(region.longitude_delta > 0.0);
        assert!(region.latitude_delta > 1.0);
    }

    #[test]
    fn test_deterministic() {
        let route = [c(1.0, 1.0), c(2.0, 3.0)];
        let points = [c(0.5, 2.0)];
        assert_eq!(
            fit(&points, Some(&route), 0.35),
            fit(&points, Some(&route), 0.35)
        );
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        fn coordinate() -> impl Strategy<Value = Coordinate> {
            (-80.0..80.0_f64, -170.0..170.0_f64).prop_map(|(lat, lon)| c(lat, lon))
        }

        proptest! {
            #[test]
            fn test_fit_contains_points_and_route(
                route in proptest::collection::vec(coordinate(), 2..30),
                points in proptest::collection::vec(coordinate(), 0..5),
                padding in 0.0..1.0_f64,
            ) {
                prop_assume!(is_non_degenerate(&route));
                let viewport = fit(&points, Some(&route), padding);
                let region = viewport.region().unwrap();

                let route_bounds = GeoBounds::from_coordinates(&route).unwrap();
                prop_assert!(region.bounds.contains_bounds(&route_bounds));
                for p in &points {
                    prop_assert!(region.contains(*p));
                }
            }

            #[test]
            fn test_single_point_never_zero_area(
                point in coordinate(),
                padding in 0.0..1.0_f64,
            ) {
                let region = *fit(&[point], None, padding).region().unwrap();
                prop_assert!(region.latitude_delta > 0.0);
                prop_assert!(region.longitude_delta > 0.0);
                prop_assert!(region.contains(point));
            }
        }
    }
}
