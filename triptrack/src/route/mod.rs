//! Route request and selection.
//!
//! The [`RouteRequestEngine`] asks a [`DirectionsProvider`] for one or more
//! driving routes and keeps two selections over the result:
//!
//! - **Primary**: the first candidate in provider order (the provider's best estimate)
//! - **Shortest**: `argmin(distance_meters)`, ties going to the lowest index
//!
//! Both are retained in a [`RouteSet`] so callers can toggle between them
//! without re-requesting. The engine never retries; retry policy belongs to
//! the caller.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::coord::{Coordinate, GeoBounds};
use crate::geocoding::{GeocodeError, GeocodingPipeline};
use crate::provider::{DirectionsProvider, ProviderError};

/// A single driving route as returned by the provider.
///
/// Distance and time are kept exactly as received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteCandidate {
    pub polyline: Vec<Coordinate>,
    pub distance_meters: f64,
    pub travel_time_seconds: f64,
}

impl RouteCandidate {
    /// Bounding box of the polyline.
    pub fn bounds(&self) -> Option<GeoBounds> {
        GeoBounds::from_coordinates(&self.polyline)
    }

    /// Display summary in kilometers and whole minutes.
    pub fn summary(&self) -> RouteSummary {
        RouteSummary {
            distance_km: self.distance_meters / 1000.0,
            travel_time_minutes: (self.travel_time_seconds / 60.0).round() as u64,
        }
    }
}

/// Presentation-friendly route figures.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteSummary {
    pub distance_km: f64,
    pub travel_time_minutes: u64,
}

impl std::fmt::Display for RouteSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:.1} km, {} min",
            self.distance_km, self.travel_time_minutes
        )
    }
}

/// Which candidate of a [`RouteSet`] is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RouteSelection {
    /// Provider order index 0.
    #[default]
    Primary,
    /// Minimum distance.
    Shortest,
}

/// Non-empty ordered set of route candidates with both selections resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteSet {
    candidates: Vec<RouteCandidate>,
    shortest: usize,
}

impl RouteSet {
    /// Build a set from provider results, or `None` when there are no candidates.
    pub fn from_candidates(candidates: Vec<RouteCandidate>) -> Option<Self> {
        let shortest = shortest_index(&candidates)?;
        Some(Self {
            candidates,
            shortest,
        })
    }

    /// All candidates in provider order.
    pub fn candidates(&self) -> &[RouteCandidate] {
        &self.candidates
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    /// Always false; empty results are rejected at construction.
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// The provider's first candidate.
    pub fn primary(&self) -> &RouteCandidate {
        &self.candidates[0]
    }

    /// The candidate with the smallest distance.
    pub fn shortest(&self) -> &RouteCandidate {
        &self.candidates[self.shortest]
    }

    /// Provider-order index of the shortest candidate.
    pub fn shortest_index(&self) -> usize {
        self.shortest
    }

    /// The candidate for a given selection.
    pub fn selected(&self, selection: RouteSelection) -> &RouteCandidate {
        match selection {
            RouteSelection::Primary => self.primary(),
            RouteSelection::Shortest => self.shortest(),
        }
    }
}

/// Index of the minimum-distance candidate; the first one wins ties.
fn shortest_index(candidates: &[RouteCandidate]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (index, candidate) in candidates.iter().enumerate() {
        match best {
            Some((_, distance)) if candidate.distance_meters >= distance => {}
            // NaN distances never win against a real one
            Some(_) if candidate.distance_meters.is_nan() => {}
            _ => best = Some((index, candidate.distance_meters)),
        }
    }
    best.map(|(index, _)| index)
}

/// Errors from route requests.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RouteError {
    /// Valid coordinates, but the provider found no route.
    #[error("No route found")]
    NoRouteFound,

    /// Transport or provider failure.
    #[error("Directions provider error: {0}")]
    Provider(#[from] ProviderError),

    /// An endpoint address could not be resolved.
    #[error("Could not resolve {endpoint} address: {source}")]
    Geocoding {
        endpoint: &'static str,
        #[source]
        source: GeocodeError,
    },
}

/// Requests routes from a directions provider and selects among them.
#[derive(Clone)]
pub struct RouteRequestEngine {
    directions: Arc<dyn DirectionsProvider>,
}

impl RouteRequestEngine {
    pub fn new(directions: Arc<dyn DirectionsProvider>) -> Self {
        Self { directions }
    }

    /// Request driving routes between two coordinates.
    pub async fn request_routes(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        want_alternates: bool,
    ) -> Result<RouteSet, RouteError> {
        tracing::debug!(
            provider = self.directions.name(),
            %origin,
            %destination,
            want_alternates,
            "Requesting routes"
        );

        let candidates = self
            .directions
            .request_directions(origin, destination, want_alternates)
            .await
            .inspect_err(|e| tracing::warn!(error = %e, "Directions request failed"))?;

        let set = RouteSet::from_candidates(candidates).ok_or(RouteError::NoRouteFound)?;
        tracing::debug!(
            candidates = set.len(),
            primary_m = set.primary().distance_meters,
            shortest_m = set.shortest().distance_meters,
            "Routes received"
        );
        Ok(set)
    }

    /// Geocode both addresses, then request routes between them.
    ///
    /// Directions are only requested when both addresses resolved.
    pub async fn request_routes_between_addresses(
        &self,
        geocoding: &GeocodingPipeline,
        origin: &str,
        destination: &str,
        want_alternates: bool,
    ) -> Result<RouteSet, RouteError> {
        let (origin, destination) = geocoding.resolve_pair(origin, destination).await;
        let origin = origin.map_err(|source| RouteError::Geocoding {
            endpoint: "origin",
            source,
        })?;
        let destination = destination.map_err(|source| RouteError::Geocoding {
            endpoint: "destination",
            source,
        })?;
        self.request_routes(origin, destination, want_alternates)
            .await
    }
}
