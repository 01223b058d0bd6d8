//! Collaborator traits and shared provider types.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::coord::Coordinate;
use crate::history::{DeviationWarning, LocationSample};
use crate::route::RouteCandidate;

/// Boxed future type for dyn-compatible async methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Transport or upstream failure from an external provider.
///
/// Always recoverable: callers may retry, the engine itself never does.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// Request could not be sent or the response body could not be read.
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Upstream answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    /// Response did not match the expected shape.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Provider is reachable but declined the request.
    #[error("Provider rejected request: {0}")]
    Rejected(String),
}

/// Identity of an active trip in the backend.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TripId(pub String);

impl TripId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TripId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Forward geocoding provider.
pub trait Geocoder: Send + Sync {
    /// Provider name for logs.
    fn name(&self) -> &str;

    /// Resolve `address` to zero or more candidate coordinates, best first.
    fn geocode<'a>(
        &'a self,
        address: &'a str,
    ) -> BoxFuture<'a, Result<Vec<Coordinate>, ProviderError>>;
}

/// Driving directions provider.
pub trait DirectionsProvider: Send + Sync {
    /// Provider name for logs.
    fn name(&self) -> &str;

    /// Request driving routes, in the provider's preference order.
    ///
    /// An empty vector means the provider found no route.
    fn request_directions(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        alternates: bool,
    ) -> BoxFuture<'_, Result<Vec<RouteCandidate>, ProviderError>>;
}

/// Backend holding trips and their live telemetry.
pub trait TripBackend: Send + Sync {
    /// Look up the active trip for a consignment.
    fn fetch_trip_id_for_consignment<'a>(
        &'a self,
        consignment_id: &'a str,
    ) -> BoxFuture<'a, Result<Option<TripId>, ProviderError>>;

    /// Most recent reported position for a trip.
    fn fetch_latest_location<'a>(
        &'a self,
        trip_id: &'a TripId,
    ) -> BoxFuture<'a, Result<Option<LocationSample>, ProviderError>>;

    /// Up to `limit` recent positions for a trip, in any order.
    fn fetch_location_history<'a>(
        &'a self,
        trip_id: &'a TripId,
        limit: usize,
    ) -> BoxFuture<'a, Result<Vec<LocationSample>, ProviderError>>;

    /// Deviation warnings for a trip, oldest first.
    fn fetch_deviation_warnings<'a>(
        &'a self,
        trip_id: &'a TripId,
    ) -> BoxFuture<'a, Result<Vec<DeviationWarning>, ProviderError>>;
}
