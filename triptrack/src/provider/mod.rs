//! External collaborator abstraction
//!
//! This module defines the traits the tracking engine consumes (geocoding,
//! directions, trip telemetry) and HTTP-backed implementations of each.
//!
//! # Example
//!
//! ```ignore
//! use triptrack::provider::{NominatimGeocoder, OsrmDirections, ReqwestClient};
//!
//! let http_client = ReqwestClient::new()?;
//! let geocoder = NominatimGeocoder::new(http_client.clone(), DEFAULT_NOMINATIM_URL);
//! let directions = OsrmDirections::new(http_client, DEFAULT_OSRM_URL);
//! ```

mod http;
mod nominatim;
mod osrm;
mod rest_backend;
mod types;

pub use http::{AsyncHttpClient, HttpRequest, ReqwestClient, DEFAULT_HTTP_TIMEOUT_SECS};
pub use nominatim::{NominatimGeocoder, DEFAULT_NOMINATIM_URL};
pub use osrm::{OsrmDirections, DEFAULT_OSRM_URL};
pub use rest_backend::RestTripBackend;
pub use types::{BoxFuture, DirectionsProvider, Geocoder, ProviderError, TripBackend, TripId};

#[cfg(test)]
pub use http::tests::MockAsyncHttpClient;
