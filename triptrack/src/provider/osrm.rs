//! OSRM-compatible driving directions.
//!
//! # API Endpoint
//!
//! `{base}/route/v1/driving/{lon},{lat};{lon},{lat}?alternatives={bool}&geometries=geojson&overview=full`
//!
//! OSRM orders coordinates as longitude,latitude both in the path and in the
//! returned GeoJSON geometry. Routes come back best first; `code` is `"Ok"`
//! on success and `"NoRoute"` when the endpoints are not connected.

use serde::Deserialize;

use super::http::{build_url, parse_json, AsyncHttpClient, HttpRequest};
use super::types::{BoxFuture, DirectionsProvider, ProviderError};
use crate::coord::Coordinate;
use crate::route::RouteCandidate;

/// Public OSRM demo server.
pub const DEFAULT_OSRM_URL: &str = "https://router.project-osrm.org";

#[derive(Deserialize)]
struct RouteResponse {
    code: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    routes: Vec<OsrmRoute>,
}

#[derive(Deserialize)]
struct OsrmRoute {
    distance: f64,
    duration: f64,
    geometry: Geometry,
}

#[derive(Deserialize)]
struct Geometry {
    coordinates: Vec<[f64; 2]>,
}

/// Directions provider backed by an OSRM HTTP server.
pub struct OsrmDirections<C: AsyncHttpClient> {
    http_client: C,
    base_url: String,
    profile: String,
}

impl<C: AsyncHttpClient> OsrmDirections<C> {
    pub fn new(http_client: C, base_url: impl Into<String>) -> Self {
        Self {
            http_client,
            base_url: base_url.into(),
            profile: "driving".to_string(),
        }
    }

    fn build_url(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        alternates: bool,
    ) -> Result<String, ProviderError> {
        let path = format!(
            "route/v1/{}/{},{};{},{}",
            self.profile,
            origin.longitude,
            origin.latitude,
            destination.longitude,
            destination.latitude
        );
        build_url(
            &self.base_url,
            &path,
            &[
                ("alternatives", alternates.to_string()),
                ("geometries", "geojson".to_string()),
                ("overview", "full".to_string()),
            ],
        )
    }
}

fn parse_routes(body: &[u8]) -> Result<Vec<RouteCandidate>, ProviderError> {
    let response: RouteResponse = parse_json(body, "route response")?;

    match response.code.as_str() {
        "Ok" => {}
        "NoRoute" => return Ok(Vec::new()),
        other => {
            return Err(ProviderError::Rejected(format!(
                "{}: {}",
                other,
                response.message.unwrap_or_default()
            )))
        }
    }

    response
        .routes
        .into_iter()
        .map(|route| {
            let polyline = route
                .geometry
                .coordinates
                .into_iter()
                .map(|[lon, lat]| Coordinate::new(lat, lon))
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
            Ok(RouteCandidate {
                polyline,
                distance_meters: route.distance,
                travel_time_seconds: route.duration,
            })
        })
        .collect()
}

impl<C: AsyncHttpClient> DirectionsProvider for OsrmDirections<C> {
    fn name(&self) -> &str {
        "OSRM"
    }

    fn request_directions(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        alternates: bool,
    ) -> BoxFuture<'_, Result<Vec<RouteCandidate>, ProviderError>> {
        Box::pin(async move {
            let url = self.build_url(origin, destination, alternates)?;
            let body = self.http_client.get(HttpRequest::get(url)).await?;
            parse_routes(&body)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::http::tests::MockAsyncHttpClient;

    const TWO_ROUTES: &str = r#"{
        "code": "Ok",
        "routes": [
            {"distance": 12000.0, "duration": 900.0,
             "geometry": {"type": "LineString", "coordinates": [[-0.1276, 51.5034], [-0.1586, 51.5238]]}},
            {"distance": 9500.0, "duration": 1100.0,
             "geometry": {"type": "LineString", "coordinates": [[-0.1276, 51.5034], [-0.14, 51.51], [-0.1586, 51.5238]]}}
        ]
    }"#;

    fn origin() -> Coordinate {
        Coordinate::new(51.5034, -0.1276).unwrap()
    }

    fn destination() -> Coordinate {
        Coordinate::new(51.5238, -0.1586).unwrap()
    }

    #[tokio::test]
    async fn test_parses_routes_in_provider_order() {
        let provider = OsrmDirections::new(MockAsyncHttpClient::ok(TWO_ROUTES), DEFAULT_OSRM_URL);

        let routes = provider
            .request_directions(origin(), destination(), true)
            .await
            .unwrap();

        assert_eq!(routes.len(), 2);
        assert_eq!(routes[0].distance_meters, 12000.0);
        assert_eq!(routes[1].polyline.len(), 3);
        // GeoJSON lon,lat is flipped into latitude/longitude
        assert_eq!(routes[0].polyline[0], origin());
    }

    #[tokio::test]
    async fn test_url_uses_lon_lat_order() {
        let provider = OsrmDirections::new(MockAsyncHttpClient::ok(TWO_ROUTES), DEFAULT_OSRM_URL);
        provider
            .request_directions(origin(), destination(), false)
            .await
            .unwrap();

        let url = provider.http_client.last_request().unwrap().url;
        assert!(url.contains("/route/v1/driving/-0.1276,51.5034;-0.1586,51.5238"));
        assert!(url.contains("alternatives=false"));
    }

    #[tokio::test]
    async fn test_no_route_is_empty() {
        let body = r#"{"code":"NoRoute","message":"Impossible route between points","routes":[]}"#;
        let provider = OsrmDirections::new(MockAsyncHttpClient::ok(body), DEFAULT_OSRM_URL);

        let routes = provider
            .request_directions(origin(), destination(), true)
            .await
            .unwrap();
        assert!(routes.is_empty());
    }

    #[tokio::test]
    async fn test_other_codes_are_errors() {
        let body = r#"{"code":"InvalidQuery","message":"Query string malformed"}"#;
        let provider = OsrmDirections::new(MockAsyncHttpClient::ok(body), DEFAULT_OSRM_URL);

        let err = provider
            .request_directions(origin(), destination(), true)
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Rejected(msg) if msg.contains("InvalidQuery")));
    }
}
