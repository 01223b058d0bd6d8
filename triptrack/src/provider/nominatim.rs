//! Nominatim-compatible forward geocoder.
//!
//! Works with OpenStreetMap Nominatim and compatible services such as
//! geocode.maps.co, which share the `/search?format=json` endpoint.
//!
//! # API Endpoint
//!
//! `{base}/search?q={address}&format=json&limit={n}[&api_key={key}]`
//!
//! Results are JSON objects with `lat` and `lon` encoded as strings.

use serde::Deserialize;

use super::http::{build_url, parse_json, AsyncHttpClient, HttpRequest};
use super::types::{BoxFuture, Geocoder, ProviderError};
use crate::coord::Coordinate;

/// Public OpenStreetMap Nominatim instance.
pub const DEFAULT_NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org";

/// Maximum candidates requested per query.
const MAX_RESULTS: usize = 5;

#[derive(Deserialize)]
struct SearchResult {
    lat: String,
    lon: String,
}

/// Geocoder backed by a Nominatim-style HTTP API.
pub struct NominatimGeocoder<C: AsyncHttpClient> {
    http_client: C,
    base_url: String,
    api_key: Option<String>,
}

impl<C: AsyncHttpClient> NominatimGeocoder<C> {
    pub fn new(http_client: C, base_url: impl Into<String>) -> Self {
        Self {
            http_client,
            base_url: base_url.into(),
            api_key: None,
        }
    }

    /// Attach an API key (sent as the `api_key` query parameter).
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    fn build_url(&self, address: &str) -> Result<String, ProviderError> {
        let mut params = vec![
            ("q", address.to_string()),
            ("format", "json".to_string()),
            ("limit", MAX_RESULTS.to_string()),
        ];
        if let Some(key) = &self.api_key {
            params.push(("api_key", key.clone()));
        }
        build_url(&self.base_url, "search", &params)
    }
}

fn parse_results(body: &[u8]) -> Result<Vec<Coordinate>, ProviderError> {
    let results: Vec<SearchResult> = parse_json(body, "geocoding response")?;

    results
        .into_iter()
        .take(MAX_RESULTS)
        .map(|r| {
            let lat = r
                .lat
                .parse::<f64>()
                .map_err(|e| ProviderError::InvalidResponse(format!("invalid lat: {}", e)))?;
            let lon = r
                .lon
                .parse::<f64>()
                .map_err(|e| ProviderError::InvalidResponse(format!("invalid lon: {}", e)))?;
            Coordinate::new(lat, lon).map_err(|e| ProviderError::InvalidResponse(e.to_string()))
        })
        .collect()
}

impl<C: AsyncHttpClient> Geocoder for NominatimGeocoder<C> {
    fn name(&self) -> &str {
        "Nominatim"
    }

    fn geocode<'a>(
        &'a self,
        address: &'a str,
    ) -> BoxFuture<'a, Result<Vec<Coordinate>, ProviderError>> {
        Box::pin(async move {
            let url = self.build_url(address)?;
            let body = self.http_client.get(HttpRequest::get(url)).await?;
            parse_results(&body)
        })
    }
}
