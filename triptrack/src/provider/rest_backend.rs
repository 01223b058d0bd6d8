//! PostgREST-style trip backend.
//!
//! Reads trip identity and live telemetry from three tables exposed under
//! `{base}/rest/v1/`:
//!
//! | Table              | Columns used                                    |
//! |--------------------|-------------------------------------------------|
//! | `trips`            | `id`, `consignment_id`                          |
//! | `trip_locations`   | `trip_id`, `latitude`, `longitude`, `recorded_at` |
//! | `route_deviations` | `trip_id`, `created_at`, `distance_from_route`, `details` |
//!
//! Every request carries the project key as both the `apikey` header and a
//! bearer token.

use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::http::{build_url, parse_json, AsyncHttpClient, HttpRequest};
use super::types::{BoxFuture, ProviderError, TripBackend, TripId};
use crate::coord::Coordinate;
use crate::history::{DeviationWarning, LocationSample};

#[derive(Deserialize)]
struct TripRow {
    id: serde_json::Value,
}

#[derive(Deserialize)]
struct LocationRow {
    latitude: f64,
    longitude: f64,
    recorded_at: DateTime<Utc>,
}

impl LocationRow {
    fn into_sample(self) -> Result<LocationSample, ProviderError> {
        let coordinate = Coordinate::new(self.latitude, self.longitude)
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
        Ok(LocationSample::new(coordinate, self.recorded_at))
    }
}

#[derive(Deserialize)]
struct DeviationRow {
    created_at: DateTime<Utc>,
    distance_from_route: f64,
    #[serde(default)]
    details: Option<String>,
}

/// Trip backend reached over a PostgREST HTTP API.
pub struct RestTripBackend<C: AsyncHttpClient> {
    http_client: C,
    base_url: String,
    api_key: String,
}

impl<C: AsyncHttpClient> RestTripBackend<C> {
    pub fn new(http_client: C, base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http_client,
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    async fn select<T: serde::de::DeserializeOwned>(
        &self,
        table: &str,
        params: &[(&str, String)],
    ) -> Result<Vec<T>, ProviderError> {
        let url = build_url(&self.base_url, &format!("rest/v1/{}", table), params)?;
        let request = HttpRequest::get(url)
            .header("apikey", self.api_key.as_str())
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Accept", "application/json");
        let body = self.http_client.get(request).await?;
        parse_json(&body, table)
    }

    async fn locations(
        &self,
        trip_id: &TripId,
        limit: usize,
    ) -> Result<Vec<LocationRow>, ProviderError> {
        self.select(
            "trip_locations",
            &[
                ("select", "latitude,longitude,recorded_at".to_string()),
                ("trip_id", format!("eq.{}", trip_id)),
                ("order", "recorded_at.desc".to_string()),
                ("limit", limit.to_string()),
            ],
        )
        .await
    }
}

/// Render a PostgREST id column (number or string) as a trip id.
fn trip_id_from_value(value: serde_json::Value) -> Result<TripId, ProviderError> {
    match value {
        serde_json::Value::String(s) => Ok(TripId(s)),
        serde_json::Value::Number(n) => Ok(TripId(n.to_string())),
        other => Err(ProviderError::InvalidResponse(format!(
            "unexpected trip id: {}",
            other
        ))),
    }
}

impl<C: AsyncHttpClient> TripBackend for RestTripBackend<C> {
    fn fetch_trip_id_for_consignment<'a>(
        &'a self,
        consignment_id: &'a str,
    ) -> BoxFuture<'a, Result<Option<TripId>, ProviderError>> {
        Box::pin(async move {
            let rows: Vec<TripRow> = self
                .select(
                    "trips",
                    &[
                        ("select", "id".to_string()),
                        ("consignment_id", format!("eq.{}", consignment_id)),
                        ("limit", "1".to_string()),
                    ],
                )
                .await?;
            rows.into_iter()
                .next()
                .map(|row| trip_id_from_value(row.id))
                .transpose()
        })
    }

    fn fetch_latest_location<'a>(
        &'a self,
        trip_id: &'a TripId,
    ) -> BoxFuture<'a, Result<Option<LocationSample>, ProviderError>> {
        Box::pin(async move {
            let rows = self.locations(trip_id, 1).await?;
            rows.into_iter().next().map(LocationRow::into_sample).transpose()
        })
    }

    fn fetch_location_history<'a>(
        &'a self,
        trip_id: &'a TripId,
        limit: usize,
    ) -> BoxFuture<'a, Result<Vec<LocationSample>, ProviderError>> {
        Box::pin(async move {
            let rows = self.locations(trip_id, limit).await?;
            let mut samples = Vec::with_capacity(rows.len());
            for row in rows {
                match row.into_sample() {
                    Ok(sample) => samples.push(sample),
                    Err(e) => {
                        tracing::warn!(trip = %trip_id, error = %e, "Skipping invalid location row")
                    }
                }
            }
            Ok(samples)
        })
    }

    fn fetch_deviation_warnings<'a>(
        &'a self,
        trip_id: &'a TripId,
    ) -> BoxFuture<'a, Result<Vec<DeviationWarning>, ProviderError>> {
        Box::pin(async move {
            let rows: Vec<DeviationRow> = self
                .select(
                    "route_deviations",
                    &[
                        (
                            "select",
                            "created_at,distance_from_route,details".to_string(),
                        ),
                        ("trip_id", format!("eq.{}", trip_id)),
                        ("order", "created_at.asc".to_string()),
                    ],
                )
                .await?;
            Ok(rows
                .into_iter()
                .map(|row| DeviationWarning {
                    timestamp: row.created_at,
                    distance_from_route_meters: row.distance_from_route,
                    details: row.details.unwrap_or_default(),
                })
                .collect())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::http::tests::MockAsyncHttpClient;

    const BASE: &str = "https://fleet.example.supabase.co";

    fn backend(body: &str) -> RestTripBackend<MockAsyncHttpClient> {
        RestTripBackend::new(MockAsyncHttpClient::ok(body), BASE, "anon-key")
    }

    #[tokio::test]
    async fn test_trip_id_lookup() {
        let backend = backend(r#"[{"id": 4711}]"#);
        let trip = backend.fetch_trip_id_for_consignment("C-100").await.unwrap();
        assert_eq!(trip, Some(TripId::new("4711")));

        let request = backend.http_client.last_request().unwrap();
        assert!(request.url.starts_with(&format!("{}/rest/v1/trips?", BASE)));
        assert!(request.url.contains("consignment_id=eq.C-100"));
        assert!(request
            .headers
            .contains(&("apikey".to_string(), "anon-key".to_string())));
    }

    #[tokio::test]
    async fn test_trip_id_missing() {
        let backend = backend("[]");
        assert_eq!(
            backend.fetch_trip_id_for_consignment("C-404").await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_latest_location() {
        let backend = backend(
            r#"[{"latitude": 51.5, "longitude": -0.12, "recorded_at": "2026-10-19T08:00:00Z"}]"#,
        );
        let sample = backend
            .fetch_latest_location(&TripId::new("7"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(sample.coordinate, Coordinate::new(51.5, -0.12).unwrap());
        assert!(backend
            .http_client
            .last_request()
            .unwrap()
            .url
            .contains("limit=1"));
    }

    #[tokio::test]
    async fn test_history_skips_invalid_rows() {
        let backend = backend(
            r#"[
                {"latitude": 51.5, "longitude": -0.12, "recorded_at": "2026-10-19T08:00:10Z"},
                {"latitude": 951.5, "longitude": -0.12, "recorded_at": "2026-10-19T08:00:05Z"},
                {"latitude": 51.4, "longitude": -0.11, "recorded_at": "2026-10-19T08:00:00Z"}
            ]"#,
        );
        let samples = backend
            .fetch_location_history(&TripId::new("7"), 200)
            .await
            .unwrap();
        assert_eq!(samples.len(), 2);
    }

    #[tokio::test]
    async fn test_deviation_warnings_keep_order() {
        let backend = backend(
            r#"[
                {"created_at": "2026-10-19T08:00:00Z", "distance_from_route": 120.5, "details": "Left planned route"},
                {"created_at": "2026-10-19T08:05:00Z", "distance_from_route": 340.0, "details": null}
            ]"#,
        );
        let warnings = backend
            .fetch_deviation_warnings(&TripId::new("7"))
            .await
            .unwrap();
        assert_eq!(warnings.len(), 2);
        assert_eq!(warnings[0].distance_from_route_meters, 120.5);
        assert_eq!(warnings[1].details, "");
    }
}
