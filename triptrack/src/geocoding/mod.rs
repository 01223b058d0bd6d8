//! Address resolution.
//!
//! [`GeocodingPipeline`] turns a free-text address into a single coordinate.
//! Each call is one outbound provider request; the pipeline holds no mutable
//! state, so concurrent resolves never interfere.

use std::sync::Arc;

use thiserror::Error;

use crate::coord::Coordinate;
use crate::provider::{Geocoder, ProviderError};

/// Errors from address resolution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeocodeError {
    /// Address was empty or whitespace; no request was made.
    #[error("Address is empty")]
    EmptyAddress,

    /// Provider returned zero results.
    #[error("No location found for \"{0}\"")]
    NotFound(String),

    /// Transport or provider failure.
    #[error("Geocoding provider error: {0}")]
    Provider(#[from] ProviderError),
}

impl GeocodeError {
    /// Whether a caller-initiated retry could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, GeocodeError::Provider(_))
    }
}

/// Resolves addresses through an external geocoder.
#[derive(Clone)]
pub struct GeocodingPipeline {
    geocoder: Arc<dyn Geocoder>,
}

impl GeocodingPipeline {
    pub fn new(geocoder: Arc<dyn Geocoder>) -> Self {
        Self { geocoder }
    }

    /// Resolve one address to its best-matching coordinate.
    pub async fn resolve(&self, address: &str) -> Result<Coordinate, GeocodeError> {
        let address = address.trim();
        if address.is_empty() {
            return Err(GeocodeError::EmptyAddress);
        }

        let results = self.geocoder.geocode(address).await.inspect_err(|e| {
            tracing::warn!(provider = self.geocoder.name(), address, error = %e, "Geocoding failed")
        })?;

        match results.into_iter().next() {
            Some(coord) => {
                tracing::debug!(address, %coord, "Address resolved");
                Ok(coord)
            }
            None => {
                tracing::debug!(address, "Address not found");
                Err(GeocodeError::NotFound(address.to_string()))
            }
        }
    }

    /// Resolve two independent addresses concurrently.
    pub async fn resolve_pair(
        &self,
        first: &str,
        second: &str,
    ) -> (
        Result<Coordinate, GeocodeError>,
        Result<Coordinate, GeocodeError>,
    ) {
        tokio::join!(self.resolve(first), self.resolve(second))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::BoxFuture;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TableGeocoder {
        table: HashMap<String, Result<Vec<Coordinate>, ProviderError>>,
        calls: AtomicUsize,
    }

    impl TableGeocoder {
        fn with(mut self, address: &str, result: Result<Vec<Coordinate>, ProviderError>) -> Self {
            self.table.insert(address.to_string(), result);
            self
        }
    }

    impl Geocoder for TableGeocoder {
        fn name(&self) -> &str {
            "table"
        }

        fn geocode<'a>(
            &'a self,
            address: &'a str,
        ) -> BoxFuture<'a, Result<Vec<Coordinate>, ProviderError>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let result = self.table.get(address).cloned().unwrap_or(Ok(vec![]));
            Box::pin(async move { result })
        }
    }

    fn downing_street() -> Coordinate {
        Coordinate::new(51.5034, -0.1276).unwrap()
    }

    #[tokio::test]
    async fn test_resolve_returns_first_result() {
        let second = Coordinate::new(51.0, 0.0).unwrap();
        let geocoder =
            TableGeocoder::default().with("10 Downing St", Ok(vec![downing_street(), second]));
        let pipeline = GeocodingPipeline::new(Arc::new(geocoder));

        assert_eq!(pipeline.resolve("10 Downing St").await, Ok(downing_street()));
    }

    #[tokio::test]
    async fn test_resolve_trims_input() {
        let geocoder = TableGeocoder::default().with("10 Downing St", Ok(vec![downing_street()]));
        let pipeline = GeocodingPipeline::new(Arc::new(geocoder));

        assert!(pipeline.resolve("  10 Downing St \n").await.is_ok());
    }

    #[tokio::test]
    async fn test_blank_address_rejected_before_call() {
        let geocoder = Arc::new(TableGeocoder::default());
        let pipeline = GeocodingPipeline::new(geocoder.clone());

        assert_eq!(pipeline.resolve("   ").await, Err(GeocodeError::EmptyAddress));
        assert_eq!(pipeline.resolve("").await, Err(GeocodeError::EmptyAddress));
        assert_eq!(geocoder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_not_found_is_distinct_from_error() {
        let geocoder = TableGeocoder::default()
            .with("221B Baker Street", Ok(vec![]))
            .with("offline", Err(ProviderError::HttpError("down".into())));
        let pipeline = GeocodingPipeline::new(Arc::new(geocoder));

        let not_found = pipeline.resolve("221B Baker Street").await.unwrap_err();
        assert!(matches!(not_found, GeocodeError::NotFound(_)));
        assert!(!not_found.is_retryable());

        let failed = pipeline.resolve("offline").await.unwrap_err();
        assert!(matches!(failed, GeocodeError::Provider(_)));
        assert!(failed.is_retryable());
    }

    #[tokio::test]
    async fn test_resolve_pair_independent_outcomes() {
        let geocoder = Arc::new(
            TableGeocoder::default()
                .with("221B Baker Street", Ok(vec![]))
                .with("10 Downing St", Ok(vec![downing_street()])),
        );
        let pipeline = GeocodingPipeline::new(geocoder.clone());

        let (pickup, drop) = pipeline
            .resolve_pair("221B Baker Street", "10 Downing St")
            .await;
        assert!(matches!(pickup, Err(GeocodeError::NotFound(_))));
        assert_eq!(drop, Ok(downing_street()));
        assert_eq!(geocoder.calls.load(Ordering::SeqCst), 2);
    }
}
