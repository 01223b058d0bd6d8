//! CLI error types.

use std::fmt;

use triptrack::config::ConfigError;
use triptrack::geocoding::GeocodeError;
use triptrack::provider::ProviderError;
use triptrack::route::RouteError;

/// Errors that end a CLI command.
#[derive(Debug)]
pub enum CliError {
    /// Configuration could not be loaded, saved or was incomplete.
    Config(String),

    /// Failed to create the Tokio runtime.
    Runtime(String),

    /// Logging could not be initialized.
    Logging(String),

    /// HTTP client setup failed.
    Provider(ProviderError),

    /// Address lookup failed.
    Geocode(GeocodeError),

    /// Route request failed.
    Route(RouteError),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Runtime(msg) => write!(f, "Failed to create Tokio runtime: {}", msg),
            CliError::Logging(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Provider(e) => write!(f, "Provider setup failed: {}", e),
            CliError::Geocode(e) => write!(f, "{}", e),
            CliError::Route(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Provider(e) => Some(e),
            CliError::Geocode(e) => Some(e),
            CliError::Route(e) => Some(e),
            CliError::Config(_) | CliError::Runtime(_) | CliError::Logging(_) => None,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(e: ConfigError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<ProviderError> for CliError {
    fn from(e: ProviderError) -> Self {
        CliError::Provider(e)
    }
}

impl From<GeocodeError> for CliError {
    fn from(e: GeocodeError) -> Self {
        CliError::Geocode(e)
    }
}

impl From<RouteError> for CliError {
    fn from(e: RouteError) -> Self {
        CliError::Route(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_error_display() {
        let err = CliError::Config("backend_url is not set".to_string());
        assert_eq!(
            err.to_string(),
            "Configuration error: backend_url is not set"
        );
    }

    #[test]
    fn test_geocode_error_passes_through() {
        let err: CliError = GeocodeError::NotFound("Nowhere".to_string()).into();
        assert_eq!(err.to_string(), "No location found for \"Nowhere\"");
        assert!(std::error::Error::source(&err).is_some());
    }
}
