//! Shared setup for commands that talk to external services.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::runtime::Runtime;
use triptrack::config::ConfigFile;
use triptrack::logging::{init_logging, LoggingGuard};
use triptrack::provider::{
    DirectionsProvider, Geocoder, NominatimGeocoder, OsrmDirections, ReqwestClient,
    RestTripBackend, TripBackend,
};
use triptrack::TrackingSessionController;

use crate::error::CliError;

/// Options shared by every command.
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    pub config_path: Option<PathBuf>,
    pub debug: bool,
    pub log_file: Option<PathBuf>,
}

impl GlobalOptions {
    /// Explicit config path, or the default location.
    pub fn resolve_config_path(&self) -> Result<PathBuf, CliError> {
        match &self.config_path {
            Some(path) => Ok(path.clone()),
            None => Ok(ConfigFile::default_path()?),
        }
    }
}

/// Loaded config, logging and async runtime for one command invocation.
pub struct CliRunner {
    config: ConfigFile,
    config_path: PathBuf,
    runtime: Runtime,
    http: ReqwestClient,
    _logging: LoggingGuard,
}

impl CliRunner {
    pub fn new(options: &GlobalOptions) -> Result<Self, CliError> {
        let logging = init_logging(options.log_file.as_deref(), options.debug)
            .map_err(|e| CliError::Logging(e.to_string()))?;

        let config_path = options.resolve_config_path()?;
        let config = ConfigFile::load_or_default(&config_path)?;

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(|e| CliError::Runtime(e.to_string()))?;

        let http = ReqwestClient::with_timeout(config.providers.http_timeout_secs)?;

        Ok(Self {
            config,
            config_path,
            runtime,
            http,
            _logging: logging,
        })
    }

    pub fn log_startup(&self, command: &str) {
        tracing::info!(
            version = triptrack::VERSION,
            command,
            config = %self.config_path.display(),
            "TripTrack starting"
        );
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    pub fn geocoder(&self) -> Arc<dyn Geocoder> {
        let providers = &self.config.providers;
        let mut geocoder = NominatimGeocoder::new(self.http.clone(), &providers.geocoder_url);
        if let Some(key) = &providers.geocoder_api_key {
            geocoder = geocoder.with_api_key(key);
        }
        Arc::new(geocoder)
    }

    pub fn directions(&self) -> Arc<dyn DirectionsProvider> {
        Arc::new(OsrmDirections::new(
            self.http.clone(),
            &self.config.providers.directions_url,
        ))
    }

    /// Trip backend; requires `backend_url` and `backend_api_key`.
    pub fn backend(&self) -> Result<Arc<dyn TripBackend>, CliError> {
        let (url, key) = self.config.providers.backend()?;
        Ok(Arc::new(RestTripBackend::new(self.http.clone(), url, key)))
    }

    pub fn controller(&self) -> Result<TrackingSessionController, CliError> {
        Ok(TrackingSessionController::new(
            self.geocoder(),
            self.directions(),
            self.backend()?,
            self.config.tracking.clone(),
        ))
    }
}
