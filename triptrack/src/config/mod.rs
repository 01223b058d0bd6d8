//! Configuration for the tracking engine.
//!
//! Settings live in an INI file (default `~/.triptrack/config.ini`) with two
//! sections:
//!
//! ```ini
//! [tracking]
//! poll_interval_secs = 10
//! history_limit = 200
//! history_cap = 200
//! padding_factor = 0.35
//! single_point_radius_m = 2000
//! want_alternates = true
//!
//! [providers]
//! geocoder_url = https://nominatim.openstreetmap.org
//! geocoder_api_key =
//! directions_url = https://router.project-osrm.org
//! backend_url = https://fleet.example.supabase.co
//! backend_api_key = ...
//! http_timeout_secs = 15
//! ```
//!
//! Missing keys fall back to defaults; malformed values are errors.

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use ini::Ini;
use thiserror::Error;

use crate::camera::{FitOptions, DEFAULT_PADDING_FACTOR, DEFAULT_SINGLE_POINT_RADIUS_METERS};
use crate::history::DEFAULT_HISTORY_CAP;
use crate::poller::{PollerConfig, DEFAULT_HISTORY_LIMIT, DEFAULT_POLL_INTERVAL};
use crate::provider::{DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_NOMINATIM_URL, DEFAULT_OSRM_URL};

/// Directory under the home directory holding TripTrack files.
pub const CONFIG_DIR_NAME: &str = ".triptrack";

/// Config file name inside [`CONFIG_DIR_NAME`].
pub const CONFIG_FILE_NAME: &str = "config.ini";

const SECTION_TRACKING: &str = "tracking";
const SECTION_PROVIDERS: &str = "providers";

/// Errors loading or saving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(String),

    #[error("Invalid value for [{section}] {key}: {value:?}")]
    InvalidValue {
        section: &'static str,
        key: &'static str,
        value: String,
    },

    #[error("Missing required setting [{section}] {key}")]
    Missing {
        section: &'static str,
        key: &'static str,
    },

    #[error("Could not determine home directory")]
    NoHomeDir,
}

impl From<ini::Error> for ConfigError {
    fn from(e: ini::Error) -> Self {
        match e {
            ini::Error::Io(io) => ConfigError::Io(io),
            ini::Error::Parse(parse) => parse.into(),
        }
    }
}

impl From<ini::ParseError> for ConfigError {
    fn from(e: ini::ParseError) -> Self {
        ConfigError::Parse(e.to_string())
    }
}

/// Engine tunables for one tracking session.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackingConfig {
    /// Time between poll ticks.
    pub poll_interval: Duration,
    /// History samples requested per tick.
    pub history_limit: usize,
    /// Maximum samples kept in the path history.
    pub history_cap: usize,
    /// Camera padding on each side, as a fraction of the span.
    pub padding_factor: f64,
    /// Half-extent of the region framing a single point.
    pub single_point_radius_meters: f64,
    /// Ask the directions provider for alternate routes.
    pub want_alternates: bool,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            history_limit: DEFAULT_HISTORY_LIMIT,
            history_cap: DEFAULT_HISTORY_CAP,
            padding_factor: DEFAULT_PADDING_FACTOR,
            single_point_radius_meters: DEFAULT_SINGLE_POINT_RADIUS_METERS,
            want_alternates: true,
        }
    }
}

impl TrackingConfig {
    pub fn poller_config(&self) -> PollerConfig {
        PollerConfig {
            interval: self.poll_interval,
            history_limit: self.history_limit,
        }
    }

    pub fn fit_options(&self) -> FitOptions {
        FitOptions {
            padding_factor: self.padding_factor,
            single_point_radius_meters: self.single_point_radius_meters,
        }
    }
}

/// Endpoints and credentials for external collaborators.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderSettings {
    pub geocoder_url: String,
    pub geocoder_api_key: Option<String>,
    pub directions_url: String,
    pub backend_url: Option<String>,
    pub backend_api_key: Option<String>,
    pub http_timeout_secs: u64,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            geocoder_url: DEFAULT_NOMINATIM_URL.to_string(),
            geocoder_api_key: None,
            directions_url: DEFAULT_OSRM_URL.to_string(),
            backend_url: None,
            backend_api_key: None,
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
        }
    }
}

impl ProviderSettings {
    /// Backend URL and key, both of which are needed to track trips.
    pub fn backend(&self) -> Result<(&str, &str), ConfigError> {
        let url = self.backend_url.as_deref().ok_or(ConfigError::Missing {
            section: SECTION_PROVIDERS,
            key: "backend_url",
        })?;
        let key = self.backend_api_key.as_deref().ok_or(ConfigError::Missing {
            section: SECTION_PROVIDERS,
            key: "backend_api_key",
        })?;
        Ok((url, key))
    }
}

/// Complete configuration file contents.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigFile {
    pub tracking: TrackingConfig,
    pub providers: ProviderSettings,
}

impl ConfigFile {
    /// Default config file location.
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
        Ok(home.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Load from `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_file(path)?;
        Self::from_ini(&ini)
    }

    /// Load from `path` if it exists, otherwise return defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            Ok(Self::default())
        }
    }

    /// Parse INI text.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_str(text)?;
        Self::from_ini(&ini)
    }

    fn from_ini(ini: &Ini) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let tracking = ini.section(Some(SECTION_TRACKING));
        let providers = ini.section(Some(SECTION_PROVIDERS));

        let get_tracking = |key: &str| tracking.and_then(|s| s.get(key));
        let get_provider = |key: &str| {
            providers
                .and_then(|s| s.get(key))
                .map(str::trim)
                .filter(|v| !v.is_empty())
        };

        let poll_interval_secs: f64 = parse_or(
            SECTION_TRACKING,
            "poll_interval_secs",
            get_tracking("poll_interval_secs"),
            defaults.tracking.poll_interval.as_secs_f64(),
        )?;
        // Rejects negatives, NaN, overflow, and values that round to zero
        let poll_interval = Duration::try_from_secs_f64(poll_interval_secs)
            .ok()
            .filter(|d| !d.is_zero())
            .ok_or_else(|| ConfigError::InvalidValue {
                section: SECTION_TRACKING,
                key: "poll_interval_secs",
                value: poll_interval_secs.to_string(),
            })?;

        let padding_factor: f64 = parse_or(
            SECTION_TRACKING,
            "padding_factor",
            get_tracking("padding_factor"),
            defaults.tracking.padding_factor,
        )?;
        if !(padding_factor.is_finite() && padding_factor >= 0.0) {
            return Err(ConfigError::InvalidValue {
                section: SECTION_TRACKING,
                key: "padding_factor",
                value: padding_factor.to_string(),
            });
        }

        let tracking = TrackingConfig {
            poll_interval,
            history_limit: parse_or(
                SECTION_TRACKING,
                "history_limit",
                get_tracking("history_limit"),
                defaults.tracking.history_limit,
            )?,
            history_cap: parse_or(
                SECTION_TRACKING,
                "history_cap",
                get_tracking("history_cap"),
                defaults.tracking.history_cap,
            )?,
            padding_factor,
            single_point_radius_meters: parse_or(
                SECTION_TRACKING,
                "single_point_radius_m",
                get_tracking("single_point_radius_m"),
                defaults.tracking.single_point_radius_meters,
            )?,
            want_alternates: parse_or(
                SECTION_TRACKING,
                "want_alternates",
                get_tracking("want_alternates"),
                defaults.tracking.want_alternates,
            )?,
        };

        let providers = ProviderSettings {
            geocoder_url: get_provider("geocoder_url")
                .map(String::from)
                .unwrap_or(defaults.providers.geocoder_url),
            geocoder_api_key: get_provider("geocoder_api_key").map(String::from),
            directions_url: get_provider("directions_url")
                .map(String::from)
                .unwrap_or(defaults.providers.directions_url),
            backend_url: get_provider("backend_url").map(String::from),
            backend_api_key: get_provider("backend_api_key").map(String::from),
            http_timeout_secs: parse_or(
                SECTION_PROVIDERS,
                "http_timeout_secs",
                get_provider("http_timeout_secs"),
                defaults.providers.http_timeout_secs,
            )?,
        };

        Ok(Self {
            tracking,
            providers,
        })
    }

    /// Render as INI text.
    pub fn to_ini_string(&self) -> Result<String, ConfigError> {
        let mut ini = Ini::new();
        let t = &self.tracking;
        ini.with_section(Some(SECTION_TRACKING))
            .set(
                "poll_interval_secs",
                t.poll_interval.as_secs_f64().to_string(),
            )
            .set("history_limit", t.history_limit.to_string())
            .set("history_cap", t.history_cap.to_string())
            .set("padding_factor", t.padding_factor.to_string())
            .set(
                "single_point_radius_m",
                t.single_point_radius_meters.to_string(),
            )
            .set("want_alternates", t.want_alternates.to_string());

        let p = &self.providers;
        ini.with_section(Some(SECTION_PROVIDERS))
            .set("geocoder_url", p.geocoder_url.as_str())
            .set(
                "geocoder_api_key",
                p.geocoder_api_key.clone().unwrap_or_default(),
            )
            .set("directions_url", p.directions_url.as_str())
            .set("backend_url", p.backend_url.clone().unwrap_or_default())
            .set(
                "backend_api_key",
                p.backend_api_key.clone().unwrap_or_default(),
            )
            .set("http_timeout_secs", p.http_timeout_secs.to_string());

        let mut out = Vec::new();
        ini.write_to(&mut out)?;
        String::from_utf8(out).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Write to `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_ini_string()?)?;
        Ok(())
    }
}

fn parse_or<T: FromStr>(
    section: &'static str,
    key: &'static str,
    raw: Option<&str>,
    default: T,
) -> Result<T, ConfigError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(default),
        Some(value) => value.parse().map_err(|_| ConfigError::InvalidValue {
            section,
            key,
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ConfigFile::default();
        assert_eq!(config.tracking.poll_interval, Duration::from_secs(10));
        assert_eq!(config.tracking.history_cap, 200);
        assert_eq!(config.tracking.padding_factor, 0.35);
        assert_eq!(config.providers.geocoder_url, DEFAULT_NOMINATIM_URL);
        assert!(config.providers.backend_url.is_none());
    }

    #[test]
    fn test_parse_partial_file_keeps_defaults() {
        let config = ConfigFile::parse(
            "[tracking]\npoll_interval_secs = 5\n\n[providers]\nbackend_url = https://fleet.example.co\n",
        )
        .unwrap();

        assert_eq!(config.tracking.poll_interval, Duration::from_secs(5));
        assert_eq!(config.tracking.history_limit, DEFAULT_HISTORY_LIMIT);
        assert_eq!(
            config.providers.backend_url.as_deref(),
            Some("https://fleet.example.co")
        );
        assert_eq!(config.providers.directions_url, DEFAULT_OSRM_URL);
    }

    #[test]
    fn test_parse_rejects_bad_values() {
        let err = ConfigFile::parse("[tracking]\nhistory_cap = lots\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                key: "history_cap",
                ..
            }
        ));

        let err = ConfigFile::parse("[tracking]\npoll_interval_secs = 0\n").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                key: "poll_interval_secs",
                ..
            }
        ));

        let err = ConfigFile::parse("[tracking]\npadding_factor = -1\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_parse_rejects_unrepresentable_poll_interval() {
        for value in ["1e30", "1e-12", "-5", "NaN"] {
            let text = format!("[tracking]\npoll_interval_secs = {}\n", value);
            let err = ConfigFile::parse(&text).unwrap_err();
            assert!(
                matches!(
                    err,
                    ConfigError::InvalidValue {
                        key: "poll_interval_secs",
                        ..
                    }
                ),
                "{} should be rejected, got {:?}",
                value,
                err
            );
        }

        let config = ConfigFile::parse("[tracking]\npoll_interval_secs = 0.25\n").unwrap();
        assert_eq!(config.tracking.poll_interval, Duration::from_millis(250));
    }

    #[test]
    fn test_parse_malformed_ini_is_parse_error() {
        let err = ConfigFile::parse("[tracking\npoll_interval_secs = 5\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)), "got {:?}", err);
    }

    #[test]
    fn test_empty_api_key_is_none() {
        let config = ConfigFile::parse("[providers]\ngeocoder_api_key =\n").unwrap();
        assert!(config.providers.geocoder_api_key.is_none());
    }

    #[test]
    fn test_backend_requires_url_and_key() {
        let mut providers = ProviderSettings::default();
        assert!(matches!(
            providers.backend(),
            Err(ConfigError::Missing {
                key: "backend_url",
                ..
            })
        ));

        providers.backend_url = Some("https://fleet.example.co".into());
        providers.backend_api_key = Some("anon".into());
        assert_eq!(
            providers.backend().unwrap(),
            ("https://fleet.example.co", "anon")
        );
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE_NAME);

        let mut config = ConfigFile::default();
        config.tracking.poll_interval = Duration::from_millis(2500);
        config.tracking.want_alternates = false;
        config.providers.backend_api_key = Some("anon".into());
        config.save(&path).unwrap();

        assert_eq!(ConfigFile::load(&path).unwrap(), config);
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = ConfigFile::load_or_default(&dir.path().join("absent.ini")).unwrap();
        assert_eq!(config, ConfigFile::default());
    }

    #[test]
    fn test_conversions() {
        let tracking = TrackingConfig::default();
        assert_eq!(tracking.poller_config().interval, DEFAULT_POLL_INTERVAL);
        assert_eq!(tracking.fit_options(), FitOptions::default());
    }
}
