//! Configuration management for geotrail.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::location::{gpsd, Accuracy, LocationRequest};
use crate::record::validate_coordinates;
use crate::store::shared::{DEFAULT_DISPLAY_NAME, DEFAULT_MIME_TYPE};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "geotrail";

/// Default private record file name.
const PRIVATE_FILE_NAME: &str = "locations.json";

/// Default upload endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://rocky-bayou-84476-79654ba4af58.herokuapp.com/locations";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `GEOTRAIL_`, `__` between section and key)
/// 2. TOML config file at `~/.config/geotrail/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Storage configuration.
    pub storage: StorageConfig,
    /// Location provider configuration.
    pub location: LocationConfig,
    /// Upload configuration.
    pub upload: UploadConfig,
}

/// Storage-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the private record file.
    /// Defaults to `~/.local/share/geotrail/locations.json`
    pub private_path: Option<PathBuf>,
    /// Mirror records to the shared export.
    pub export_enabled: bool,
    /// Directory holding the shared export.
    /// Defaults to the platform documents directory.
    pub shared_dir: Option<PathBuf>,
    /// Display name of the shared export.
    pub display_name: String,
    /// MIME type advertised for the shared export.
    pub mime_type: String,
}

/// Which location provider to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    /// A gpsd daemon.
    #[default]
    Gpsd,
    /// The configured fixed coordinate.
    Fixed,
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Gpsd => write!(f, "gpsd"),
            Self::Fixed => write!(f, "fixed"),
        }
    }
}

/// Location-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationConfig {
    /// Provider to query.
    pub provider: ProviderKind,
    /// gpsd host.
    pub gpsd_host: String,
    /// gpsd port.
    pub gpsd_port: u16,
    /// Latitude reported by the fixed provider.
    pub fixed_latitude: f64,
    /// Longitude reported by the fixed provider.
    pub fixed_longitude: f64,
    /// Accuracy tier required of a fix.
    pub desired_accuracy: Accuracy,
    /// Minimum update distance in meters.
    pub update_distance_m: f64,
    /// Oldest acceptable cached fix, in milliseconds.
    pub maximum_age_ms: u64,
    /// Time allowed for a position request, in milliseconds.
    pub timeout_ms: u64,
}

/// Upload-related configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// URL records are POSTed to.
    pub endpoint: String,
    /// HTTP request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            private_path: None, // Will be resolved to default at runtime
            export_enabled: true,
            shared_dir: None,
            display_name: DEFAULT_DISPLAY_NAME.to_string(),
            mime_type: DEFAULT_MIME_TYPE.to_string(),
        }
    }
}

impl Default for LocationConfig {
    fn default() -> Self {
        let request = LocationRequest::default();
        Self {
            provider: ProviderKind::Gpsd,
            gpsd_host: "localhost".to_string(),
            gpsd_port: gpsd::DEFAULT_PORT,
            fixed_latitude: 0.0,
            fixed_longitude: 0.0,
            desired_accuracy: request.desired_accuracy,
            update_distance_m: request.update_distance_m,
            maximum_age_ms: 5_000,
            timeout_ms: 20_000,
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout_secs: 30,
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed("GEOTRAIL_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        let invalid = |message: String| Err(Error::ConfigValidation { message });

        if self.storage.display_name.trim().is_empty() {
            return invalid("display_name must not be empty".to_string());
        }
        if self.storage.display_name.contains(['/', '\\']) {
            return invalid(format!(
                "display_name must be a plain file name: {}",
                self.storage.display_name
            ));
        }

        if self.location.timeout_ms == 0 {
            return invalid("timeout_ms must be greater than 0".to_string());
        }
        if !self.location.update_distance_m.is_finite() || self.location.update_distance_m < 0.0 {
            return invalid("update_distance_m must be a non-negative number".to_string());
        }
        if self.location.provider == ProviderKind::Fixed
            && validate_coordinates(self.location.fixed_latitude, self.location.fixed_longitude)
                .is_err()
        {
            return invalid(format!(
                "fixed coordinate out of range: {}, {}",
                self.location.fixed_latitude, self.location.fixed_longitude
            ));
        }

        if self.upload.timeout_secs == 0 {
            return invalid("timeout_secs must be greater than 0".to_string());
        }
        if !(self.upload.endpoint.starts_with("http://")
            || self.upload.endpoint.starts_with("https://"))
        {
            return invalid(format!(
                "endpoint must be an http(s) URL: {}",
                self.upload.endpoint
            ));
        }

        Ok(())
    }

    /// Get the private record file path, resolving defaults if not set.
    #[must_use]
    pub fn private_path(&self) -> PathBuf {
        self.storage
            .private_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(PRIVATE_FILE_NAME))
    }

    /// Get the shared export directory, resolving the platform default if
    /// not set. `None` when the platform has no documents directory.
    #[must_use]
    pub fn shared_dir(&self) -> Option<PathBuf> {
        self.storage
            .shared_dir
            .clone()
            .or_else(crate::platform::shared_documents_dir)
    }

    /// Build the location request from the configured parameters.
    #[must_use]
    pub fn location_request(&self) -> LocationRequest {
        LocationRequest {
            desired_accuracy: self.location.desired_accuracy,
            update_distance_m: self.location.update_distance_m,
            maximum_age: Duration::from_millis(self.location.maximum_age_ms),
            timeout: Duration::from_millis(self.location.timeout_ms),
        }
    }

    /// Get the upload timeout as a Duration.
    #[must_use]
    pub fn upload_timeout(&self) -> Duration {
        Duration::from_secs(self.upload.timeout_secs)
    }
}
