use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::error::ExtractorError;

pub const DEFAULT_FORECAST_DAYS: i64 = 10;

/// Credentials for WeatherAPI.com.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Authentication {
    pub api_token: String,
}

/// Where fetch parameters come from: static configuration or an input table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchParameterFrom {
    ConfigParameters,
    InputTable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestType {
    Forecast,
    History,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadType {
    FullLoad,
    IncrementalLoad,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchingSettings {
    pub fetch_parameter_from: FetchParameterFrom,
    pub request_type: RequestType,
    pub location_query: String,
    pub forecast_days: i64,
    pub historical_date: String,
    pub continue_on_failure: bool,
}

impl Default for FetchingSettings {
    fn default() -> Self {
        Self {
            fetch_parameter_from: FetchParameterFrom::ConfigParameters,
            request_type: RequestType::Forecast,
            location_query: "New York".to_string(),
            forecast_days: DEFAULT_FORECAST_DAYS,
            historical_date: "2022-09-09".to_string(),
            continue_on_failure: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DestinationSettings {
    pub load_type: LoadType,
}

impl Default for DestinationSettings {
    fn default() -> Self {
        Self { load_type: LoadType::IncrementalLoad }
    }
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// ```toml
/// [authentication]
/// api_token = "..."
///
/// [fetching_settings]
/// request_type = "forecast"
/// location_query = "London"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub authentication: Authentication,
    pub fetching_settings: FetchingSettings,
    pub destination_settings: DestinationSettings,
}

impl Config {
    /// Parse a TOML document without validating required fields.
    pub fn from_toml(contents: &str) -> Result<Self, ExtractorError> {
        toml::from_str(contents)
            .map_err(|e| ExtractorError::Config(format!("failed to parse configuration: {e}")))
    }

    /// Load and validate a configuration file.
    pub fn load_from(path: &Path) -> Result<Self, ExtractorError> {
        let contents = fs::read_to_string(path).map_err(|e| {
            ExtractorError::Config(format!("failed to read config file {}: {e}", path.display()))
        })?;

        let cfg = Self::from_toml(&contents)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load the config from its default location for editing, or return an
    /// empty default if it doesn't exist yet. Skips validation so `configure`
    /// can run before a token has been stored.
    pub fn load_for_edit() -> Result<Self, ExtractorError> {
        let path = Self::default_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path).map_err(|e| {
            ExtractorError::Config(format!("failed to read config file {}: {e}", path.display()))
        })?;
        Self::from_toml(&contents)
    }

    /// Save config to its default location, creating parent directories as
    /// needed. Returns the path written.
    pub fn save(&self) -> Result<PathBuf, ExtractorError> {
        let path = Self::default_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let toml = toml::to_string_pretty(self).map_err(|e| {
            ExtractorError::Config(format!("failed to serialize configuration: {e}"))
        })?;
        fs::write(&path, toml)?;

        Ok(path)
    }

    /// Platform config file path, e.g. `~/.config/weatherapi-extractor/config.toml`.
    pub fn default_path() -> Result<PathBuf, ExtractorError> {
        let dirs = ProjectDirs::from("dev", "weatherapi-extractor", "weatherapi-extractor")
            .ok_or_else(|| {
                ExtractorError::Config("could not determine platform config directory".to_string())
            })?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    pub fn validate(&self) -> Result<(), ExtractorError> {
        if self.authentication.api_token.trim().is_empty() {
            return Err(ExtractorError::Config(
                "missing required parameter 'authentication.api_token'".to_string(),
            ));
        }
        Ok(())
    }
}
