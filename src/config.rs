//! Configuration management for Transparency
//!
//! This module defines the main `Config` struct and its sub-structs. It uses
//! the `figment` crate to layer defaults, a `transparency.toml` file,
//! environment variables and command-line arguments.

use anyhow::Result;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::cli::Cli;
use crate::lookup::TemperatureConversion;

/// Config file read from the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "transparency.toml";

/// The main configuration struct for the application.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Config {
    /// The logging level for the application.
    pub log_level: String,
    /// How the view is printed.
    pub output: OutputConfig,
    /// Third-party service endpoints.
    pub endpoints: EndpointsConfig,
    /// Weather lookup settings.
    pub weather: WeatherConfig,
    /// Host location capability.
    pub location: LocationConfig,
    /// Host battery probe.
    pub battery: BatteryConfig,
}

/// The format for stdout output.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    PlainText,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Json => write!(f, "JSON"),
            OutputFormat::PlainText => write!(f, "Plain Text"),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct OutputConfig {
    pub format: OutputFormat,
}

/// Endpoints of the IP-echo, reverse-geocoding and weather services.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct EndpointsConfig {
    pub ip_echo_url: String,
    pub reverse_geocode_url: String,
    pub weather_url: String,
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
    /// User-Agent header sent with every lookup. Nominatim rejects anonymous clients.
    pub user_agent: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct WeatherConfig {
    /// OpenWeatherMap API key. Weather lookups are disabled without it.
    pub api_key: Option<String>,
    #[serde(default)]
    pub conversion: TemperatureConversion,
}

/// The host has no location sensor; coordinates come from configuration and
/// `consent` plays the part of the user's permission decision.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LocationConfig {
    pub consent: bool,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct BatteryConfig {
    /// How often the host battery is re-read for level changes.
    pub poll_interval_seconds: u64,
}

impl WeatherConfig {
    /// The API key, unless it is missing or blank.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }
}

impl Config {
    /// Loads the configuration, layering defaults, the config file,
    /// environment variables and command-line arguments.
    pub fn load(cli: &Cli) -> Result<Self> {
        let config_path = match &cli.config {
            Some(path) => {
                if !path.exists() {
                    anyhow::bail!("Config file not found at specified path: {}", path.display());
                }
                path.clone()
            }
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        let config: Config = Self::figment(&config_path).merge(cli.clone()).extract()?;
        Ok(config)
    }

    /// Loads the configuration without command-line overrides.
    pub fn load_from_path(config_path: &Path) -> Result<Self> {
        Ok(Self::figment(config_path).extract()?)
    }

    fn figment(config_path: &Path) -> Figment {
        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(config_path))
            // e.g. TRANSPARENCY_WEATHER__CONVERSION=legacy
            .merge(Env::prefixed("TRANSPARENCY_").split("__"))
            .merge(
                Env::raw()
                    .only(&["OPENWEATHER_API_KEY"])
                    .map(|_| "weather.api_key".into()),
            )
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            output: OutputConfig {
                format: OutputFormat::PlainText,
            },
            endpoints: EndpointsConfig {
                ip_echo_url: "https://api.ipify.org?format=json".to_string(),
                reverse_geocode_url: "https://nominatim.openstreetmap.org/reverse".to_string(),
                weather_url: "https://api.openweathermap.org/data/2.5/onecall".to_string(),
                timeout_ms: 10_000,
                user_agent: format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
            },
            weather: WeatherConfig {
                api_key: None,
                conversion: TemperatureConversion::Corrected,
            },
            location: LocationConfig {
                consent: true,
                latitude: None,
                longitude: None,
            },
            battery: BatteryConfig {
                poll_interval_seconds: 10,
            },
        }
    }
}
