//! Pre-flight check for the weather credential.

use crate::config::Config;
use crate::core::WeatherProvider;
use crate::lookup::{DisabledWeatherProvider, OpenWeatherClient};
use std::sync::Arc;
use tracing::{info, warn};

/// Chooses the weather provider from configuration.
///
/// A missing or blank API key is reported here, once, and yields a provider
/// that refuses every request with `LookupError::NotConfigured`.
pub fn startup_check(config: &Config, client: reqwest::Client) -> Arc<dyn WeatherProvider> {
    match config.weather.api_key() {
        Some(key) => {
            info!(
                "Weather lookups enabled ({} conversion).",
                config.weather.conversion
            );
            Arc::new(OpenWeatherClient::new(
                client,
                config.endpoints.weather_url.clone(),
                key.to_string(),
                config.weather.conversion,
            ))
        }
        None => {
            warn!("No weather API key configured; weather lookups are disabled. Set OPENWEATHER_API_KEY or weather.api_key.");
            Arc::new(DisabledWeatherProvider)
        }
    }
}
