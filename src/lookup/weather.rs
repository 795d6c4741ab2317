//! Current weather from an OpenWeatherMap One Call compatible endpoint.

use super::{fetch_body, LookupError};
use crate::core::{GeoCoordinates, WeatherProvider, WeatherSnapshot};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::instrument;

const SERVICE: &str = "weather";

/// How source temperatures (Kelvin) are shifted before the Fahrenheit scale is applied.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureConversion {
    /// Kelvin offset of 273.15.
    #[default]
    Corrected,
    /// Kelvin offset of 273, matching the figures older deployments displayed.
    Legacy,
}

impl TemperatureConversion {
    fn kelvin_offset(self) -> f64 {
        match self {
            TemperatureConversion::Corrected => 273.15,
            TemperatureConversion::Legacy => 273.0,
        }
    }
}

impl fmt::Display for TemperatureConversion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemperatureConversion::Corrected => write!(f, "corrected"),
            TemperatureConversion::Legacy => write!(f, "legacy"),
        }
    }
}

/// Converts a Kelvin reading to whole degrees Fahrenheit, rounding down.
pub fn display_temperature(kelvin: f64, conversion: TemperatureConversion) -> i64 {
    ((kelvin - conversion.kelvin_offset()) * 9.0 / 5.0 + 32.0).floor() as i64
}

/// Parses a One Call response into a [`WeatherSnapshot`] for `coordinates`.
pub fn parse_weather(
    text: &str,
    coordinates: GeoCoordinates,
    conversion: TemperatureConversion,
) -> Result<WeatherSnapshot, LookupError> {
    #[derive(Deserialize)]
    struct OneCallResponse {
        #[serde(default)]
        timezone: String,
        current: Current,
    }

    #[derive(Deserialize)]
    struct Current {
        temp: f64,
        feels_like: f64,
        weather: Vec<Condition>,
    }

    #[derive(Deserialize)]
    struct Condition {
        icon: String,
        description: String,
        main: String,
    }

    let response: OneCallResponse =
        serde_json::from_str(text).map_err(|e| LookupError::parse(SERVICE, e))?;
    let condition = response
        .current
        .weather
        .into_iter()
        .next()
        .ok_or_else(|| LookupError::parse(SERVICE, "current.weather is empty"))?;

    Ok(WeatherSnapshot {
        timezone_name: response.timezone,
        temperature_f: display_temperature(response.current.temp, conversion),
        feels_like_f: display_temperature(response.current.feels_like, conversion),
        icon_url: WeatherSnapshot::icon_url_for(&condition.icon),
        icon_code: condition.icon,
        description: condition.description,
        main_category: condition.main,
        coordinates_label: coordinates.to_string(),
    })
}

pub struct OpenWeatherClient {
    client: reqwest::Client,
    url: String,
    api_key: String,
    conversion: TemperatureConversion,
}

impl OpenWeatherClient {
    pub fn new(
        client: reqwest::Client,
        url: String,
        api_key: String,
        conversion: TemperatureConversion,
    ) -> Self {
        Self {
            client,
            url,
            api_key,
            conversion,
        }
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherClient {
    #[instrument(skip(self))]
    async fn current(&self, coordinates: GeoCoordinates) -> Result<WeatherSnapshot, LookupError> {
        let request = self.client.get(&self.url).query(&[
            ("lat", coordinates.latitude.to_string()),
            ("lon", coordinates.longitude.to_string()),
            ("appid", self.api_key.clone()),
        ]);
        let body = fetch_body(SERVICE, request).await?;
        parse_weather(&body, coordinates, self.conversion)
    }
}
