//! Outbound lookups against third-party HTTP services.
//!
//! Each service has a small client implementing one of the lookup traits in
//! [`crate::core`], plus a pure `parse_*` function for its response body.

pub mod geocode;
pub mod health;
pub mod ip_echo;
pub mod weather;

pub use geocode::NominatimGeocoder;
pub use ip_echo::IpEchoClient;
pub use weather::{display_temperature, OpenWeatherClient, TemperatureConversion};

use crate::config::EndpointsConfig;
use crate::core::{GeoCoordinates, WeatherProvider, WeatherSnapshot};
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum LookupError {
    #[error("request to {service} failed: {source}")]
    Request {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{service} responded with HTTP {status}")]
    Status { service: &'static str, status: u16 },

    #[error("malformed {service} response: {reason}")]
    Parse { service: &'static str, reason: String },

    #[error("weather API key is not configured")]
    NotConfigured,
}

impl LookupError {
    pub(crate) fn parse(service: &'static str, reason: impl ToString) -> Self {
        LookupError::Parse {
            service,
            reason: reason.to_string(),
        }
    }
}

/// Builds the HTTP client shared by all lookup services.
pub fn http_client(config: &EndpointsConfig) -> anyhow::Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_millis(config.timeout_ms))
        .user_agent(config.user_agent.clone())
        .build()?;
    Ok(client)
}

/// Sends `request` and returns the body of a successful response.
pub(crate) async fn fetch_body(
    service: &'static str,
    request: reqwest::RequestBuilder,
) -> Result<String, LookupError> {
    let response = request
        .send()
        .await
        .map_err(|source| LookupError::Request { service, source })?;

    let status = response.status();
    if !status.is_success() {
        return Err(LookupError::Status {
            service,
            status: status.as_u16(),
        });
    }

    let body = response
        .text()
        .await
        .map_err(|source| LookupError::Request { service, source })?;
    debug!(service, bytes = body.len(), "Received lookup response");
    Ok(body)
}

/// A `WeatherProvider` installed when no API key is configured.
#[derive(Debug, Clone)]
pub struct DisabledWeatherProvider;

#[async_trait]
impl WeatherProvider for DisabledWeatherProvider {
    async fn current(&self, _coordinates: GeoCoordinates) -> Result<WeatherSnapshot, LookupError> {
        Err(LookupError::NotConfigured)
    }
}
