//! Reverse geocoding through a Nominatim-compatible service.

use super::{fetch_body, LookupError};
use crate::core::{GeoCoordinates, ReverseGeocoder};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::instrument;

const SERVICE: &str = "reverse-geocode";

/// Extracts `display_name` from a reverse-geocoding response.
pub fn parse_address(text: &str) -> Result<String, LookupError> {
    #[derive(Deserialize)]
    struct ReverseResponse {
        display_name: Option<String>,
        error: Option<String>,
    }

    let response: ReverseResponse =
        serde_json::from_str(text).map_err(|e| LookupError::parse(SERVICE, e))?;
    match (response.display_name, response.error) {
        (Some(name), _) => Ok(name),
        (None, Some(error)) => Err(LookupError::parse(SERVICE, error)),
        (None, None) => Err(LookupError::parse(SERVICE, "missing display_name")),
    }
}

pub struct NominatimGeocoder {
    client: reqwest::Client,
    url: String,
}

impl NominatimGeocoder {
    pub fn new(client: reqwest::Client, url: String) -> Self {
        Self { client, url }
    }
}

#[async_trait]
impl ReverseGeocoder for NominatimGeocoder {
    #[instrument(skip(self))]
    async fn reverse(&self, coordinates: GeoCoordinates) -> Result<String, LookupError> {
        let request = self.client.get(&self.url).query(&[
            ("format", "jsonv2".to_string()),
            ("lat", coordinates.latitude.to_string()),
            ("lon", coordinates.longitude.to_string()),
        ]);
        let body = fetch_body(SERVICE, request).await?;
        parse_address(&body)
    }
}
