//! Public IP discovery through an IP-echo service.

use super::{fetch_body, LookupError};
use crate::core::PublicIpProvider;
use async_trait::async_trait;
use serde::Deserialize;
use std::net::IpAddr;
use tracing::instrument;

const SERVICE: &str = "ip-echo";

/// Parses an IP-echo response of the form `{"ip": "203.0.113.7"}`.
pub fn parse_ip_response(text: &str) -> Result<IpAddr, LookupError> {
    #[derive(Deserialize)]
    struct IpResponse {
        ip: String,
    }

    let response: IpResponse =
        serde_json::from_str(text).map_err(|e| LookupError::parse(SERVICE, e))?;
    response
        .ip
        .trim()
        .parse()
        .map_err(|e| LookupError::parse(SERVICE, format!("{:?} is not an IP address: {}", response.ip, e)))
}

/// Client for an ipify-compatible endpoint.
pub struct IpEchoClient {
    client: reqwest::Client,
    url: String,
}

impl IpEchoClient {
    pub fn new(client: reqwest::Client, url: String) -> Self {
        Self { client, url }
    }
}

#[async_trait]
impl PublicIpProvider for IpEchoClient {
    #[instrument(skip(self), fields(url = %self.url))]
    async fn public_ip(&self) -> Result<IpAddr, LookupError> {
        let body = fetch_body(SERVICE, self.client.get(&self.url)).await?;
        parse_ip_response(&body)
    }
}
