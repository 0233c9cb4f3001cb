//! IPHub (`iphub.info`).
//!
//! `GET /ip/<ip>` with the key in the `X-Key` header. The answer carries a
//! `block` field: 0 residential, 1 hosting/VPN, 2 mixed. Only 1 counts.

use super::{ReputationProvider, fetch};
use crate::error::ProviderError;
use crate::security::RateLimiter;
use async_trait::async_trait;
use serde::Deserialize;
use std::net::Ipv4Addr;

pub const DEFAULT_URL: &str = "http://v2.api.iphub.info";

#[derive(Debug, Deserialize)]
struct IpHubResponse {
    block: i64,
}

pub struct IpHub {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    limiter: RateLimiter,
}

impl IpHub {
    pub fn new(
        client: reqwest::Client,
        api_key: &str,
        base_url: String,
        limiter: RateLimiter,
    ) -> Self {
        Self {
            client,
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            limiter,
        }
    }
}

pub(crate) fn parse(body: &[u8]) -> Result<bool, ProviderError> {
    let data: IpHubResponse = serde_json::from_slice(body)?;
    Ok(data.block == 1)
}

#[async_trait]
impl ReputationProvider for IpHub {
    fn name(&self) -> &str {
        "iphub"
    }

    async fn is_vpn(&self, ip: Ipv4Addr) -> Result<bool, ProviderError> {
        if !self.limiter.allow() {
            return Err(ProviderError::RateLimitExceeded);
        }

        let url = format!("{}/ip/{}", self.base_url, ip);
        let body = fetch(self.client.get(url).header("X-Key", &self.api_key)).await?;
        parse(&body)
    }
}
