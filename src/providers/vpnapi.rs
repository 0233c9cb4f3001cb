//! VPNAPI (`vpnapi.io`).
//!
//! `GET /api/<ip>?key=...`, answering with a `security` object of boolean
//! flags. Any of vpn, proxy, tor or relay marks the address.

use super::{ReputationProvider, fetch};
use crate::error::ProviderError;
use crate::security::RateLimiter;
use async_trait::async_trait;
use serde::Deserialize;
use std::net::Ipv4Addr;

pub const DEFAULT_URL: &str = "https://vpnapi.io";

#[derive(Debug, Deserialize)]
struct VpnApiResponse {
    security: Security,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Security {
    vpn: bool,
    proxy: bool,
    tor: bool,
    relay: bool,
}

pub struct VpnApi {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    limiter: RateLimiter,
}

impl VpnApi {
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
    let data: VpnApiResponse = serde_json::from_slice(body)?;
    let s = data.security;
    Ok(s.vpn || s.proxy || s.tor || s.relay)
}

#[async_trait]
impl ReputationProvider for VpnApi {
    fn name(&self) -> &str {
        "vpnapi"
    }

    async fn is_vpn(&self, ip: Ipv4Addr) -> Result<bool, ProviderError> {
        if !self.limiter.allow() {
            return Err(ProviderError::RateLimitExceeded);
        }

        let url = format!("{}/api/{}", self.base_url, ip);
        let request = self.client.get(url).query(&[("key", self.api_key.as_str())]);
        parse(&fetch(request).await?)
    }
}
