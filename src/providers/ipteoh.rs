//! IP Teoh (`ip.teoh.io`).
//!
//! Keyless `GET /api/vpn/<ip>`. The API reports `is_hosting` as an integer
//! or as a string depending on the deployment, so both are accepted.

use super::{ReputationProvider, fetch};
use crate::error::ProviderError;
use crate::security::RateLimiter;
use async_trait::async_trait;
use serde::Deserialize;
use std::net::Ipv4Addr;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Flag {
    Int(i64),
    Text(String),
}

impl Flag {
    fn is_set(&self) -> bool {
        match self {
            Self::Int(n) => *n == 1,
            Self::Text(s) => s.trim() == "1",
        }
    }
}

#[derive(Debug, Deserialize)]
struct IpTeohResponse {
    is_hosting: Option<Flag>,
    #[serde(default)]
    vpn_or_proxy: String,
}

pub struct IpTeoh {
    client: reqwest::Client,
    base_url: String,
    limiter: RateLimiter,
}

impl IpTeoh {
    pub fn new(client: reqwest::Client, base_url: String, limiter: RateLimiter) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            limiter,
        }
    }
}

pub(crate) fn parse(body: &[u8]) -> Result<bool, ProviderError> {
    let data: IpTeohResponse = serde_json::from_slice(body)?;
    let hosting = data.is_hosting.as_ref().is_some_and(Flag::is_set);
    Ok(hosting || data.vpn_or_proxy == "yes")
}

#[async_trait]
impl ReputationProvider for IpTeoh {
    fn name(&self) -> &str {
        "ipteoh"
    }

    async fn is_vpn(&self, ip: Ipv4Addr) -> Result<bool, ProviderError> {
        if !self.limiter.allow() {
            return Err(ProviderError::RateLimitExceeded);
        }

        let url = format!("{}/api/vpn/{}", self.base_url, ip);
        parse(&fetch(self.client.get(url)).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hosting_as_int_or_string() {
        assert!(parse(br#"{"ip":"1.2.3.4","is_hosting":1,"vpn_or_proxy":"no"}"#).unwrap());
        assert!(parse(br#"{"ip":"1.2.3.4","is_hosting":"1","vpn_or_proxy":"no"}"#).unwrap());
        assert!(!parse(br#"{"ip":"1.2.3.4","is_hosting":0,"vpn_or_proxy":"no"}"#).unwrap());
    }

    #[test]
    fn test_vpn_or_proxy_flag() {
        assert!(parse(br#"{"ip":"1.2.3.4","is_hosting":"0","vpn_or_proxy":"yes"}"#).unwrap());
    }

    #[test]
    fn test_not_json_is_unavailable() {
        assert!(matches!(
            parse(b"<html>502 Bad Gateway</html>"),
            Err(ProviderError::Unavailable(_))
        ));
    }
}
