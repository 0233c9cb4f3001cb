//! ProxyCheck (`proxycheck.io`).
//!
//! `GET /v2/<ip>?vpn=1&asn=1&key=...`. The body is an object with a
//! top-level `status` and one entry keyed by the queried address:
//!
//! ```json
//! { "status": "ok", "1.2.3.4": { "proxy": "yes", "type": "VPN" } }
//! ```
//!
//! Any status other than `ok` comes with a `message` and is an error.

use super::{ReputationProvider, fetch};
use crate::error::ProviderError;
use crate::security::RateLimiter;
use async_trait::async_trait;
use std::net::Ipv4Addr;

pub const DEFAULT_URL: &str = "https://proxycheck.io";

pub struct ProxyCheck {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    limiter: RateLimiter,
}

impl ProxyCheck {
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

pub(crate) fn parse(body: &[u8], ip: Ipv4Addr) -> Result<bool, ProviderError> {
    let json: serde_json::Value = serde_json::from_slice(body)?;

    let status = json.get("status").and_then(|v| v.as_str()).unwrap_or_default();
    if status != "ok" {
        let message = json
            .get("message")
            .and_then(|v| v.as_str())
            .unwrap_or("no message");
        return Err(ProviderError::Unavailable(format!("{}: {}", status, message)));
    }

    let proxy = json
        .get(ip.to_string())
        .and_then(|entry| entry.get("proxy"))
        .and_then(|v| v.as_str())
        .ok_or_else(|| ProviderError::Unavailable("missing proxy field".to_string()))?;
    Ok(proxy == "yes")
}

#[async_trait]
impl ReputationProvider for ProxyCheck {
    fn name(&self) -> &str {
        "proxycheck"
    }

    async fn is_vpn(&self, ip: Ipv4Addr) -> Result<bool, ProviderError> {
        if !self.limiter.allow() {
            return Err(ProviderError::RateLimitExceeded);
        }

        let url = format!("{}/v2/{}", self.base_url, ip);
        let request = self.client.get(url).query(&[
            ("vpn", "1"),
            ("asn", "1"),
            ("key", self.api_key.as_str()),
        ]);
        parse(&fetch(request).await?, ip)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IP: Ipv4Addr = Ipv4Addr::new(37, 60, 48, 2);

    #[test]
    fn test_proxy_yes_and_no() {
        let yes = br#"{"status":"ok","37.60.48.2":{"asn":"AS1","proxy":"yes","type":"VPN"}}"#;
        let no = br#"{"status":"ok","37.60.48.2":{"asn":"AS1","proxy":"no","type":"Residential"}}"#;
        assert!(parse(yes, IP).unwrap());
        assert!(!parse(no, IP).unwrap());
    }

    #[test]
    fn test_status_other_than_ok_carries_message() {
        let body = br#"{"status":"denied","message":"1000 free queries exhausted"}"#;
        match parse(body, IP) {
            Err(ProviderError::Unavailable(msg)) => assert!(msg.contains("exhausted")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_warning_status_is_not_ok() {
        let body = br#"{"status":"warning","message":"key close to limit","37.60.48.2":{"proxy":"yes"}}"#;
        assert!(parse(body, IP).is_err());
    }

    #[test]
    fn test_entry_for_other_address_is_unavailable() {
        let body = br#"{"status":"ok","1.1.1.1":{"proxy":"yes"}}"#;
        assert!(matches!(parse(body, IP), Err(ProviderError::Unavailable(_))));
    }
}
