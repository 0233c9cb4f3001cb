//! GetIPIntel (`getipintel.net`).
//!
//! `GET /check.php?ip=&contact=&format=json`. A success body carries the
//! VPN probability as a string; the service uses negative results as
//! error codes, which are reported as unavailable rather than clean.

use super::{ReputationProvider, fetch};
use crate::error::ProviderError;
use crate::security::RateLimiter;
use async_trait::async_trait;
use serde::Deserialize;
use std::net::Ipv4Addr;

#[derive(Debug, Deserialize)]
struct GetIpIntelResponse {
    status: String,
    #[serde(default)]
    result: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

pub struct GetIpIntel {
    client: reqwest::Client,
    contact: String,
    threshold: f64,
    base_url: String,
    limiter: RateLimiter,
}

impl GetIpIntel {
    pub fn new(
        client: reqwest::Client,
        contact: &str,
        threshold: f64,
        base_url: String,
        limiter: RateLimiter,
    ) -> Self {
        Self {
            client,
            contact: contact.to_string(),
            threshold,
            base_url: base_url.trim_end_matches('/').to_string(),
            limiter,
        }
    }
}

pub(crate) fn parse(body: &[u8], threshold: f64) -> Result<bool, ProviderError> {
    let data: GetIpIntelResponse = serde_json::from_slice(body)?;

    match data.status.as_str() {
        "success" => {
            let raw = data.result.unwrap_or_default();
            let probability: f64 = raw.trim().parse().map_err(|_| {
                ProviderError::Unavailable(format!("unparseable probability {:?}", raw))
            })?;
            if !(0.0..=1.0).contains(&probability) {
                return Err(ProviderError::Unavailable(format!(
                    "error code {}",
                    probability
                )));
            }
            Ok(probability >= threshold)
        }
        "error" => Err(ProviderError::Unavailable(
            data.message.unwrap_or_else(|| "unspecified error".to_string()),
        )),
        other => Err(ProviderError::Unavailable(format!(
            "unknown status {:?}",
            other
        ))),
    }
}

#[async_trait]
impl ReputationProvider for GetIpIntel {
    fn name(&self) -> &str {
        "getipintel"
    }

    async fn is_vpn(&self, ip: Ipv4Addr) -> Result<bool, ProviderError> {
        if !self.limiter.allow() {
            return Err(ProviderError::RateLimitExceeded);
        }

        let url = format!("{}/check.php", self.base_url);
        let ip = ip.to_string();
        let request = self.client.get(url).query(&[
            ("ip", ip.as_str()),
            ("contact", self.contact.as_str()),
            ("format", "json"),
        ]);
        parse(&fetch(request).await?, self.threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probability_against_threshold() {
        let high = br#"{"status":"success","result":"0.995","queryIP":"1.2.3.4"}"#;
        let low = br#"{"status":"success","result":"0.42","queryIP":"1.2.3.4"}"#;
        assert!(parse(high, 0.99).unwrap());
        assert!(!parse(low, 0.99).unwrap());
        assert!(parse(low, 0.4).unwrap());
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let body = br#"{"status":"success","result":"0.99"}"#;
        assert!(parse(body, 0.99).unwrap());
    }

    #[test]
    fn test_negative_result_is_error_code() {
        let body = br#"{"status":"success","result":"-3"}"#;
        assert!(matches!(parse(body, 0.5), Err(ProviderError::Unavailable(_))));
    }

    #[test]
    fn test_error_status_carries_message() {
        let body = br#"{"status":"error","result":"-5","message":"Your connecting IP has been banned"}"#;
        match parse(body, 0.99) {
            Err(ProviderError::Unavailable(msg)) => assert!(msg.contains("banned")),
            other => panic!("unexpected {:?}", other),
        }
    }
}
