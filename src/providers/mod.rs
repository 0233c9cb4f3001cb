//! Third-party IP reputation providers.
//!
//! Each provider wraps one HTTP API behind [`ReputationProvider`] and owns
//! a [`RateLimiter`] sized to the API's free quota. A denied limiter, a
//! transport failure or an unreadable payload all end in a
//! [`ProviderError`], which the checker drops from the quorum.
//!
//! | Provider   | Transport                         | VPN when                          |
//! |------------|-----------------------------------|-----------------------------------|
//! | IPHub      | `X-Key` header                    | `block == 1`                      |
//! | VPNAPI     | `?key=` query                     | any `security` flag set           |
//! | ProxyCheck | `?key=` query                     | `status == "ok"`, `proxy == "yes"`|
//! | GetIPIntel | `?contact=` query                 | probability at/above threshold    |
//! | IP Teoh    | keyless                           | hosting or `vpn_or_proxy == "yes"`|

use crate::config::ProvidersConfig;
use crate::error::ProviderError;
use crate::security::RateLimiter;
use async_trait::async_trait;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub mod getipintel;
pub mod iphub;
pub mod ipteoh;
pub mod proxycheck;
pub mod vpnapi;

pub use getipintel::GetIpIntel;
pub use iphub::IpHub;
pub use ipteoh::IpTeoh;
pub use proxycheck::ProxyCheck;
pub use vpnapi::VpnApi;

/// One reputation lookup backend.
#[async_trait]
pub trait ReputationProvider: Send + Sync {
    /// Short stable name used in logs and metric labels.
    fn name(&self) -> &str;

    /// Ask the provider about `ip`. Exactly one HTTP request, no retries.
    async fn is_vpn(&self, ip: Ipv4Addr) -> Result<bool, ProviderError>;
}

/// Shared HTTP client for all providers.
pub fn http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("vpnsentry/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

/// Instantiate every provider that has credentials configured.
pub fn build_providers(
    config: &ProvidersConfig,
    client: &reqwest::Client,
) -> Vec<Arc<dyn ReputationProvider>> {
    let mut providers: Vec<Arc<dyn ReputationProvider>> = Vec::new();

    if config.iphub.enabled() {
        providers.push(Arc::new(IpHub::new(
            client.clone(),
            config.iphub.key(),
            config.iphub.url_or(iphub::DEFAULT_URL),
            RateLimiter::per_day(config.iphub.daily_limit),
        )));
    }
    if config.vpnapi.enabled() {
        providers.push(Arc::new(VpnApi::new(
            client.clone(),
            config.vpnapi.key(),
            config.vpnapi.url_or(vpnapi::DEFAULT_URL),
            RateLimiter::per_day(config.vpnapi.daily_limit),
        )));
    }
    if config.proxycheck.enabled() {
        providers.push(Arc::new(ProxyCheck::new(
            client.clone(),
            config.proxycheck.key(),
            config.proxycheck.url_or(proxycheck::DEFAULT_URL),
            RateLimiter::per_day(config.proxycheck.daily_limit),
        )));
    }
    if let Some(contact) = config.getipintel.contact.as_deref()
        && config.getipintel.enabled()
    {
        providers.push(Arc::new(GetIpIntel::new(
            client.clone(),
            contact,
            config.getipintel.threshold,
            config.getipintel.base_url.clone(),
            RateLimiter::per_day(config.getipintel.daily_limit),
        )));
    }
    if config.ipteoh.enabled {
        providers.push(Arc::new(IpTeoh::new(
            client.clone(),
            config.ipteoh.base_url.clone(),
            RateLimiter::per_day(config.ipteoh.daily_limit),
        )));
    }

    info!(
        providers = ?providers.iter().map(|p| p.name().to_string()).collect::<Vec<_>>(),
        "reputation providers initialized"
    );
    providers
}

/// Send `request` and return the body of a 2xx response.
pub(crate) async fn fetch(request: reqwest::RequestBuilder) -> Result<Vec<u8>, ProviderError> {
    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(ProviderError::Unavailable(format!("http status {}", status)));
    }
    Ok(response.bytes().await?.to_vec())
}
