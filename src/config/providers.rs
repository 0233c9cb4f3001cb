//! Reputation provider configuration.
//!
//! A provider is enabled once its credential is set: `api_key` for the
//! keyed APIs, `contact` for GetIPIntel, `enabled = true` for IP Teoh.

use serde::Deserialize;
use std::time::Duration;

use super::defaults::{
    default_daily_limit, default_getipintel_daily_limit, default_getipintel_threshold,
    default_getipintel_url, default_ipteoh_url, default_request_timeout,
};

#[derive(Debug, Clone, Deserialize)]
pub struct ProvidersConfig {
    /// Per-request HTTP timeout in seconds, shared by all providers.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub iphub: KeyedProviderConfig,
    #[serde(default)]
    pub vpnapi: KeyedProviderConfig,
    #[serde(default)]
    pub proxycheck: KeyedProviderConfig,
    #[serde(default)]
    pub getipintel: GetIpIntelConfig,
    #[serde(default)]
    pub ipteoh: IpTeohConfig,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: default_request_timeout(),
            iphub: KeyedProviderConfig::default(),
            vpnapi: KeyedProviderConfig::default(),
            proxycheck: KeyedProviderConfig::default(),
            getipintel: GetIpIntelConfig::default(),
            ipteoh: IpTeohConfig::default(),
        }
    }
}

impl ProvidersConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Number of providers that will take part in quorum votes.
    pub fn enabled_count(&self) -> usize {
        [
            self.iphub.enabled(),
            self.vpnapi.enabled(),
            self.proxycheck.enabled(),
            self.getipintel.enabled(),
            self.ipteoh.enabled,
        ]
        .into_iter()
        .filter(|on| *on)
        .count()
    }
}

/// Provider authenticated by an API key.
#[derive(Debug, Clone, Deserialize)]
pub struct KeyedProviderConfig {
    pub api_key: Option<String>,
    #[serde(default = "default_daily_limit")]
    pub daily_limit: usize,
    /// Endpoint override; the provider's public API when unset.
    pub base_url: Option<String>,
}

impl Default for KeyedProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            daily_limit: default_daily_limit(),
            base_url: None,
        }
    }
}

impl KeyedProviderConfig {
    pub fn enabled(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }

    /// Configured key, or empty when disabled.
    pub fn key(&self) -> &str {
        self.api_key.as_deref().unwrap_or_default()
    }

    pub fn url_or(&self, default: &str) -> String {
        self.base_url.clone().unwrap_or_else(|| default.to_string())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GetIpIntelConfig {
    /// Contact e-mail required by the service.
    pub contact: Option<String>,
    /// Probability at or above which an address counts as VPN.
    #[serde(default = "default_getipintel_threshold")]
    pub threshold: f64,
    #[serde(default = "default_getipintel_daily_limit")]
    pub daily_limit: usize,
    #[serde(default = "default_getipintel_url")]
    pub base_url: String,
}

impl Default for GetIpIntelConfig {
    fn default() -> Self {
        Self {
            contact: None,
            threshold: default_getipintel_threshold(),
            daily_limit: default_getipintel_daily_limit(),
            base_url: default_getipintel_url(),
        }
    }
}

impl GetIpIntelConfig {
    pub fn enabled(&self) -> bool {
        self.contact.as_deref().is_some_and(|c| c.contains('@'))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct IpTeohConfig {
    /// Keyless API, so it has to be switched on explicitly.
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_daily_limit")]
    pub daily_limit: usize,
    #[serde(default = "default_ipteoh_url")]
    pub base_url: String,
}

impl Default for IpTeohConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            daily_limit: default_daily_limit(),
            base_url: default_ipteoh_url(),
        }
    }
}
