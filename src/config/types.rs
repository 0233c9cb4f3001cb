//! Core configuration types.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use super::defaults::{
    default_ban_duration, default_ban_reason, default_ban_threshold, default_connect_timeout,
    default_lookup_timeout, default_range_db, default_reconnect_delay, default_reconnect_timeout,
    default_whitelist_db, default_whitelist_ttl,
};
use super::providers::ProvidersConfig;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

impl ConfigError {
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Io(_) => "config_io",
            Self::Parse(_) => "config_parse",
        }
    }
}

/// Daemon configuration.
///
/// Every section is optional; an empty file yields an offline-capable
/// checker with no servers and no providers.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub checker: CheckerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub ban: BanConfig,
    /// Econ consoles to supervise.
    #[serde(default)]
    pub servers: Vec<ServerEntry>,
    #[serde(default)]
    pub reconnect: ReconnectConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

/// Verdict engine settings.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckerConfig {
    /// Trust the range cache exclusively; never call providers.
    #[serde(default)]
    pub offline: bool,
    /// Fraction of valid provider votes needed for a VPN verdict.
    #[serde(default = "default_ban_threshold")]
    pub ban_threshold: f64,
    /// Upper bound for one provider lookup, in seconds.
    #[serde(default = "default_lookup_timeout")]
    pub lookup_timeout_secs: u64,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            offline: false,
            ban_threshold: default_ban_threshold(),
            lookup_timeout_secs: default_lookup_timeout(),
        }
    }
}

impl CheckerConfig {
    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_secs(self.lookup_timeout_secs)
    }
}

/// Persistent storage paths and list files.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_range_db")]
    pub range_db: String,
    #[serde(default = "default_whitelist_db")]
    pub whitelist_db: String,
    #[serde(default = "default_whitelist_ttl")]
    pub whitelist_ttl_secs: u64,
    /// Ban lists inserted into the range cache at startup.
    #[serde(default)]
    pub blacklists: Vec<String>,
    /// Allow lists removed from the range cache at startup, after the ban lists.
    #[serde(default)]
    pub whitelists: Vec<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            range_db: default_range_db(),
            whitelist_db: default_whitelist_db(),
            whitelist_ttl_secs: default_whitelist_ttl(),
            blacklists: Vec::new(),
            whitelists: Vec::new(),
        }
    }
}

impl StorageConfig {
    pub fn whitelist_ttl(&self) -> Duration {
        Duration::from_secs(self.whitelist_ttl_secs)
    }
}

/// What a ban looks like on the game server.
#[derive(Debug, Clone, Deserialize)]
pub struct BanConfig {
    #[serde(default = "default_ban_duration")]
    pub duration_secs: u64,
    /// Used when the cache holds no reason for the address.
    #[serde(default = "default_ban_reason")]
    pub reason: String,
}

impl Default for BanConfig {
    fn default() -> Self {
        Self {
            duration_secs: default_ban_duration(),
            reason: default_ban_reason(),
        }
    }
}

impl BanConfig {
    /// Ban length as the console expects it; never below one minute.
    pub fn minutes(&self) -> u64 {
        (self.duration_secs / 60).max(1)
    }
}

/// One econ console.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerEntry {
    /// `host:port` of the econ listener.
    pub address: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReconnectConfig {
    #[serde(default = "default_reconnect_delay")]
    pub delay_secs: u64,
    /// Give up on a server once retries have taken this long in total.
    #[serde(default = "default_reconnect_timeout")]
    pub timeout_secs: u64,
    /// Bound on each login phase (TCP connect, password exchange).
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            delay_secs: default_reconnect_delay(),
            timeout_secs: default_reconnect_timeout(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

impl ReconnectConfig {
    pub fn delay(&self) -> Duration {
        Duration::from_secs(self.delay_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// Prometheus endpoint. Port 0 disables it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetricsConfig {
    #[serde(default)]
    pub port: u16,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert!(!config.checker.offline);
        assert_eq!(config.checker.ban_threshold, 0.6);
        assert_eq!(config.storage.range_db, "ranges.redb");
        assert_eq!(config.storage.whitelist_ttl(), Duration::from_secs(604_800));
        assert_eq!(config.ban.reason, "VPN");
        assert_eq!(config.ban.minutes(), 5);
        assert_eq!(config.reconnect.delay(), Duration::from_secs(10));
        assert_eq!(config.reconnect.timeout(), Duration::from_secs(86_400));
        assert_eq!(config.reconnect.connect_timeout(), Duration::from_secs(10));
        assert_eq!(config.metrics.port, 0);
        assert!(config.servers.is_empty());
    }

    #[test]
    fn servers_parse() {
        let config: Config = toml::from_str(
            r#"
[[servers]]
address = "127.0.0.1:8303"
password = "econ"

[[servers]]
address = "127.0.0.1:8304"
password = "econ2"
"#,
        )
        .unwrap();
        assert_eq!(config.servers.len(), 2);
        assert_eq!(config.servers[1].address, "127.0.0.1:8304");
    }

    #[test]
    fn reconnect_section_parses() {
        let config: Config = toml::from_str(
            r#"
[reconnect]
delay_secs = 3
connect_timeout_secs = 4
"#,
        )
        .unwrap();
        assert_eq!(config.reconnect.delay(), Duration::from_secs(3));
        assert_eq!(config.reconnect.connect_timeout(), Duration::from_secs(4));
        assert_eq!(config.reconnect.timeout(), Duration::from_secs(86_400));
    }

    #[test]
    fn short_ban_rounds_up_to_a_minute() {
        let ban = BanConfig {
            duration_secs: 30,
            reason: "x".into(),
        };
        assert_eq!(ban.minutes(), 1);
    }

    #[test]
    fn load_reports_missing_file() {
        let err = Config::load("/nonexistent/vpnsentry.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
