//! Configuration validation.
//!
//! Validates configuration at startup to catch common errors early.

use super::Config;
use std::path::Path;
use thiserror::Error;

/// Validation errors for configuration.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("checker.ban_threshold must be in (0, 1], got {0}")]
    InvalidBanThreshold(f64),
    #[error("checker.lookup_timeout_secs must be positive")]
    ZeroLookupTimeout,
    #[error("providers.getipintel.threshold must be in [0, 1], got {0}")]
    InvalidGetIpIntelThreshold(f64),
    #[error("providers.getipintel.contact must be an e-mail address, got {0:?}")]
    InvalidGetIpIntelContact(String),
    #[error("providers.request_timeout_secs must be positive")]
    ZeroRequestTimeout,
    #[error("at least one [[servers]] entry is required")]
    NoServers,
    #[error("servers[{0}].address is empty")]
    EmptyServerAddress(usize),
    #[error("reconnect.delay_secs must be positive")]
    ZeroReconnectDelay,
    #[error("reconnect.connect_timeout_secs must be positive")]
    ZeroConnectTimeout,
    #[error("storage path parent directory does not exist: {0}")]
    StoragePathInvalid(String),
}

impl ValidationError {
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidBanThreshold(_) => "invalid_ban_threshold",
            Self::ZeroLookupTimeout => "zero_lookup_timeout",
            Self::InvalidGetIpIntelThreshold(_) => "invalid_getipintel_threshold",
            Self::InvalidGetIpIntelContact(_) => "invalid_getipintel_contact",
            Self::ZeroRequestTimeout => "zero_request_timeout",
            Self::NoServers => "no_servers",
            Self::EmptyServerAddress(_) => "empty_server_address",
            Self::ZeroReconnectDelay => "zero_reconnect_delay",
            Self::ZeroConnectTimeout => "zero_connect_timeout",
            Self::StoragePathInvalid(_) => "storage_path_invalid",
        }
    }
}

/// Validate a configuration, returning all errors found.
///
/// `require_servers` is set for `run`; list maintenance commands work
/// without any console configured.
pub fn validate(config: &Config, require_servers: bool) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let threshold = config.checker.ban_threshold;
    if !(threshold > 0.0 && threshold <= 1.0) {
        errors.push(ValidationError::InvalidBanThreshold(threshold));
    }
    if config.checker.lookup_timeout_secs == 0 {
        errors.push(ValidationError::ZeroLookupTimeout);
    }

    let intel = config.providers.getipintel.threshold;
    if !(0.0..=1.0).contains(&intel) {
        errors.push(ValidationError::InvalidGetIpIntelThreshold(intel));
    }
    // GetIPIntel only runs with an e-mail contact.
    if let Some(contact) = &config.providers.getipintel.contact
        && !config.providers.getipintel.enabled()
    {
        errors.push(ValidationError::InvalidGetIpIntelContact(contact.clone()));
    }
    if config.providers.request_timeout_secs == 0 {
        errors.push(ValidationError::ZeroRequestTimeout);
    }

    if require_servers && config.servers.is_empty() {
        errors.push(ValidationError::NoServers);
    }
    for (idx, server) in config.servers.iter().enumerate() {
        if server.address.trim().is_empty() {
            errors.push(ValidationError::EmptyServerAddress(idx));
        }
    }

    if config.reconnect.delay_secs == 0 {
        errors.push(ValidationError::ZeroReconnectDelay);
    }
    if config.reconnect.connect_timeout_secs == 0 {
        errors.push(ValidationError::ZeroConnectTimeout);
    }

    for path in [&config.storage.range_db, &config.storage.whitelist_db] {
        if let Some(parent) = Path::new(path).parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            errors.push(ValidationError::StoragePathInvalid(path.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
