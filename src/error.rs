//! Unified error handling for vpnsentry.
//!
//! Verdict-level and provider-level errors live here; storage errors stay in
//! `store` next to the redb code, range parsing errors in `security::ranges`.

use crate::store::StoreError;
use thiserror::Error;

// ============================================================================
// Check Errors (verdict pipeline)
// ============================================================================

/// Errors that abort a single `VpnChecker::is_vpn` call.
///
/// Provider failures never show up here; they only shrink the quorum.
#[derive(Debug, Error)]
pub enum CheckError {
    #[error("invalid address: {0:?}")]
    InvalidAddress(String),

    #[error("storage unavailable: {0}")]
    Storage(#[from] StoreError),

    #[error("check cancelled by shutdown")]
    Cancelled,
}

impl CheckError {
    /// Get a static error code string for metrics labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidAddress(_) => "invalid_address",
            Self::Storage(_) => "storage_unavailable",
            Self::Cancelled => "cancelled",
        }
    }
}

// ============================================================================
// Provider Errors (excluded from quorum)
// ============================================================================

/// Why a reputation provider produced no usable verdict.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("rate limit exceeded")]
    RateLimitExceeded,

    #[error("provider unavailable: {0}")]
    Unavailable(String),
}

impl ProviderError {
    /// Get a static error code string for metrics labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::RateLimitExceeded => "rate_limited",
            Self::Unavailable(_) => "unavailable",
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Unavailable("request timed out".to_string())
        } else if let Some(status) = e.status() {
            Self::Unavailable(format!("http status {}", status))
        } else {
            Self::Unavailable(e.to_string())
        }
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(e: serde_json::Error) -> Self {
        Self::Unavailable(format!("malformed response: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_error_codes() {
        assert_eq!(CheckError::InvalidAddress("x".into()).error_code(), "invalid_address");
        assert_eq!(
            CheckError::Storage(StoreError::Database("down".into())).error_code(),
            "storage_unavailable"
        );
        assert_eq!(CheckError::Cancelled.error_code(), "cancelled");
    }

    #[test]
    fn test_provider_error_codes() {
        assert_eq!(ProviderError::RateLimitExceeded.error_code(), "rate_limited");
        assert_eq!(ProviderError::Unavailable("boom".into()).error_code(), "unavailable");
    }

    #[test]
    fn test_malformed_json_maps_to_unavailable() {
        let err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        assert!(matches!(ProviderError::from(err), ProviderError::Unavailable(_)));
    }
}
