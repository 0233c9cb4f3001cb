//! Default value functions for configuration.
//!
//! Separated into its own module for clarity and reuse.

// =============================================================================
// Checker Defaults
// =============================================================================

pub fn default_ban_threshold() -> f64 {
    0.6
}

pub fn default_lookup_timeout() -> u64 {
    10
}

// =============================================================================
// Storage Defaults
// =============================================================================

pub fn default_range_db() -> String {
    "ranges.redb".to_string()
}

pub fn default_whitelist_db() -> String {
    "whitelist.redb".to_string()
}

pub fn default_whitelist_ttl() -> u64 {
    7 * 24 * 60 * 60
}

// =============================================================================
// Ban Defaults
// =============================================================================

pub fn default_ban_duration() -> u64 {
    5 * 60
}

pub fn default_ban_reason() -> String {
    "VPN".to_string()
}

// =============================================================================
// Reconnect Defaults
// =============================================================================

pub fn default_reconnect_delay() -> u64 {
    10
}

pub fn default_reconnect_timeout() -> u64 {
    24 * 60 * 60
}

pub fn default_connect_timeout() -> u64 {
    10
}

// =============================================================================
// Provider Defaults
// =============================================================================

pub fn default_request_timeout() -> u64 {
    5
}

pub fn default_daily_limit() -> usize {
    1000
}

pub fn default_getipintel_daily_limit() -> usize {
    500
}

pub fn default_getipintel_threshold() -> f64 {
    0.99
}

pub fn default_getipintel_url() -> String {
    "http://check.getipintel.net".to_string()
}

pub fn default_ipteoh_url() -> String {
    "https://ip.teoh.io".to_string()
}
