//! Persistent verdict storage.
//!
//! Two stores back the checker:
//!
//! - [`RangeStore`]: permanent ban ranges with a reason, keyed for point
//!   containment lookups. Shipped as [`RedbRangeStore`].
//! - [`WhitelistStore`]: short-lived "known clean" addresses. Shipped as
//!   [`RedbWhitelist`]; [`NoopWhitelist`] stands in when offline.

use crate::security::IpRange;
use async_trait::async_trait;
use std::net::Ipv4Addr;
use thiserror::Error;

pub mod noop;
pub mod range_redb;
pub mod whitelist;

pub use noop::NoopWhitelist;
pub use range_redb::RedbRangeStore;
pub use whitelist::RedbWhitelist;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Database error: {0}")]
    Database(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl StoreError {
    /// Get a static error code string for metrics labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Io(_) => "io",
            Self::Database(_) => "database",
            Self::Serialization(_) => "serialization",
        }
    }
}

/// Map any redb error into [`StoreError::Database`].
pub(crate) fn db_err(e: impl std::fmt::Display) -> StoreError {
    StoreError::Database(e.to_string())
}

/// Range-indexed ban cache.
#[async_trait]
pub trait RangeStore: Send + Sync {
    /// Reason stored for the range covering `ip`, or `None` when no stored
    /// range covers it. An empty reason means "banned, no specific reason".
    async fn find(&self, ip: Ipv4Addr) -> Result<Option<String>, StoreError>;

    /// Cover `range` with `reason`. Overlapping coverage is overwritten;
    /// calling it twice with the same arguments is a no-op.
    async fn insert(&self, range: IpRange, reason: &str) -> Result<(), StoreError>;

    /// Drop all coverage of `range`.
    async fn remove(&self, range: IpRange) -> Result<(), StoreError>;
}

/// Time-bounded cache of addresses found clean.
#[async_trait]
pub trait WhitelistStore: Send + Sync {
    async fn exists(&self, ip: Ipv4Addr) -> Result<bool, StoreError>;

    async fn whitelist(&self, ip: Ipv4Addr) -> Result<(), StoreError>;
}
