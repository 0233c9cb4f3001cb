//! Whitelist that remembers nothing.
//!
//! Used in offline mode and whenever no whitelist database is configured.
//! `exists` is always `false` and `whitelist` always succeeds.

use super::{StoreError, WhitelistStore};
use async_trait::async_trait;
use std::net::Ipv4Addr;

pub struct NoopWhitelist;

#[async_trait]
impl WhitelistStore for NoopWhitelist {
    async fn exists(&self, _ip: Ipv4Addr) -> Result<bool, StoreError> {
        Ok(false)
    }

    async fn whitelist(&self, _ip: Ipv4Addr) -> Result<(), StoreError> {
        Ok(())
    }
}
