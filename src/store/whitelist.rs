//! Redb-backed short-term whitelist.
//!
//! Maps an address to the unix second its clean verdict expires. Expired
//! entries read as absent; [`RedbWhitelist::prune`] deletes them for good.

use super::{StoreError, WhitelistStore, db_err};
use async_trait::async_trait;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use std::net::Ipv4Addr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const WHITELIST_TABLE: TableDefinition<u32, i64> = TableDefinition::new("whitelist");

pub struct RedbWhitelist {
    db: Arc<Database>,
    ttl: Duration,
}

impl RedbWhitelist {
    /// Open or create the whitelist database at `path`.
    pub fn new<P: AsRef<Path>>(path: P, ttl: Duration) -> Result<Self, StoreError> {
        let db = Database::create(path.as_ref()).map_err(db_err)?;

        let write_txn = db.begin_write().map_err(db_err)?;
        write_txn.open_table(WHITELIST_TABLE).map_err(db_err)?;
        write_txn.commit().map_err(db_err)?;

        Ok(Self {
            db: Arc::new(db),
            ttl,
        })
    }

    /// Delete every expired entry. Returns how many were removed.
    pub fn prune(&self) -> Result<usize, StoreError> {
        let now = chrono::Utc::now().timestamp();

        let write_txn = self.db.begin_write().map_err(db_err)?;
        let count = {
            let mut table = write_txn.open_table(WHITELIST_TABLE).map_err(db_err)?;
            let mut expired = Vec::new();
            for item in table.iter().map_err(db_err)? {
                let (k, v) = item.map_err(db_err)?;
                if v.value() <= now {
                    expired.push(k.value());
                }
            }
            for key in &expired {
                table.remove(*key).map_err(db_err)?;
            }
            expired.len()
        };
        write_txn.commit().map_err(db_err)?;

        debug!(count, "pruned expired whitelist entries");
        Ok(count)
    }
}

#[async_trait]
impl WhitelistStore for RedbWhitelist {
    async fn exists(&self, ip: Ipv4Addr) -> Result<bool, StoreError> {
        let read_txn = self.db.begin_read().map_err(db_err)?;
        let table = read_txn.open_table(WHITELIST_TABLE).map_err(db_err)?;

        let expires_at = table
            .get(u32::from(ip))
            .map_err(db_err)?
            .map(|v| v.value());
        Ok(expires_at.is_some_and(|at| at > chrono::Utc::now().timestamp()))
    }

    async fn whitelist(&self, ip: Ipv4Addr) -> Result<(), StoreError> {
        let ttl = i64::try_from(self.ttl.as_secs()).unwrap_or(i64::MAX);
        let expires_at = chrono::Utc::now().timestamp().saturating_add(ttl);

        let write_txn = self.db.begin_write().map_err(db_err)?;
        {
            let mut table = write_txn.open_table(WHITELIST_TABLE).map_err(db_err)?;
            table.insert(u32::from(ip), expires_at).map_err(db_err)?;
        }
        write_txn.commit().map_err(db_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const WEEK: Duration = Duration::from_secs(7 * 24 * 60 * 60);

    #[tokio::test]
    async fn test_whitelist_then_exists() {
        let dir = TempDir::new().unwrap();
        let store = RedbWhitelist::new(dir.path().join("wl.redb"), WEEK).unwrap();
        let ip = Ipv4Addr::new(84, 17, 1, 1);

        assert!(!store.exists(ip).await.unwrap());
        store.whitelist(ip).await.unwrap();
        assert!(store.exists(ip).await.unwrap());
        assert!(!store.exists(Ipv4Addr::new(84, 17, 1, 2)).await.unwrap());
    }

    #[tokio::test]
    async fn test_expired_entries_read_as_absent_and_prune() {
        let dir = TempDir::new().unwrap();
        let store = RedbWhitelist::new(dir.path().join("wl.redb"), Duration::ZERO).unwrap();
        let ip = Ipv4Addr::new(1, 1, 1, 1);

        store.whitelist(ip).await.unwrap();
        assert!(!store.exists(ip).await.unwrap());
        assert_eq!(store.prune().unwrap(), 1);
        assert_eq!(store.prune().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_prune_keeps_fresh_entries() {
        let dir = TempDir::new().unwrap();
        let store = RedbWhitelist::new(dir.path().join("wl.redb"), WEEK).unwrap();
        store.whitelist(Ipv4Addr::new(2, 2, 2, 2)).await.unwrap();
        assert_eq!(store.prune().unwrap(), 0);
        assert!(store.exists(Ipv4Addr::new(2, 2, 2, 2)).await.unwrap());
    }
}
