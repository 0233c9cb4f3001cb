//! Redb-backed range index for permanent bans.
//!
//! One table maps a range's lower bound (`u32`) to `{upper, reason}`.
//! Stored ranges never overlap, so a point lookup is a single predecessor
//! seek: the last range starting at or below the address either covers it
//! or nothing does.

use super::{RangeStore, StoreError, db_err};
use crate::security::IpRange;
use async_trait::async_trait;
use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, Table, TableDefinition};
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

const RANGES_TABLE: TableDefinition<u32, &[u8]> = TableDefinition::new("ranges");

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RangeRecord {
    upper: u32,
    reason: String,
}

impl RangeRecord {
    fn decode(bytes: &[u8]) -> Result<Self, StoreError> {
        serde_json::from_slice(bytes).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    fn encode(&self) -> Result<Vec<u8>, StoreError> {
        serde_json::to_vec(self).map_err(|e| StoreError::Serialization(e.to_string()))
    }
}

pub struct RedbRangeStore {
    db: Arc<Database>,
}

impl RedbRangeStore {
    /// Open or create the range database at `path`.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let db = Database::create(path.as_ref()).map_err(db_err)?;

        // Create the table up front so read transactions never miss it.
        let write_txn = db.begin_write().map_err(db_err)?;
        write_txn.open_table(RANGES_TABLE).map_err(db_err)?;
        write_txn.commit().map_err(db_err)?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Number of stored (non-overlapping) ranges.
    pub fn len(&self) -> Result<u64, StoreError> {
        let read_txn = self.db.begin_read().map_err(db_err)?;
        let table = read_txn.open_table(RANGES_TABLE).map_err(db_err)?;
        table.len().map_err(db_err)
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }

    /// Remove coverage of `lo..=hi` from the table, keeping the parts of
    /// partially overlapping ranges that fall outside it.
    fn carve(
        table: &mut Table<'_, u32, &'static [u8]>,
        lo: u32,
        hi: u32,
    ) -> Result<usize, StoreError> {
        let mut overlapping: Vec<(u32, RangeRecord)> = Vec::new();

        if let Some(item) = table.range(..lo).map_err(db_err)?.next_back() {
            let (k, v) = item.map_err(db_err)?;
            let record = RangeRecord::decode(v.value())?;
            if record.upper >= lo {
                overlapping.push((k.value(), record));
            }
        }
        for item in table.range(lo..=hi).map_err(db_err)? {
            let (k, v) = item.map_err(db_err)?;
            overlapping.push((k.value(), RangeRecord::decode(v.value())?));
        }

        for (start, record) in &overlapping {
            table.remove(*start).map_err(db_err)?;
            if *start < lo {
                let head = RangeRecord {
                    upper: lo - 1,
                    reason: record.reason.clone(),
                };
                table
                    .insert(*start, head.encode()?.as_slice())
                    .map_err(db_err)?;
            }
            if record.upper > hi {
                let tail = RangeRecord {
                    upper: record.upper,
                    reason: record.reason.clone(),
                };
                table
                    .insert(hi + 1, tail.encode()?.as_slice())
                    .map_err(db_err)?;
            }
        }

        Ok(overlapping.len())
    }
}

#[async_trait]
impl RangeStore for RedbRangeStore {
    async fn find(&self, ip: Ipv4Addr) -> Result<Option<String>, StoreError> {
        let key = u32::from(ip);
        let read_txn = self.db.begin_read().map_err(db_err)?;
        let table = read_txn.open_table(RANGES_TABLE).map_err(db_err)?;

        let Some(item) = table.range(..=key).map_err(db_err)?.next_back() else {
            return Ok(None);
        };
        let (k, v) = item.map_err(db_err)?;
        let record = RangeRecord::decode(v.value())?;
        let covered = IpRange::new(Ipv4Addr::from(k.value()), Ipv4Addr::from(record.upper))
            .is_ok_and(|range| range.contains(ip));
        Ok(covered.then_some(record.reason))
    }

    async fn insert(&self, range: IpRange, reason: &str) -> Result<(), StoreError> {
        let lo = u32::from(range.lower());
        let hi = u32::from(range.upper());
        let value = RangeRecord {
            upper: hi,
            reason: reason.to_string(),
        }
        .encode()?;

        let write_txn = self.db.begin_write().map_err(db_err)?;
        {
            let mut table = write_txn.open_table(RANGES_TABLE).map_err(db_err)?;
            let replaced = Self::carve(&mut table, lo, hi)?;
            table.insert(lo, value.as_slice()).map_err(db_err)?;
            debug!(range = %range, replaced, "range inserted");
        }
        write_txn.commit().map_err(db_err)?;
        Ok(())
    }

    async fn remove(&self, range: IpRange) -> Result<(), StoreError> {
        let lo = u32::from(range.lower());
        let hi = u32::from(range.upper());

        let write_txn = self.db.begin_write().map_err(db_err)?;
        {
            let mut table = write_txn.open_table(RANGES_TABLE).map_err(db_err)?;
            let touched = Self::carve(&mut table, lo, hi)?;
            debug!(range = %range, touched, "range removed");
        }
        write_txn.commit().map_err(db_err)?;
        Ok(())
    }
}
