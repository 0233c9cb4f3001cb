//! Bulk ban and allow list import.
//!
//! Ban lists insert every parsed range with its reason; allow lists remove
//! each parsed range from the cache. Lines that do not parse are skipped.

use crate::security::{ListEntry, parse_list_line};
use crate::store::{RangeStore, StoreError};
use std::path::Path;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Ban,
    Allow,
}

/// Insert every range listed in `path`. Returns the number of ranges applied.
pub async fn import_blacklist(
    store: &dyn RangeStore,
    path: impl AsRef<Path>,
) -> Result<usize, StoreError> {
    apply(store, path.as_ref(), Mode::Ban).await
}

/// Remove every range listed in `path`. Returns the number of ranges applied.
pub async fn import_whitelist(
    store: &dyn RangeStore,
    path: impl AsRef<Path>,
) -> Result<usize, StoreError> {
    apply(store, path.as_ref(), Mode::Allow).await
}

async fn apply(store: &dyn RangeStore, path: &Path, mode: Mode) -> Result<usize, StoreError> {
    let file = File::open(path).await?;
    let mut lines = BufReader::new(file).lines();

    let mut applied = 0;
    let mut addresses: u64 = 0;
    let mut line_no = 0;
    while let Some(line) = lines.next_line().await? {
        line_no += 1;
        let ListEntry { range, reason } = match parse_list_line(&line) {
            Ok(Some(entry)) => entry,
            Ok(None) => continue,
            Err(e) => {
                debug!(
                    file = %path.display(),
                    line = line_no,
                    error = %e,
                    code = e.error_code(),
                    "skipping list line"
                );
                continue;
            }
        };

        match mode {
            Mode::Ban => store.insert(range, &reason).await?,
            Mode::Allow => store.remove(range).await?,
        }
        applied += 1;
        addresses += range.size();
    }

    info!(file = %path.display(), applied, addresses, mode = ?mode, "list applied");
    Ok(applied)
}
