//! Create-or-update reconciliation of a record batch against the store.

use std::collections::HashMap;

use coinsync_warehouse::{CoinField, CoinRow, CoinStore, WarehouseError};
use serde::Serialize;
use tracing::debug;

use crate::domain::CoinRecord;

/// Outcome of one [`synchronize`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Identifiers that were absent and sent to the bulk insert.
    pub created: Vec<String>,
    /// Identifiers that already existed and were overwritten.
    pub updated: Vec<String>,
    /// Creations skipped because the identifier appeared in the meantime.
    pub conflicts_ignored: usize,
}

/// Upsert `records` by identifier.
///
/// Existing rows get every mutable field overwritten with the incoming
/// values, nulls included. Creations and updates are applied as two
/// separate bulk operations, creations first. If the same identifier occurs
/// more than once in `records` the last occurrence wins.
///
/// # Errors
/// Returns the store's error if the read or either bulk operation fails.
/// Creations committed before a failed update stay committed.
pub fn synchronize<S>(store: &S, records: &[CoinRecord]) -> Result<SyncReport, WarehouseError>
where
    S: CoinStore + ?Sized,
{
    let batch = collapse_duplicates(records);
    if batch.is_empty() {
        return Ok(SyncReport::default());
    }

    let ids: Vec<String> = batch.iter().map(|record| record.id.clone()).collect();
    let mut existing = store.fetch_existing(&ids)?;

    let mut to_create: Vec<CoinRow> = Vec::new();
    let mut to_update: Vec<CoinRow> = Vec::new();
    for record in batch {
        match existing.remove(&record.id) {
            Some(mut row) => {
                record.apply_to(&mut row);
                to_update.push(row);
            }
            None => to_create.push(record.to_row()),
        }
    }

    let mut report = SyncReport {
        created: to_create.iter().map(|row| row.coin_id.clone()).collect(),
        updated: to_update.iter().map(|row| row.coin_id.clone()).collect(),
        conflicts_ignored: 0,
    };

    if !to_create.is_empty() {
        let inserted = store.bulk_create(&to_create)?;
        report.conflicts_ignored = to_create.len().saturating_sub(inserted);
    }
    if !to_update.is_empty() {
        store.bulk_update(&to_update, &CoinField::ALL)?;
    }

    debug!(
        created = report.created.len(),
        updated = report.updated.len(),
        conflicts_ignored = report.conflicts_ignored,
        "synchronized batch"
    );
    Ok(report)
}

fn collapse_duplicates(records: &[CoinRecord]) -> Vec<&CoinRecord> {
    let mut position: HashMap<&str, usize> = HashMap::with_capacity(records.len());
    let mut batch: Vec<&CoinRecord> = Vec::with_capacity(records.len());

    for record in records {
        match position.get(record.id.as_str()) {
            Some(&index) => batch[index] = record,
            None => {
                position.insert(record.id.as_str(), batch.len());
                batch.push(record);
            }
        }
    }
    batch
}
