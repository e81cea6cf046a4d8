//! Bulk coin persistence used by the upsert synchronizer.

use std::collections::HashMap;

use ::duckdb::types::Value as DuckValue;
use ::duckdb::ToSql;

use crate::models::{select_columns, CoinField, CoinRow};
use crate::{finalize_transaction, Warehouse, WarehouseError};

/// Storage seam for coin rows.
///
/// Implementations must treat `bulk_create` conflicts on `coin_id` as a
/// silent skip and must never write the identifier in `bulk_update`.
pub trait CoinStore {
    /// Rows whose identifier is in `coin_ids`, keyed by identifier.
    fn fetch_existing(&self, coin_ids: &[String]) -> Result<HashMap<String, CoinRow>, WarehouseError>;

    /// Insert `rows`, skipping any identifier that already exists.
    /// Returns how many rows were actually inserted.
    fn bulk_create(&self, rows: &[CoinRow]) -> Result<usize, WarehouseError>;

    /// Overwrite `fields` on each of `rows`, matched by identifier.
    /// Returns how many rows were changed.
    fn bulk_update(&self, rows: &[CoinRow], fields: &[CoinField]) -> Result<usize, WarehouseError>;
}

impl CoinStore for Warehouse {
    fn fetch_existing(&self, coin_ids: &[String]) -> Result<HashMap<String, CoinRow>, WarehouseError> {
        if coin_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let placeholders = vec!["?"; coin_ids.len()].join(", ");
        let sql = format!(
            "SELECT {columns} FROM coins WHERE coin_id IN ({placeholders})",
            columns = select_columns(),
        );

        let connection = self.pool.acquire()?;
        let mut statement = connection.prepare(&sql)?;
        let params: Vec<&dyn ToSql> = coin_ids.iter().map(|id| id as &dyn ToSql).collect();
        let mut rows = statement.query(params.as_slice())?;

        let mut existing = HashMap::with_capacity(coin_ids.len());
        while let Some(row) = rows.next()? {
            let coin = CoinRow::from_row(row)?;
            existing.insert(coin.coin_id.clone(), coin);
        }
        Ok(existing)
    }

    fn bulk_create(&self, rows: &[CoinRow]) -> Result<usize, WarehouseError> {
        if rows.is_empty() {
            return Ok(0);
        }

        let placeholders = vec!["?"; CoinField::ALL.len() + 1].join(", ");
        let sql = format!(
            "INSERT OR IGNORE INTO coins ({columns}, synced_at) \
             VALUES ({placeholders}, CURRENT_TIMESTAMP)",
            columns = select_columns(),
        );

        let connection = self.pool.acquire()?;
        connection.execute_batch("BEGIN TRANSACTION")?;
        let result = (|| -> Result<usize, WarehouseError> {
            let mut statement = connection.prepare(&sql)?;
            let mut inserted = 0;
            for row in rows {
                let mut values = Vec::with_capacity(CoinField::ALL.len() + 1);
                values.push(DuckValue::Text(row.coin_id.clone()));
                values.extend(CoinField::ALL.iter().map(|field| row.value(*field)));

                let params: Vec<&dyn ToSql> = values.iter().map(|v| v as &dyn ToSql).collect();
                inserted += statement.execute(params.as_slice())?;
            }
            Ok(inserted)
        })();

        finalize_transaction(&connection, result)
    }

    fn bulk_update(&self, rows: &[CoinRow], fields: &[CoinField]) -> Result<usize, WarehouseError> {
        if rows.is_empty() {
            return Ok(0);
        }
        if fields.is_empty() {
            return Err(WarehouseError::Rejected(String::from(
                "bulk update needs at least one field",
            )));
        }

        let assignments = fields
            .iter()
            .map(|field| format!("{} = ?", field.column()))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE coins SET {assignments}, synced_at = CURRENT_TIMESTAMP WHERE coin_id = ?"
        );

        let connection = self.pool.acquire()?;
        connection.execute_batch("BEGIN TRANSACTION")?;
        let result = (|| -> Result<usize, WarehouseError> {
            let mut statement = connection.prepare(&sql)?;
            let mut updated = 0;
            for row in rows {
                let mut values: Vec<DuckValue> =
                    fields.iter().map(|field| row.value(*field)).collect();
                values.push(DuckValue::Text(row.coin_id.clone()));

                let params: Vec<&dyn ToSql> = values.iter().map(|v| v as &dyn ToSql).collect();
                updated += statement.execute(params.as_slice())?;
            }
            Ok(updated)
        })();

        finalize_transaction(&connection, result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::WarehouseConfig;
    use tempfile::{tempdir, TempDir};

    fn open_warehouse() -> (TempDir, Warehouse) {
        let temp = tempdir().expect("tempdir");
        let warehouse = Warehouse::open(WarehouseConfig {
            home: temp.path().to_path_buf(),
            db_path: temp.path().join("warehouse.duckdb"),
            max_pool_size: 2,
        })
        .expect("warehouse open");
        (temp, warehouse)
    }

    fn coin(id: &str, price: f64) -> CoinRow {
        CoinRow {
            symbol: Some(id.chars().take(3).collect()),
            name: Some(id.to_uppercase()),
            current_price: Some(price),
            market_cap: Some(1_000_000_000_000),
            ..CoinRow::new(id)
        }
    }

    #[test]
    fn fetch_existing_returns_only_requested_identifiers() {
        let (_temp, warehouse) = open_warehouse();
        warehouse
            .bulk_create(&[coin("bitcoin", 1.0), coin("ethereum", 2.0), coin("solana", 3.0)])
            .expect("create");

        let existing = warehouse
            .fetch_existing(&["bitcoin".to_string(), "solana".to_string(), "tron".to_string()])
            .expect("fetch");

        let mut ids: Vec<_> = existing.keys().cloned().collect();
        ids.sort();
        assert_eq!(ids, vec!["bitcoin", "solana"]);
        assert_eq!(existing["solana"].current_price, Some(3.0));
    }

    #[test]
    fn fetch_existing_with_no_identifiers_is_empty() {
        let (_temp, warehouse) = open_warehouse();
        assert!(warehouse.fetch_existing(&[]).expect("fetch").is_empty());
    }

    #[test]
    fn bulk_create_skips_identifiers_that_already_exist() {
        let (_temp, warehouse) = open_warehouse();
        assert_eq!(warehouse.bulk_create(&[coin("bitcoin", 1.0)]).expect("first"), 1);

        let inserted = warehouse
            .bulk_create(&[coin("bitcoin", 99.0), coin("ethereum", 2.0)])
            .expect("second");

        assert_eq!(inserted, 1);
        let stored = warehouse.get_coin("bitcoin").expect("get").expect("present");
        assert_eq!(stored.current_price, Some(1.0), "conflicting insert must not overwrite");
        assert_eq!(warehouse.coin_count().expect("count"), 2);
    }

    #[test]
    fn bulk_update_writes_nulls_for_absent_values() {
        let (_temp, warehouse) = open_warehouse();
        warehouse.bulk_create(&[coin("bitcoin", 1.0)]).expect("create");

        let replacement = CoinRow {
            current_price: Some(2.5),
            ..CoinRow::new("bitcoin")
        };
        let updated = warehouse
            .bulk_update(&[replacement.clone()], &CoinField::ALL)
            .expect("update");

        assert_eq!(updated, 1);
        let stored = warehouse.get_coin("bitcoin").expect("get").expect("present");
        assert_eq!(stored, replacement);
    }

    #[test]
    fn bulk_update_touches_only_listed_fields() {
        let (_temp, warehouse) = open_warehouse();
        warehouse.bulk_create(&[coin("bitcoin", 1.0)]).expect("create");

        let replacement = CoinRow {
            current_price: Some(7.0),
            ..CoinRow::new("bitcoin")
        };
        warehouse
            .bulk_update(&[replacement], &[CoinField::CurrentPrice])
            .expect("update");

        let stored = warehouse.get_coin("bitcoin").expect("get").expect("present");
        assert_eq!(stored.current_price, Some(7.0));
        assert_eq!(stored.name.as_deref(), Some("BITCOIN"));
    }

    #[test]
    fn bulk_update_rejects_empty_field_list() {
        let (_temp, warehouse) = open_warehouse();
        let error = warehouse
            .bulk_update(&[coin("bitcoin", 1.0)], &[])
            .expect_err("must reject");
        assert!(matches!(error, WarehouseError::Rejected(_)));
    }

    #[test]
    fn identifiers_are_bound_not_interpolated() {
        let (_temp, warehouse) = open_warehouse();
        let hostile = "x'); DROP TABLE coins; --";
        warehouse.bulk_create(&[coin(hostile, 1.0)]).expect("create");

        let existing = warehouse.fetch_existing(&[hostile.to_string()]).expect("fetch");
        assert!(existing.contains_key(hostile));
        assert_eq!(warehouse.coin_count().expect("count"), 1);
    }
}
