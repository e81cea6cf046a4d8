//! # Coinsync Warehouse
//!
//! DuckDB-backed storage for coin market snapshots.
//!
//! The `coins` table holds one row per upstream coin identifier. Rows are
//! created the first time an identifier is seen and overwritten in place on
//! every later sighting; nothing here deletes them.
//!
//! ## Tables
//!
//! | Table | Description |
//! |-------|-------------|
//! | `coins` | Latest market snapshot per coin |
//! | `ingest_log` | One row per ingestion run |
//! | `schema_migrations` | Applied migration versions |
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use coinsync_warehouse::{CoinField, CoinRow, CoinStore, Warehouse};
//!
//! let warehouse = Warehouse::open_default()?;
//! let row = CoinRow { current_price: Some(64_000.0), ..CoinRow::new("bitcoin") };
//!
//! if warehouse.bulk_create(&[row.clone()])? == 0 {
//!     warehouse.bulk_update(&[row], &CoinField::ALL)?;
//! }
//! # Ok::<(), coinsync_warehouse::WarehouseError>(())
//! ```

pub mod duckdb;
pub mod migrations;
pub mod models;
pub mod store;

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use ::duckdb::{params, Connection};
use thiserror::Error;

pub use crate::duckdb::{ConnectionPool, PooledConnection};
pub use models::{CoinField, CoinRow, IngestRunEntry, RunStatus};
pub use store::CoinStore;

use models::select_columns;

/// Errors that can occur during warehouse operations.
#[derive(Debug, Error)]
pub enum WarehouseError {
    #[error(transparent)]
    DuckDb(#[from] ::duckdb::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The operation was refused before touching the database.
    #[error("rejected: {0}")]
    Rejected(String),
}

/// Location and sizing of the warehouse database.
#[derive(Debug, Clone)]
pub struct WarehouseConfig {
    /// Root directory for coinsync data.
    pub home: PathBuf,
    /// Path to the `DuckDB` database file.
    pub db_path: PathBuf,
    /// Maximum number of idle connections kept open.
    pub max_pool_size: usize,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        let home = resolve_home();
        let db_path = home.join("warehouse.duckdb");
        Self {
            home,
            db_path,
            max_pool_size: 4,
        }
    }
}

impl WarehouseConfig {
    /// Default configuration with an explicit database file.
    pub fn with_db_path(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            ..Self::default()
        }
    }
}

/// Handle to the coin warehouse. Cheap to clone; clones share the pool.
#[derive(Clone)]
pub struct Warehouse {
    config: WarehouseConfig,
    pool: ConnectionPool,
}

impl Warehouse {
    pub fn open_default() -> Result<Self, WarehouseError> {
        Self::open(WarehouseConfig::default())
    }

    /// Open (creating if needed) the database and apply pending migrations.
    ///
    /// # Arguments
    /// * `config` - Database location and pool size
    ///
    /// # Errors
    /// Returns an error if:
    /// - The parent directory cannot be created
    /// - The database file cannot be opened
    /// - A migration fails
    pub fn open(config: WarehouseConfig) -> Result<Self, WarehouseError> {
        if let Some(parent) = config.db_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let pool = ConnectionPool::new(config.db_path.clone(), config.max_pool_size);
        let warehouse = Self { config, pool };
        warehouse.initialize()?;
        tracing::debug!(path = %warehouse.db_path().display(), "warehouse opened");
        Ok(warehouse)
    }

    pub fn initialize(&self) -> Result<(), WarehouseError> {
        let connection = self.pool.acquire()?;
        migrations::apply_migrations(&connection)?;
        Ok(())
    }

    pub fn db_path(&self) -> &Path {
        self.pool.db_path()
    }

    pub fn config(&self) -> &WarehouseConfig {
        &self.config
    }

    /// Stored coins in market-cap rank order; unranked coins last.
    pub fn list_coins(&self, limit: Option<usize>) -> Result<Vec<CoinRow>, WarehouseError> {
        let mut sql = format!(
            "SELECT {columns} FROM coins ORDER BY market_cap_rank ASC NULLS LAST, coin_id ASC",
            columns = select_columns(),
        );
        if let Some(limit) = limit {
            sql.push_str(&format!(" LIMIT {limit}"));
        }

        let connection = self.pool.acquire()?;
        let mut statement = connection.prepare(&sql)?;
        let mut rows = statement.query([])?;
        let mut coins = Vec::new();
        while let Some(row) = rows.next()? {
            coins.push(CoinRow::from_row(row)?);
        }
        Ok(coins)
    }

    pub fn get_coin(&self, coin_id: &str) -> Result<Option<CoinRow>, WarehouseError> {
        let sql = format!(
            "SELECT {columns} FROM coins WHERE coin_id = ?",
            columns = select_columns(),
        );

        let connection = self.pool.acquire()?;
        let mut statement = connection.prepare(&sql)?;
        let mut rows = statement.query(params![coin_id])?;
        match rows.next()? {
            Some(row) => Ok(Some(CoinRow::from_row(row)?)),
            None => Ok(None),
        }
    }

    pub fn coin_count(&self) -> Result<usize, WarehouseError> {
        let connection = self.pool.acquire()?;
        let count: i64 = connection.query_row("SELECT COUNT(*) FROM coins", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    pub fn record_ingest_run(&self, entry: &IngestRunEntry) -> Result<(), WarehouseError> {
        let connection = self.pool.acquire()?;
        connection.execute(
            "INSERT INTO ingest_log \
             (run_id, status, attempts, pages, records, created, updated, latency_ms, error, logged_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, CURRENT_TIMESTAMP)",
            params![
                entry.run_id,
                entry.status.as_str(),
                i64::from(entry.attempts),
                to_bigint(entry.pages),
                to_bigint(entry.records),
                to_bigint(entry.created),
                to_bigint(entry.updated),
                to_bigint(entry.latency_ms),
                entry.error,
            ],
        )?;
        Ok(())
    }

    pub fn last_ingest_run(&self) -> Result<Option<IngestRunEntry>, WarehouseError> {
        let connection = self.pool.acquire()?;
        let mut statement = connection.prepare(
            "SELECT run_id, status, attempts, pages, records, created, updated, latency_ms, error, \
             CAST(logged_at AS VARCHAR) \
             FROM ingest_log ORDER BY logged_at DESC, rowid DESC LIMIT 1",
        )?;
        let mut rows = statement.query([])?;
        let Some(row) = rows.next()? else {
            return Ok(None);
        };

        let status: String = row.get(1)?;
        Ok(Some(IngestRunEntry {
            run_id: row.get(0)?,
            status: RunStatus::parse(&status),
            attempts: u32::try_from(row.get::<_, i64>(2)?).unwrap_or_default(),
            pages: from_bigint(row.get(3)?),
            records: from_bigint(row.get(4)?),
            created: from_bigint(row.get(5)?),
            updated: from_bigint(row.get(6)?),
            latency_ms: from_bigint(row.get(7)?),
            error: row.get(8)?,
            logged_at: row.get(9)?,
        }))
    }
}

/// Commit on success, roll back on failure.
pub(crate) fn finalize_transaction<T>(
    connection: &Connection,
    result: Result<T, WarehouseError>,
) -> Result<T, WarehouseError> {
    match result {
        Ok(value) => {
            connection.execute_batch("COMMIT")?;
            Ok(value)
        }
        Err(error) => {
            let _ = connection.execute_batch("ROLLBACK");
            Err(error)
        }
    }
}

fn to_bigint(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn from_bigint(value: i64) -> u64 {
    u64::try_from(value).unwrap_or_default()
}

fn resolve_home() -> PathBuf {
    if let Some(path) = env::var_os("COINSYNC_HOME") {
        let path = PathBuf::from(path);
        if !path.as_os_str().is_empty() {
            return path;
        }
    }

    if let Some(home) = env::var_os("HOME") {
        return PathBuf::from(home).join(".coinsync");
    }

    PathBuf::from(".coinsync")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn open_in(dir: &Path) -> Warehouse {
        Warehouse::open(WarehouseConfig {
            home: dir.to_path_buf(),
            db_path: dir.join("nested").join("warehouse.duckdb"),
            max_pool_size: 2,
        })
        .expect("warehouse open")
    }

    #[test]
    fn open_creates_parent_directories_and_tables() {
        let temp = tempdir().expect("tempdir");
        let warehouse = open_in(temp.path());

        assert!(warehouse.db_path().exists());
        assert_eq!(warehouse.coin_count().expect("count"), 0);
        assert!(warehouse.last_ingest_run().expect("log").is_none());
    }

    #[test]
    fn reopening_does_not_reapply_migrations() {
        let temp = tempdir().expect("tempdir");
        drop(open_in(temp.path()));
        let warehouse = open_in(temp.path());

        let connection = warehouse.pool.acquire().expect("connection");
        let applied: i64 = connection
            .query_row("SELECT COUNT(*) FROM schema_migrations", [], |row| row.get(0))
            .expect("count");
        assert_eq!(applied, 2);
    }

    #[test]
    fn list_coins_orders_by_rank_with_unranked_last() {
        let temp = tempdir().expect("tempdir");
        let warehouse = open_in(temp.path());
        let rows = vec![
            CoinRow { market_cap_rank: None, ..CoinRow::new("aaa-unranked") },
            CoinRow { market_cap_rank: Some(2), ..CoinRow::new("ethereum") },
            CoinRow { market_cap_rank: Some(1), ..CoinRow::new("bitcoin") },
        ];
        warehouse.bulk_create(&rows).expect("create");

        let ids: Vec<String> = warehouse
            .list_coins(None)
            .expect("list")
            .into_iter()
            .map(|coin| coin.coin_id)
            .collect();
        assert_eq!(ids, vec!["bitcoin", "ethereum", "aaa-unranked"]);

        assert_eq!(warehouse.list_coins(Some(1)).expect("limited").len(), 1);
    }

    #[test]
    fn ingest_runs_are_logged_and_read_back() {
        let temp = tempdir().expect("tempdir");
        let warehouse = open_in(temp.path());
        let entry = IngestRunEntry {
            run_id: String::from("run-0001"),
            status: RunStatus::Failed,
            attempts: 5,
            pages: 2,
            records: 53,
            created: 50,
            updated: 0,
            latency_ms: 1_250,
            error: Some(String::from("connection failed")),
            logged_at: None,
        };
        warehouse.record_ingest_run(&entry).expect("record");

        let stored = warehouse.last_ingest_run().expect("read").expect("present");
        assert_eq!(stored.run_id, "run-0001");
        assert_eq!(stored.status, RunStatus::Failed);
        assert_eq!(stored.records, 53);
        assert_eq!(stored.error.as_deref(), Some("connection failed"));
        assert!(stored.logged_at.is_some());
    }
}
