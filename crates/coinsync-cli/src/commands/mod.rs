mod coins;
mod export;
mod ingest;
mod schedule;
mod status;
#[cfg(test)]
mod testing;

use std::path::Path;

use coinsync_core::{Warehouse, WarehouseConfig};
use serde_json::Value;

use crate::cli::{Cli, Command};
use crate::error::CliError;

pub struct CommandResult {
    pub data: Value,
    /// Preferred rendering for `--format table`; falls back to `data`.
    pub table: Option<Table>,
}

impl CommandResult {
    pub fn ok(data: Value) -> Self {
        Self { data, table: None }
    }

    pub fn with_table(mut self, table: Table) -> Self {
        self.table = Some(table);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

pub async fn run(cli: &Cli) -> Result<CommandResult, CliError> {
    let warehouse = open_warehouse(cli.db_path.as_deref())?;

    match &cli.command {
        Command::Ingest(args) => ingest::run(args, &warehouse).await,
        Command::Schedule(args) => schedule::run(args, &warehouse).await,
        Command::Coins(args) => coins::run(args, &warehouse),
        Command::Export(args) => export::run(args, &warehouse),
        Command::Status => status::run(&warehouse),
    }
}

fn open_warehouse(db_path: Option<&Path>) -> Result<Warehouse, CliError> {
    let config = match db_path {
        Some(path) => WarehouseConfig::with_db_path(path),
        None => WarehouseConfig::default(),
    };
    Ok(Warehouse::open(config)?)
}
