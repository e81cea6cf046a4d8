use coinsync_core::Warehouse;
use serde_json::json;

use crate::error::CliError;

use super::CommandResult;

pub fn run(warehouse: &Warehouse) -> Result<CommandResult, CliError> {
    let coin_count = warehouse.coin_count()?;
    let last_run = warehouse.last_ingest_run()?;

    Ok(CommandResult::ok(json!({
        "db_path": warehouse.db_path().display().to_string(),
        "coins": coin_count,
        "last_run": last_run,
    })))
}
