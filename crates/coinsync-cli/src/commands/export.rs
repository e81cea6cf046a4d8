//! Export the coin listing to CSV.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use coinsync_core::Warehouse;
use csv::Writer;
use serde_json::json;

use crate::cli::ExportArgs;
use crate::error::CliError;

use super::coins::listing;
use super::{CommandResult, Table};

pub fn run(args: &ExportArgs, warehouse: &Warehouse) -> Result<CommandResult, CliError> {
    let format = args.currency.format();
    let coins = warehouse.list_coins(None)?;
    let table = listing(&coins, &format);

    if let Some(parent) = args.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&args.output)?;
    write_csv(file, &table)?;

    Ok(CommandResult::ok(json!({
        "output": display_path(&args.output),
        "format": "csv",
        "rows_exported": table.rows.len(),
    })))
}

fn write_csv<W: Write>(writer: W, table: &Table) -> Result<(), CliError> {
    let mut wtr = Writer::from_writer(writer);
    wtr.write_record(&table.headers)?;
    for row in &table.rows {
        wtr.write_record(row)?;
    }
    wtr.flush()?;
    Ok(())
}

fn display_path(path: &Path) -> String {
    path.display().to_string()
}
