use serde_json::Value;

use crate::cli::OutputFormat;
use crate::commands::{CommandResult, Table};
use crate::error::CliError;

pub fn render(result: &CommandResult, format: OutputFormat, pretty: bool) -> Result<(), CliError> {
    match format {
        OutputFormat::Json => {
            let payload = if pretty {
                serde_json::to_string_pretty(&result.data)?
            } else {
                serde_json::to_string(&result.data)?
            };
            println!("{payload}");
        }
        OutputFormat::Table => match &result.table {
            Some(table) => print!("{}", format_table(table)),
            None => render_fields(&result.data)?,
        },
    }
    Ok(())
}

fn render_fields(data: &Value) -> Result<(), CliError> {
    let Value::Object(fields) = data else {
        println!("{}", serde_json::to_string_pretty(data)?);
        return Ok(());
    };

    let width = fields.keys().map(String::len).max().unwrap_or(0);
    for (key, value) in fields {
        match value {
            Value::Object(_) | Value::Array(_) => {
                println!("{key:<width$}:");
                for line in serde_json::to_string_pretty(value)?.lines() {
                    println!("  {line}");
                }
            }
            Value::String(text) => println!("{key:<width$}: {text}"),
            Value::Null => println!("{key:<width$}: -"),
            other => println!("{key:<width$}: {other}"),
        }
    }
    Ok(())
}

pub fn format_table(table: &Table) -> String {
    let mut widths: Vec<usize> = table.headers.iter().map(|h| h.chars().count()).collect();
    for row in &table.rows {
        for (index, cell) in row.iter().enumerate() {
            if let Some(width) = widths.get_mut(index) {
                *width = (*width).max(cell.chars().count());
            }
        }
    }

    let mut out = String::new();
    push_row(&mut out, &table.headers, &widths);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    push_row(&mut out, &rule, &widths);
    for row in &table.rows {
        push_row(&mut out, row, &widths);
    }
    out
}

fn push_row(out: &mut String, cells: &[String], widths: &[usize]) {
    let line = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| {
            let pad = width.saturating_sub(cell.chars().count());
            format!("{cell}{}", " ".repeat(pad))
        })
        .collect::<Vec<_>>()
        .join("  ");
    out.push_str(line.trim_end());
    out.push('\n');
}
