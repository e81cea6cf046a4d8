//! CLI argument definitions for coinsync.
//!
//! | Command | Description |
//! |---------|-------------|
//! | `ingest` | Pull every market page once and upsert it |
//! | `schedule` | Run `ingest` on a fixed interval until Ctrl-C |
//! | `coins` | List stored coins in rank order |
//! | `export` | Write the coin listing to a CSV file |
//! | `status` | Stored coin count and the last ingestion run |

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use coinsync_core::CurrencyFormat;

/// Keep a local DuckDB copy of the CoinGecko market listing in sync.
#[derive(Debug, Parser)]
#[command(name = "coinsync", author, version, about)]
pub struct Cli {
    /// Output format for results.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,

    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// DuckDB file to use instead of `$COINSYNC_HOME/warehouse.duckdb`.
    #[arg(long, global = true)]
    pub db_path: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
}

/// Display currency for price columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Currency {
    Usd,
    Ngn,
}

impl Currency {
    pub const fn format(self) -> CurrencyFormat {
        match self {
            Self::Usd => CurrencyFormat::usd(),
            Self::Ngn => CurrencyFormat::ngn(),
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch all market pages once and upsert them into the warehouse.
    Ingest(IngestArgs),
    /// Run ingestion on a recurring interval.
    Schedule(ScheduleArgs),
    /// List stored coins.
    Coins(CoinsArgs),
    /// Export the coin listing to CSV.
    Export(ExportArgs),
    /// Show warehouse status.
    Status,
}

#[derive(Debug, Clone, Args)]
pub struct IngestArgs {
    /// Total attempts per run, including the first.
    #[arg(long, default_value_t = 5)]
    pub max_attempts: u32,

    /// Make a single attempt.
    #[arg(long, default_value_t = false, conflicts_with = "max_attempts")]
    pub no_retry: bool,

    /// Records per upstream page (1-250).
    #[arg(long)]
    pub per_page: Option<u32>,

    /// Records buffered before each upsert.
    #[arg(long, default_value_t = coinsync_core::DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,

    /// Quote currency requested from the upstream.
    #[arg(long)]
    pub vs_currency: Option<String>,

    /// Upstream API base URL.
    #[arg(long)]
    pub base_url: Option<String>,
}

#[derive(Debug, Args)]
pub struct ScheduleArgs {
    /// Seconds between run starts.
    #[arg(long, default_value_t = 60)]
    pub interval_secs: u64,

    /// Stop after this many runs.
    #[arg(long)]
    pub max_runs: Option<u64>,

    #[command(flatten)]
    pub ingest: IngestArgs,
}

#[derive(Debug, Args)]
pub struct CoinsArgs {
    /// Maximum number of coins to show.
    #[arg(long)]
    pub limit: Option<usize>,

    /// Display currency for price columns.
    #[arg(long, value_enum, default_value_t = Currency::Usd)]
    pub currency: Currency,
}

#[derive(Debug, Args)]
pub struct ExportArgs {
    /// Destination CSV file.
    #[arg(long)]
    pub output: PathBuf,

    /// Display currency for price columns.
    #[arg(long, value_enum, default_value_t = Currency::Usd)]
    pub currency: Currency,
}
