//! Market data ingestion for coinsync.
//!
//! This crate contains:
//! - Typed upstream records and validation
//! - The HTTP transport seam and the CoinGecko markets client
//! - Create-or-update synchronization against a [`CoinStore`]
//! - The batching ingestion orchestrator and its retry policy
//! - Currency display formatting

pub mod client;
pub mod config;
pub mod domain;
pub mod error;
pub mod format;
pub mod http_client;
pub mod ingest;
pub mod retry;
pub mod source;
pub mod sync;

pub use client::{CoinGeckoClient, MarketPages};
pub use coinsync_warehouse::{
    CoinField, CoinRow, CoinStore, IngestRunEntry, RunStatus, Warehouse, WarehouseConfig,
    WarehouseError,
};
pub use config::ClientConfig;
pub use domain::{CoinRecord, UtcDateTime};
pub use error::{IngestError, ValidationError};
pub use format::{format_currency, CurrencyFormat};
pub use http_client::{HttpClient, HttpError, HttpRequest, HttpResponse, ReqwestHttpClient};
pub use ingest::{IngestSummary, Ingestor, DEFAULT_BATCH_SIZE};
pub use retry::{Backoff, RetryPolicy};
pub use source::{SourceError, SourceErrorKind};
pub use sync::{synchronize, SyncReport};
