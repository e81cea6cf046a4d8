use coinsync_warehouse::WarehouseError;
use thiserror::Error;
use uuid::Uuid;

use crate::source::SourceError;

/// Validation errors for upstream records and pipeline configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("coin id cannot be empty")]
    EmptyCoinId,

    #[error("timestamp must be RFC3339: '{value}'")]
    InvalidTimestamp { value: String },

    #[error("per_page must be between 1 and {max}, got {value}")]
    InvalidPageSize { value: u32, max: u32 },

    #[error("batch_size must be at least 1")]
    InvalidBatchSize,

    #[error("max_attempts must be at least 1")]
    InvalidMaxAttempts,
}

/// Failure of an ingestion run. Any variant aborts the run in progress.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Warehouse(#[from] WarehouseError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("ingestion run {run_id} failed after {attempts} attempt(s): {last}")]
    RetriesExhausted {
        run_id: Uuid,
        attempts: u32,
        #[source]
        last: Box<IngestError>,
    },
}

impl IngestError {
    /// The error from the final attempt, unwrapping retry exhaustion.
    pub fn root(&self) -> &IngestError {
        match self {
            Self::RetriesExhausted { last, .. } => last.root(),
            other => other,
        }
    }
}
