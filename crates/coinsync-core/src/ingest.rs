//! Ingestion orchestrator: drains the page sequence into fixed-size batches
//! and upserts each batch.

use coinsync_warehouse::{CoinStore, IngestRunEntry, RunStatus};
use serde::Serialize;
use tokio::time::Instant;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::client::CoinGeckoClient;
use crate::domain::CoinRecord;
use crate::retry::RetryPolicy;
use crate::sync::synchronize;
use crate::{IngestError, ValidationError};

pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Counters for one completed ingestion run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestSummary {
    pub run_id: Uuid,
    /// Non-empty pages fetched.
    pub pages: u32,
    pub records: usize,
    pub batches: usize,
    pub created: usize,
    pub updated: usize,
    pub conflicts_ignored: usize,
    /// Attempt on which the run succeeded, starting at 1.
    pub attempts: u32,
    pub latency_ms: u64,
}

impl IngestSummary {
    fn new(run_id: Uuid, attempt: u32) -> Self {
        Self {
            run_id,
            pages: 0,
            records: 0,
            batches: 0,
            created: 0,
            updated: 0,
            conflicts_ignored: 0,
            attempts: attempt,
            latency_ms: 0,
        }
    }

    pub fn to_log_entry(&self) -> IngestRunEntry {
        IngestRunEntry {
            run_id: self.run_id.to_string(),
            status: RunStatus::Ok,
            attempts: self.attempts,
            pages: u64::from(self.pages),
            records: to_u64(self.records),
            created: to_u64(self.created),
            updated: to_u64(self.updated),
            latency_ms: self.latency_ms,
            error: None,
            logged_at: None,
        }
    }
}

impl IngestError {
    /// The `ingest_log` entry for a failed run. Errors raised before any
    /// attempt started have none.
    pub fn to_log_entry(&self) -> Option<IngestRunEntry> {
        match self {
            Self::RetriesExhausted {
                run_id,
                attempts,
                last,
            } => Some(IngestRunEntry {
                run_id: run_id.to_string(),
                status: RunStatus::Failed,
                attempts: *attempts,
                pages: 0,
                records: 0,
                created: 0,
                updated: 0,
                latency_ms: 0,
                error: Some(last.to_string()),
                logged_at: None,
            }),
            _ => None,
        }
    }
}

/// Pulls every market page and upserts the records into `store`.
///
/// Runs are strictly sequential and keep no checkpoint: each attempt starts
/// again from page 1.
#[derive(Debug)]
pub struct Ingestor<S> {
    client: CoinGeckoClient,
    store: S,
    batch_size: usize,
}

impl<S: CoinStore> Ingestor<S> {
    pub fn new(client: CoinGeckoClient, store: S) -> Self {
        Self {
            client,
            store,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Replace the number of records buffered before each upsert.
    ///
    /// # Errors
    /// Returns [`ValidationError::InvalidBatchSize`] if `batch_size` is 0.
    pub fn with_batch_size(mut self, batch_size: usize) -> Result<Self, ValidationError> {
        if batch_size == 0 {
            return Err(ValidationError::InvalidBatchSize);
        }
        self.batch_size = batch_size;
        Ok(self)
    }

    pub fn client(&self) -> &CoinGeckoClient {
        &self.client
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// A single attempt. Any fetch or sync error aborts it.
    pub async fn run_once(&self) -> Result<IngestSummary, IngestError> {
        let run_id = Uuid::new_v4();
        self.attempt(run_id, 1)
            .instrument(info_span!("ingest_run", %run_id))
            .await
    }

    /// Attempt the run up to `policy.max_attempts` times, sleeping the
    /// policy's backoff between attempts.
    ///
    /// # Errors
    /// Returns [`IngestError::Validation`] if the policy allows no attempts,
    /// and [`IngestError::RetriesExhausted`] once every attempt has failed.
    pub async fn run_with_retry(&self, policy: &RetryPolicy) -> Result<IngestSummary, IngestError> {
        policy.validate()?;
        let run_id = Uuid::new_v4();

        async move {
            let mut attempt = 1;
            loop {
                match self.attempt(run_id, attempt).await {
                    Ok(summary) => return Ok(summary),
                    Err(error) => match policy.delay_before_retry(attempt) {
                        Some(delay) => {
                            warn!(
                                attempt,
                                max_attempts = policy.max_attempts,
                                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                                error = %error,
                                "ingestion attempt failed, retrying"
                            );
                            tokio::time::sleep(delay).await;
                            attempt += 1;
                        }
                        None => {
                            warn!(attempt, error = %error, "ingestion failed, retries exhausted");
                            return Err(IngestError::RetriesExhausted {
                                run_id,
                                attempts: attempt,
                                last: Box::new(error),
                            });
                        }
                    },
                }
            }
        }
        .instrument(info_span!("ingest_run", %run_id))
        .await
    }

    async fn attempt(&self, run_id: Uuid, attempt: u32) -> Result<IngestSummary, IngestError> {
        let started = Instant::now();
        let mut summary = IngestSummary::new(run_id, attempt);
        let mut pages = self.client.pages();
        let mut buffer: Vec<CoinRecord> = Vec::with_capacity(self.batch_size);

        while let Some(record) = pages.next_record().await? {
            buffer.push(record);
            summary.records += 1;
            if buffer.len() >= self.batch_size {
                self.flush(&mut buffer, &mut summary)?;
            }
        }
        if !buffer.is_empty() {
            self.flush(&mut buffer, &mut summary)?;
        }

        summary.pages = pages.pages_fetched();
        summary.latency_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        info!(
            attempt,
            pages = summary.pages,
            records = summary.records,
            created = summary.created,
            updated = summary.updated,
            latency_ms = summary.latency_ms,
            "ingestion run complete"
        );
        Ok(summary)
    }

    fn flush(
        &self,
        buffer: &mut Vec<CoinRecord>,
        summary: &mut IngestSummary,
    ) -> Result<(), IngestError> {
        let report = synchronize(&self.store, buffer.as_slice())?;
        summary.batches += 1;
        summary.created += report.created.len();
        summary.updated += report.updated.len();
        summary.conflicts_ignored += report.conflicts_ignored;
        info!(
            batch = summary.batches,
            size = buffer.len(),
            created = report.created.len(),
            updated = report.updated.len(),
            "flushed batch"
        );
        buffer.clear();
        Ok(())
    }
}

fn to_u64(value: usize) -> u64 {
    u64::try_from(value).unwrap_or(u64::MAX)
}
