use coinsync_core::{
    ClientConfig, CoinGeckoClient, IngestError, IngestRunEntry, IngestSummary, Ingestor,
    RetryPolicy, Warehouse,
};
use tracing::warn;

use crate::cli::IngestArgs;
use crate::error::CliError;

use super::CommandResult;

pub async fn run(args: &IngestArgs, warehouse: &Warehouse) -> Result<CommandResult, CliError> {
    let ingestor = build_ingestor(args, warehouse)?;
    let policy = retry_policy(args);

    let summary = run_and_record(&ingestor, &policy).await?;
    Ok(CommandResult::ok(serde_json::to_value(&summary)?))
}

pub(super) fn build_ingestor(
    args: &IngestArgs,
    warehouse: &Warehouse,
) -> Result<Ingestor<Warehouse>, CliError> {
    let mut config = ClientConfig::from_env();
    if let Some(per_page) = args.per_page {
        config.per_page = per_page;
    }
    if let Some(vs_currency) = &args.vs_currency {
        config.vs_currency = vs_currency.trim().to_ascii_lowercase();
    }
    if let Some(base_url) = &args.base_url {
        config.base_url = base_url.trim_end_matches('/').to_owned();
    }

    let client = CoinGeckoClient::new(config)?;
    Ok(Ingestor::new(client, warehouse.clone()).with_batch_size(args.batch_size)?)
}

pub(super) fn retry_policy(args: &IngestArgs) -> RetryPolicy {
    if args.no_retry {
        RetryPolicy::no_retry()
    } else {
        RetryPolicy::exponential(args.max_attempts)
    }
}

/// Run with retries and append the outcome to `ingest_log`.
pub(super) async fn run_and_record(
    ingestor: &Ingestor<Warehouse>,
    policy: &RetryPolicy,
) -> Result<IngestSummary, IngestError> {
    let result = ingestor.run_with_retry(policy).await;

    let entry = match &result {
        Ok(summary) => Some(summary.to_log_entry()),
        Err(error) => error.to_log_entry(),
    };
    if let Some(entry) = entry {
        record_run(ingestor.store(), &entry);
    }
    result
}

fn record_run(warehouse: &Warehouse, entry: &IngestRunEntry) {
    if let Err(error) = warehouse.record_ingest_run(entry) {
        warn!(run_id = %entry.run_id, error = %error, "failed to record ingestion run");
    }
}
