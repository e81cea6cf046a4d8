use std::future::Future;
use std::time::Duration;

use coinsync_core::{Ingestor, RetryPolicy, Warehouse};
use serde_json::json;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use crate::cli::ScheduleArgs;
use crate::error::CliError;

use super::ingest::{build_ingestor, retry_policy, run_and_record};
use super::CommandResult;

/// Start one run per tick until Ctrl-C or `--max-runs`.
///
/// Runs never overlap: a tick that comes due while a run is in flight is
/// skipped. A failed run is logged and the schedule carries on. A run cut
/// short by Ctrl-C is dropped mid-flight and never reaches `ingest_log`.
pub async fn run(args: &ScheduleArgs, warehouse: &Warehouse) -> Result<CommandResult, CliError> {
    if args.interval_secs == 0 {
        return Err(CliError::Command(String::from(
            "--interval-secs must be at least 1",
        )));
    }

    let ingestor = build_ingestor(&args.ingest, warehouse)?;
    let policy = retry_policy(&args.ingest);
    policy.validate()?;

    let report = run_schedule(
        &ingestor,
        &policy,
        Duration::from_secs(args.interval_secs),
        args.max_runs,
        tokio::signal::ctrl_c(),
    )
    .await;

    Ok(CommandResult::ok(json!({
        "runs": report.runs,
        "failures": report.failures,
    })))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct ScheduleReport {
    pub runs: u64,
    pub failures: u64,
}

/// Tick loop behind `schedule`. Ends when `shutdown` resolves or after
/// `max_runs` runs.
pub(super) async fn run_schedule<F: Future>(
    ingestor: &Ingestor<Warehouse>,
    policy: &RetryPolicy,
    interval: Duration,
    max_runs: Option<u64>,
    shutdown: F,
) -> ScheduleReport {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tokio::pin!(shutdown);

    info!(interval_secs = interval.as_secs(), "scheduler started");
    let mut report = ScheduleReport {
        runs: 0,
        failures: 0,
    };

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            _ = ticker.tick() => {}
        }

        let outcome = tokio::select! {
            _ = &mut shutdown => break,
            outcome = run_and_record(ingestor, policy) => outcome,
        };
        report.runs += 1;
        if let Err(err) = outcome {
            report.failures += 1;
            error!(error = %err, "scheduled ingestion run failed");
        }

        if max_runs.is_some_and(|max| report.runs >= max) {
            break;
        }
    }

    info!(
        runs = report.runs,
        failures = report.failures,
        "scheduler stopped"
    );
    report
}
