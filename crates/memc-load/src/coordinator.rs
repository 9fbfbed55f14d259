//! Run coordinator
//!
//! Wires one worker per device type, drives ingestion to completion or to
//! the first fatal error, then waits for every worker to drain and turns the
//! counters they hand back into a verdict:
//! 1. Spawn workers (memcached clients, or dry-run loggers)
//! 2. Ingest matching files on a blocking thread
//! 3. Close the inbound queues and join the workers
//! 4. Aggregate statistics and judge the error rate

use futures::future::join_all;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::config::RunConfig;
use crate::device::DeviceType;
use crate::error::{LoadError, Result};
use crate::loader::{self, IngestReport, Router};
use crate::stats::{CategoryCounters, RunStatistics, Verdict, NORMAL_ERR_RATE};
use crate::store::{KvStore, MemcacheClient};
use crate::worker::{spawn_worker, Delivery, WorkerHandle, WorkerSettings};

/// How a run that reached its end turned out
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    /// Nothing was written, so there are no statistics to judge
    DryRun { ingest: IngestReport },
    Completed {
        ingest: IngestReport,
        stats: RunStatistics,
        verdict: Verdict,
    },
}

impl RunOutcome {
    /// Whether the error rate was too high
    pub fn is_rejected(&self) -> bool {
        matches!(self, RunOutcome::Completed { verdict, .. } if verdict.is_rejected())
    }
}

#[derive(Serialize)]
struct Summary<'a> {
    ingest: &'a IngestReport,
    stats: &'a RunStatistics,
}

/// Coordinates a single loader run
pub struct RunCoordinator {
    config: RunConfig,
}

impl RunCoordinator {
    pub fn new(config: RunConfig) -> Self {
        Self { config }
    }

    /// Run against the configured memcached endpoints
    pub async fn run(&self) -> Result<RunOutcome> {
        let timeout = self.config.socket_timeout;
        self.run_with(|_, addr| MemcacheClient::new(addr, timeout)).await
    }

    /// Run with stores built by `make_store`
    ///
    /// `make_store` is not called in dry-run mode.
    pub async fn run_with<S, F>(&self, mut make_store: F) -> Result<RunOutcome>
    where
        S: KvStore + 'static,
        F: FnMut(DeviceType, &str) -> S,
    {
        self.config.validate()?;

        let settings = WorkerSettings {
            buffer_size: self.config.buffer_size,
            retry: self.config.retry,
        };
        let dry_run = self.config.dry_run;

        let mut workers = Vec::with_capacity(DeviceType::ALL.len());
        let queues = self.config.endpoints.clone().map(|device, addr| {
            let delivery = if dry_run {
                Delivery::DryRun { addr }
            } else {
                Delivery::Store(make_store(device, &addr))
            };
            let (inbound, handle) = spawn_worker(device, delivery, settings);
            workers.push(handle);
            inbound
        });
        let router = Router::new(queues);

        let pattern = self.config.pattern.clone();
        let ingested = tokio::task::spawn_blocking(move || loader::ingest(&pattern, router)).await;

        // The router is gone by now, so every worker is draining
        let counters = join_workers(workers).await;

        let ingest = match ingested {
            Ok(Ok(report)) => report,
            Ok(Err(e)) => {
                error!(error = %e, "Ingestion aborted");
                return Err(e);
            },
            Err(e) => return Err(LoadError::IngestionFailed(e)),
        };
        let counters = counters?;

        if dry_run {
            info!(
                files = ingest.files,
                records = ingest.records,
                parse_errors = ingest.parse_errors,
                "Dry run finished"
            );
            return Ok(RunOutcome::DryRun { ingest });
        }

        let stats = RunStatistics::aggregate(ingest.parse_errors, counters);
        let verdict = stats.verdict(NORMAL_ERR_RATE);
        log_verdict(&ingest, &stats, verdict);

        Ok(RunOutcome::Completed {
            ingest,
            stats,
            verdict,
        })
    }
}

/// Wait for every worker, reporting the first one that failed
async fn join_workers(workers: Vec<WorkerHandle>) -> Result<Vec<CategoryCounters>> {
    let results = join_all(workers.into_iter().map(|w| {
        let device = w.device_type();
        async move { (device, w.finish().await) }
    }))
    .await;

    let mut counters = Vec::with_capacity(results.len());
    let mut first_error = None;
    for (device, result) in results {
        match result {
            Ok(c) => {
                info!(device_type = %device, stored = c.stored, failed = c.failed, "Worker finished");
                counters.push(c);
            },
            Err(e) => {
                error!(device_type = %device, error = %e, "Worker failed");
                first_error.get_or_insert(e);
            },
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(counters),
    }
}

fn log_verdict(ingest: &IngestReport, stats: &RunStatistics, verdict: Verdict) {
    let summary = serde_json::to_string(&Summary { ingest, stats }).unwrap_or_default();

    match verdict {
        Verdict::Accepted { error_rate } => {
            info!(
                error_rate,
                threshold = NORMAL_ERR_RATE,
                summary = %summary,
                "Acceptable error rate ({}). Successful load",
                error_rate
            );
        },
        Verdict::Rejected {
            error_rate,
            threshold,
        } => {
            error!(
                error_rate,
                threshold,
                summary = %summary,
                "High error rate ({} > {}). Failed load",
                error_rate,
                threshold
            );
        },
        Verdict::NoData => {
            warn!(summary = %summary, "Nothing was stored, no error rate to report");
        },
    }
}
