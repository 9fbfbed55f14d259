//! Per-category worker and sender tasks
//!
//! Each device type gets two tasks joined by bounded queues:
//!
//! ```text
//! loader ──inbound(buffer)──▶ worker ──send(buffer)──▶ sender ──▶ memcached
//!                             (encode)                 (put + retry)
//! ```
//!
//! The worker keeps pulling from the inbound queue while the sender waits on
//! the network, up to the send queue's capacity. Shutdown is drain-then-exit:
//! closing the inbound queue lets the worker finish everything already queued,
//! close the send queue, and wait for the sender to do the same.

use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, error, info, info_span, Instrument};

use crate::codec::PackedRecord;
use crate::config::RetryPolicy;
use crate::device::DeviceType;
use crate::error::{LoadError, Result};
use crate::parser::AppsInstalled;
use crate::stats::CategoryCounters;
use crate::store::KvStore;

/// Where a worker's records end up
pub enum Delivery<S> {
    Store(S),
    /// Log each would-be write against `addr` instead of sending it
    DryRun { addr: String },
}

#[derive(Debug, Clone, Copy)]
pub struct WorkerSettings {
    pub buffer_size: usize,
    pub retry: RetryPolicy,
}

/// Join handle for a running worker
pub struct WorkerHandle {
    device_type: DeviceType,
    join: JoinHandle<std::result::Result<CategoryCounters, JoinError>>,
}

impl WorkerHandle {
    pub fn device_type(&self) -> DeviceType {
        self.device_type
    }

    /// Wait for the worker and its sender to drain and exit
    ///
    /// Only returns once every sender of the inbound queue has been dropped.
    pub async fn finish(self) -> Result<CategoryCounters> {
        let device_type = self.device_type;
        let failed = |source| LoadError::WorkerFailed {
            device_type,
            source,
        };
        self.join.await.map_err(failed)?.map_err(failed)
    }
}

/// Start a worker for `device_type`
///
/// Returns the inbound queue and the handle used to wait for shutdown.
pub fn spawn_worker<S>(
    device_type: DeviceType,
    delivery: Delivery<S>,
    settings: WorkerSettings,
) -> (mpsc::Sender<AppsInstalled>, WorkerHandle)
where
    S: KvStore + 'static,
{
    let (inbound, inbox) = mpsc::channel(settings.buffer_size);
    let span = info_span!("worker", device_type = %device_type);
    let join = tokio::spawn(run_worker(inbox, delivery, settings).instrument(span));

    (inbound, WorkerHandle { device_type, join })
}

async fn run_worker<S>(
    mut inbox: mpsc::Receiver<AppsInstalled>,
    delivery: Delivery<S>,
    settings: WorkerSettings,
) -> std::result::Result<CategoryCounters, JoinError>
where
    S: KvStore + 'static,
{
    let store = match delivery {
        Delivery::DryRun { addr } => {
            let mut seen = 0u64;
            while let Some(record) = inbox.recv().await {
                let packed = PackedRecord::pack(&record);
                info!(
                    addr = %addr,
                    key = %packed.key,
                    payload = %packed.data_hex(),
                    apps = ?record.apps,
                    "{} - {} -> {} bytes",
                    addr,
                    packed.key,
                    packed.data.len()
                );
                seen += 1;
            }
            debug!(records = seen, "Dry run worker drained");
            return Ok(CategoryCounters::default());
        },
        Delivery::Store(store) => store,
    };

    let (outbox, queue) = mpsc::channel(settings.buffer_size);
    let span = info_span!("sender", addr = %store.addr());
    let sender = tokio::spawn(run_sender(store, queue, settings.retry).instrument(span));

    while let Some(record) = inbox.recv().await {
        if outbox.send(PackedRecord::pack(&record)).await.is_err() {
            error!("Sender stopped early, no more records accepted");
            break;
        }
    }

    // Closing the send queue is the sender's shutdown signal
    drop(outbox);
    sender.await
}

async fn run_sender<S: KvStore>(
    mut store: S,
    mut queue: mpsc::Receiver<PackedRecord>,
    retry: RetryPolicy,
) -> CategoryCounters {
    let mut counters = CategoryCounters::default();

    while let Some(packed) = queue.recv().await {
        if put_with_retry(&mut store, &packed, retry).await {
            counters.stored += 1;
        } else {
            counters.failed += 1;
        }
    }

    info!(
        stored = counters.stored,
        failed = counters.failed,
        "Sender drained"
    );
    counters
}

/// Write one record, retrying immediately on any error
///
/// Returns whether some attempt succeeded.
pub async fn put_with_retry<S: KvStore + ?Sized>(
    store: &mut S,
    packed: &PackedRecord,
    retry: RetryPolicy,
) -> bool {
    for attempt in 1..=retry.max_attempts {
        match store.put(&packed.key, &packed.data).await {
            Ok(()) => return true,
            Err(e) if attempt < retry.max_attempts => {
                debug!(key = %packed.key, attempt, error = %e, "Store write failed, retrying");
            },
            Err(e) => {
                error!(
                    addr = %store.addr(),
                    key = %packed.key,
                    attempts = retry.max_attempts,
                    error = %e,
                    "Cannot write to memc"
                );
            },
        }
    }
    false
}
