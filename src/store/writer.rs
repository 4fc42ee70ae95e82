//! Bounded, fire-and-forget writer for API samples.
//!
//! ```text
//! submit() ──try_send──▶ [bounded queue] ──▶ dispatcher ──permit──▶ insert task
//!    │                                                     (Semaphore)   (own deadline)
//!    └─ queue full: newest sample dropped, counted
//! ```
//!
//! `submit` never awaits. The dispatcher exits once every sender is gone.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::{Notify, Semaphore};

use crate::observability::metrics;
use crate::store::backend::MetricsBackend;
use crate::store::error::with_deadline;
use crate::store::types::ApiMetricSample;

/// Samples accepted but not yet written or failed.
#[derive(Default)]
struct Pending {
    count: AtomicUsize,
    idle: Notify,
}

impl Pending {
    fn begin(&self) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }

    fn finish(&self) {
        if self.count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.idle.notify_waiters();
        }
    }
}

pub(crate) struct ApiWriter {
    tx: mpsc::Sender<ApiMetricSample>,
    pending: Arc<Pending>,
}

impl ApiWriter {
    /// Start the dispatcher on the current runtime.
    pub(crate) fn spawn(
        backend: Arc<dyn MetricsBackend>,
        queue_capacity: usize,
        max_concurrent_writes: usize,
        write_timeout: Duration,
    ) -> Self {
        let (tx, rx) = mpsc::channel(queue_capacity.max(1));
        let pending = Arc::new(Pending::default());
        let permits = Arc::new(Semaphore::new(max_concurrent_writes.max(1)));

        tokio::spawn(dispatch(rx, backend, permits, write_timeout, pending.clone()));

        Self { tx, pending }
    }

    /// Queue a sample. Returns `false` when it was dropped.
    pub(crate) fn submit(&self, sample: ApiMetricSample) -> bool {
        self.pending.begin();
        match self.tx.try_send(sample) {
            Ok(()) => true,
            Err(TrySendError::Full(sample)) => {
                self.pending.finish();
                metrics::record_api_sample_dropped();
                tracing::warn!(
                    method = %sample.method,
                    path = %sample.path,
                    "API metric queue full, dropping newest sample"
                );
                false
            }
            Err(TrySendError::Closed(_)) => {
                self.pending.finish();
                tracing::debug!("API metric writer closed, dropping sample");
                false
            }
        }
    }

    /// Wait until every accepted sample has been written or has failed.
    pub(crate) async fn flush(&self) {
        loop {
            let idle = self.pending.idle.notified();
            if self.pending.count.load(Ordering::SeqCst) == 0 {
                return;
            }
            idle.await;
        }
    }

    pub(crate) fn pending(&self) -> usize {
        self.pending.count.load(Ordering::SeqCst)
    }
}

async fn dispatch(
    mut rx: mpsc::Receiver<ApiMetricSample>,
    backend: Arc<dyn MetricsBackend>,
    permits: Arc<Semaphore>,
    write_timeout: Duration,
    pending: Arc<Pending>,
) {
    while let Some(sample) = rx.recv().await {
        let permit = match permits.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => {
                pending.finish();
                break;
            }
        };

        let backend = backend.clone();
        let pending = pending.clone();
        tokio::spawn(async move {
            let _permit = permit;
            if let Err(e) = with_deadline(write_timeout, backend.insert_api(&sample)).await {
                metrics::record_write_failure("api", &e);
                tracing::warn!(
                    error = %e,
                    method = %sample.method,
                    path = %sample.path,
                    "Failed to record API metric"
                );
            }
            pending.finish();
        });
    }

    tracing::debug!("API metric dispatcher stopped");
}
