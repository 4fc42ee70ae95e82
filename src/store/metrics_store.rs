//! The metrics store handle.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::config::StoreConfig;
use crate::observability::metrics;
use crate::store::backend::MetricsBackend;
use crate::store::error::{with_deadline, StoreResult};
use crate::store::types::{
    ApiMetricSample, ApiSummary, EndpointOrder, EndpointStat, LogFilter, Resource, StoreMode,
    SystemMetricSample, Table, TimePoint,
};
use crate::store::writer::ApiWriter;

/// Shared handle to the store. Cloning is cheap.
///
/// The mode is decided once in [`MetricsStore::init`] and never changes;
/// a backend that gains the extension later is only picked up by a restart.
#[derive(Clone)]
pub struct MetricsStore {
    inner: Arc<StoreInner>,
}

struct StoreInner {
    backend: Arc<dyn MetricsBackend>,
    mode: StoreMode,
    config: StoreConfig,
    writer: ApiWriter,
}

impl MetricsStore {
    /// Prepare the schema, choose the mode and start the API writer.
    ///
    /// Only a failure to create the tables is fatal. A missing or
    /// unactivatable extension selects `Degraded` mode.
    pub async fn init(backend: Arc<dyn MetricsBackend>, config: StoreConfig) -> StoreResult<Self> {
        let limit = config.read_timeout();

        let available = match with_deadline(limit, backend.extension_available()).await {
            Ok(available) => available,
            Err(e) => {
                tracing::warn!(backend = backend.name(), error = %e, "Time-series extension probe failed");
                false
            }
        };

        if available {
            if let Err(e) = with_deadline(limit, backend.activate_extension()).await {
                tracing::warn!(
                    backend = backend.name(),
                    error = %e,
                    "Could not activate time-series extension, continuing with existing schema"
                );
            }
        } else {
            tracing::info!(backend = backend.name(), "Time-series extension not available");
        }

        with_deadline(limit, backend.create_tables()).await?;

        let active = available
            && match with_deadline(limit, backend.extension_active()).await {
                Ok(active) => active,
                Err(e) => {
                    tracing::warn!(backend = backend.name(), error = %e, "Extension status check failed");
                    false
                }
            };

        let mode = if active {
            for table in Table::ALL {
                if let Err(e) = with_deadline(limit, backend.create_hypertable(table)).await {
                    tracing::warn!(table = table.name(), error = %e, "Hypertable conversion failed");
                }
            }
            StoreMode::Enabled
        } else {
            StoreMode::Degraded
        };

        metrics::record_store_mode(mode);
        tracing::info!(backend = backend.name(), mode = %mode, "Metrics store initialized");

        let writer = ApiWriter::spawn(
            backend.clone(),
            config.api_queue_capacity,
            config.max_concurrent_writes,
            config.write_timeout(),
        );

        Ok(Self {
            inner: Arc::new(StoreInner {
                backend,
                mode,
                config,
                writer,
            }),
        })
    }

    pub fn mode(&self) -> StoreMode {
        self.inner.mode
    }

    pub fn backend_name(&self) -> &'static str {
        self.inner.backend.name()
    }

    /// Write one system sample, bounded by the write timeout.
    pub async fn record_system_metrics(&self, sample: SystemMetricSample) -> StoreResult<()> {
        let limit = self.inner.config.write_timeout();
        match with_deadline(limit, self.inner.backend.insert_system(&sample)).await {
            Ok(()) => {
                metrics::record_system_sample();
                Ok(())
            }
            Err(e) => {
                metrics::record_write_failure("system", &e);
                Err(e)
            }
        }
    }

    /// Hand an API sample to the background writer and return at once.
    ///
    /// Returns `false` when the sample was dropped because the queue is full.
    /// Write failures are logged by the writer and never reported here.
    pub fn record_api_metric(&self, sample: ApiMetricSample) -> bool {
        self.inner.writer.submit(sample)
    }

    /// Wait for queued API samples to be written or to fail.
    pub async fn flush(&self) {
        self.inner.writer.flush().await
    }

    /// API samples accepted but not yet settled.
    pub fn pending_api_writes(&self) -> usize {
        self.inner.writer.pending()
    }

    /// Request count, average latency and server error rate over `window`.
    pub async fn api_summary(&self, window: Duration) -> StoreResult<ApiSummary> {
        let since = window_start(window);
        self.read(self.inner.backend.api_summary(since)).await
    }

    /// Bucketed averages of `resource` over `window`, oldest bucket first.
    pub async fn resource_trend(&self, resource: Resource, window: Duration) -> StoreResult<Vec<TimePoint>> {
        let since = window_start(window);
        let bucket = self.inner.config.trend_bucket();
        self.read(self.inner.backend.resource_trend(self.inner.mode, resource, since, bucket))
            .await
    }

    pub async fn cpu_trend(&self, window: Duration) -> StoreResult<Vec<TimePoint>> {
        self.resource_trend(Resource::Cpu, window).await
    }

    /// Raw API samples over `window`, newest first.
    pub async fn api_logs(
        &self,
        window: Duration,
        errors_only: bool,
        limit: usize,
        offset: usize,
    ) -> StoreResult<Vec<ApiMetricSample>> {
        let filter = LogFilter {
            since: window_start(window),
            errors_only,
            limit,
            offset,
        };
        self.read(self.inner.backend.api_logs(&filter)).await
    }

    pub async fn endpoint_stats(
        &self,
        window: Duration,
        order: EndpointOrder,
        limit: usize,
    ) -> StoreResult<Vec<EndpointStat>> {
        let since = window_start(window);
        self.read(self.inner.backend.endpoint_stats(since, order, limit)).await
    }

    async fn read<T, F>(&self, fut: F) -> StoreResult<T>
    where
        F: std::future::Future<Output = StoreResult<T>>,
    {
        with_deadline(self.inner.config.read_timeout(), fut).await
    }
}

/// `now - window`, clamped to the Unix epoch.
///
/// PostgreSQL rejects timestamps near `DateTime::MIN_UTC`.
fn window_start(window: Duration) -> DateTime<Utc> {
    let now = Utc::now();
    chrono::Duration::from_std(window)
        .ok()
        .and_then(|w| now.checked_sub_signed(w))
        .filter(|start| *start > DateTime::<Utc>::UNIX_EPOCH)
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}
