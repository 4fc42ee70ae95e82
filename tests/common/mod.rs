//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use coldwatch::config::{StoreConfig, TelemetryConfig};
use coldwatch::sampler::{Sampler, SamplerError};
use coldwatch::store::{
    ApiMetricSample, ApiSummary, EndpointOrder, EndpointStat, LogFilter, MemoryBackend,
    MetricsBackend, MetricsStore, Resource, StoreError, StoreMode, StoreResult,
    SystemMetricSample, Table, TimePoint,
};

/// In-memory backend with programmable extension support, latency and
/// failures. Stands in for PostgreSQL with or without TimescaleDB.
pub struct TestBackend {
    inner: MemoryBackend,
    extension_available: bool,
    extension_active: bool,
    write_delay: Duration,
    read_delay: Duration,
    fail_writes: bool,
    fail_reads: bool,
    fail_schema: bool,
    pub create_tables_calls: AtomicUsize,
    pub api_inserts: AtomicUsize,
    pub hypertables: Mutex<Vec<Table>>,
}

impl TestBackend {
    /// Plain tables, no extension.
    pub fn plain() -> Self {
        Self {
            inner: MemoryBackend::new(10_000),
            extension_available: false,
            extension_active: false,
            write_delay: Duration::ZERO,
            read_delay: Duration::ZERO,
            fail_writes: false,
            fail_reads: false,
            fail_schema: false,
            create_tables_calls: AtomicUsize::new(0),
            api_inserts: AtomicUsize::new(0),
            hypertables: Mutex::new(Vec::new()),
        }
    }

    /// Extension installed and active.
    pub fn time_series() -> Self {
        Self {
            extension_available: true,
            extension_active: true,
            ..Self::plain()
        }
    }

    /// Extension listed but activation has no effect.
    pub fn broken_extension() -> Self {
        Self {
            extension_available: true,
            extension_active: false,
            ..Self::plain()
        }
    }

    pub fn with_write_delay(mut self, delay: Duration) -> Self {
        self.write_delay = delay;
        self
    }

    pub fn with_read_delay(mut self, delay: Duration) -> Self {
        self.read_delay = delay;
        self
    }

    pub fn failing_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }

    pub fn failing_reads(mut self) -> Self {
        self.fail_reads = true;
        self
    }

    pub fn failing_schema(mut self) -> Self {
        self.fail_schema = true;
        self
    }

    pub fn stored(&self, table: Table) -> usize {
        self.inner.len(table)
    }

    async fn before_write(&self) -> StoreResult<()> {
        if !self.write_delay.is_zero() {
            tokio::time::sleep(self.write_delay).await;
        }
        if self.fail_writes {
            return Err(StoreError::Backend("injected write failure".into()));
        }
        Ok(())
    }

    async fn before_read(&self) -> StoreResult<()> {
        if !self.read_delay.is_zero() {
            tokio::time::sleep(self.read_delay).await;
        }
        if self.fail_reads {
            return Err(StoreError::Backend("injected read failure".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl MetricsBackend for TestBackend {
    fn name(&self) -> &'static str {
        "test"
    }

    async fn extension_available(&self) -> StoreResult<bool> {
        Ok(self.extension_available)
    }

    async fn activate_extension(&self) -> StoreResult<()> {
        if self.extension_active {
            Ok(())
        } else {
            Err(StoreError::Backend("permission denied to create extension".into()))
        }
    }

    async fn extension_active(&self) -> StoreResult<bool> {
        Ok(self.extension_active)
    }

    async fn create_tables(&self) -> StoreResult<()> {
        self.create_tables_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_schema {
            return Err(StoreError::Backend("relation cannot be created".into()));
        }
        Ok(())
    }

    async fn create_hypertable(&self, table: Table) -> StoreResult<()> {
        let mut tables = self.hypertables.lock().unwrap();
        if !tables.contains(&table) {
            tables.push(table);
        }
        Ok(())
    }

    async fn insert_system(&self, sample: &SystemMetricSample) -> StoreResult<()> {
        self.before_write().await?;
        self.inner.insert_system(sample).await
    }

    async fn insert_api(&self, sample: &ApiMetricSample) -> StoreResult<()> {
        self.before_write().await?;
        self.api_inserts.fetch_add(1, Ordering::SeqCst);
        self.inner.insert_api(sample).await
    }

    async fn api_summary(&self, since: DateTime<Utc>) -> StoreResult<ApiSummary> {
        self.before_read().await?;
        self.inner.api_summary(since).await
    }

    async fn resource_trend(
        &self,
        mode: StoreMode,
        resource: Resource,
        since: DateTime<Utc>,
        bucket: Duration,
    ) -> StoreResult<Vec<TimePoint>> {
        self.before_read().await?;
        self.inner.resource_trend(mode, resource, since, bucket).await
    }

    async fn api_logs(&self, filter: &LogFilter) -> StoreResult<Vec<ApiMetricSample>> {
        self.before_read().await?;
        self.inner.api_logs(filter).await
    }

    async fn endpoint_stats(
        &self,
        since: DateTime<Utc>,
        order: EndpointOrder,
        limit: usize,
    ) -> StoreResult<Vec<EndpointStat>> {
        self.before_read().await?;
        self.inner.endpoint_stats(since, order, limit).await
    }
}

/// Sampler returning fixed readings; `None` fields fail.
pub struct FakeSampler {
    pub cpu: Option<f64>,
    pub memory: Option<(u64, u64)>,
    pub disk: Option<(u64, u64)>,
}

impl Sampler for FakeSampler {
    fn sample_cpu(&mut self) -> Result<Option<f64>, SamplerError> {
        Ok(self.cpu)
    }

    fn sample_memory(&mut self) -> Result<(u64, u64), SamplerError> {
        self.memory.ok_or(SamplerError::Unavailable("memory"))
    }

    fn sample_disk(&mut self, mount: &Path) -> Result<(u64, u64), SamplerError> {
        self.disk
            .ok_or_else(|| SamplerError::MountNotFound(mount.to_path_buf()))
    }
}

/// Store settings with short deadlines for tests.
pub fn fast_store_config() -> StoreConfig {
    StoreConfig {
        write_timeout_ms: 100,
        read_timeout_ms: 200,
        ..StoreConfig::default()
    }
}

pub fn test_config() -> TelemetryConfig {
    let mut config = TelemetryConfig::default();
    config.store = fast_store_config();
    config.admin.enabled = true;
    config.admin.api_key = "test-admin-key".into();
    config
}

pub async fn store_on(backend: Arc<TestBackend>, config: StoreConfig) -> MetricsStore {
    MetricsStore::init(backend, config).await.unwrap()
}

pub fn system_sample(cpu: f64, at: DateTime<Utc>) -> SystemMetricSample {
    SystemMetricSample {
        timestamp: at,
        cpu_percent: cpu,
        mem_used: 2 * 1024,
        mem_total: 8 * 1024,
        disk_used: 30,
        disk_total: 120,
    }
}

pub fn api_sample(path: &str, status: u16, ms: u64) -> ApiMetricSample {
    ApiMetricSample::new("GET", path, status, Duration::from_millis(ms), "192.0.2.10")
}
