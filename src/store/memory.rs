//! In-memory backend.
//!
//! Used when no database is configured. Each table is a bounded ring buffer;
//! once full, the oldest sample is evicted. There is no time-series
//! extension here, so a store on this backend always runs degraded.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::store::backend::MetricsBackend;
use crate::store::error::{StoreError, StoreResult};
use crate::store::types::{
    ApiMetricSample, ApiSummary, EndpointOrder, EndpointStat, LogFilter, Resource, StoreMode,
    SystemMetricSample, Table, TimePoint,
};

const P95: f64 = 0.95;

pub struct MemoryBackend {
    capacity: usize,
    system: RwLock<VecDeque<SystemMetricSample>>,
    api: RwLock<VecDeque<ApiMetricSample>>,
}

impl MemoryBackend {
    /// Create a backend keeping at most `capacity` samples per table.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            system: RwLock::new(VecDeque::with_capacity(capacity)),
            api: RwLock::new(VecDeque::with_capacity(capacity)),
        }
    }

    /// Number of retained samples per table.
    pub fn len(&self, table: Table) -> usize {
        match table {
            Table::System => self.system.read().map(|s| s.len()).unwrap_or(0),
            Table::Api => self.api.read().map(|s| s.len()).unwrap_or(0),
        }
    }

    fn read<T>(lock: &RwLock<T>) -> StoreResult<RwLockReadGuard<'_, T>> {
        lock.read()
            .map_err(|_| StoreError::Backend("memory backend lock poisoned".into()))
    }

    fn write<T>(lock: &RwLock<T>) -> StoreResult<RwLockWriteGuard<'_, T>> {
        lock.write()
            .map_err(|_| StoreError::Backend("memory backend lock poisoned".into()))
    }

    fn push<T>(&self, buffer: &RwLock<VecDeque<T>>, item: T) -> StoreResult<()> {
        let mut buffer = Self::write(buffer)?;
        if buffer.len() == self.capacity {
            buffer.pop_front();
        }
        buffer.push_back(item);
        Ok(())
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new(1_000)
    }
}

/// Start of the epoch-aligned bucket containing `ts`.
pub(crate) fn bucket_start(ts: DateTime<Utc>, bucket: Duration) -> DateTime<Utc> {
    let width = i64::try_from(bucket.as_millis()).unwrap_or(i64::MAX).max(1);
    let start = ts.timestamp_millis().div_euclid(width) * width;
    DateTime::from_timestamp_millis(start).unwrap_or(ts)
}

/// Continuous percentile with linear interpolation between neighbours.
/// `sorted` must be ascending.
pub(crate) fn percentile_cont(sorted: &[f64], fraction: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = fraction.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    sorted[lower] + (sorted[upper] - sorted[lower]) * (rank - lower as f64)
}

#[derive(Default)]
struct PathAgg {
    total: i64,
    errors: i64,
    sum: f64,
    max: f64,
    durations: Vec<f64>,
}

#[async_trait]
impl MetricsBackend for MemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn extension_available(&self) -> StoreResult<bool> {
        Ok(false)
    }

    async fn activate_extension(&self) -> StoreResult<()> {
        Err(StoreError::Backend("time-series extension not supported in memory".into()))
    }

    async fn extension_active(&self) -> StoreResult<bool> {
        Ok(false)
    }

    async fn create_tables(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn create_hypertable(&self, table: Table) -> StoreResult<()> {
        Err(StoreError::Backend(format!(
            "{} cannot be partitioned in memory",
            table.name()
        )))
    }

    async fn insert_system(&self, sample: &SystemMetricSample) -> StoreResult<()> {
        self.push(&self.system, sample.clone())
    }

    async fn insert_api(&self, sample: &ApiMetricSample) -> StoreResult<()> {
        self.push(&self.api, sample.clone())
    }

    async fn api_summary(&self, since: DateTime<Utc>) -> StoreResult<ApiSummary> {
        let api = Self::read(&self.api)?;

        let mut total = 0i64;
        let mut server_errors = 0i64;
        let mut sum = 0.0;
        let mut durations = Vec::new();
        for sample in api.iter().filter(|s| s.timestamp > since) {
            total += 1;
            sum += sample.duration_ms;
            durations.push(sample.duration_ms);
            if sample.is_server_error() {
                server_errors += 1;
            }
        }

        let mut summary = ApiSummary {
            total_requests: total,
            success_requests: total - server_errors,
            ..ApiSummary::default()
        };
        if total > 0 {
            durations.sort_by(f64::total_cmp);
            summary.avg_duration_ms = sum / total as f64;
            summary.p95_duration_ms = percentile_cont(&durations, P95);
            summary.error_rate = server_errors as f64 / total as f64;
        }
        Ok(summary)
    }

    async fn resource_trend(
        &self,
        _mode: StoreMode,
        resource: Resource,
        since: DateTime<Utc>,
        bucket: Duration,
    ) -> StoreResult<Vec<TimePoint>> {
        let system = Self::read(&self.system)?;

        let mut buckets: BTreeMap<DateTime<Utc>, (f64, u64)> = BTreeMap::new();
        for sample in system.iter().filter(|s| s.timestamp > since) {
            let entry = buckets.entry(bucket_start(sample.timestamp, bucket)).or_default();
            if let Some(value) = resource.value_of(sample) {
                entry.0 += value;
                entry.1 += 1;
            }
        }

        Ok(buckets
            .into_iter()
            .map(|(time, (sum, count))| TimePoint {
                time,
                value: if count > 0 { sum / count as f64 } else { 0.0 },
            })
            .collect())
    }

    async fn api_logs(&self, filter: &LogFilter) -> StoreResult<Vec<ApiMetricSample>> {
        let api = Self::read(&self.api)?;

        let mut logs: Vec<ApiMetricSample> = api
            .iter()
            .filter(|s| s.timestamp > filter.since)
            .filter(|s| !filter.errors_only || s.is_error())
            .cloned()
            .collect();
        logs.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        Ok(logs.into_iter().skip(filter.offset).take(filter.limit).collect())
    }

    async fn endpoint_stats(
        &self,
        since: DateTime<Utc>,
        order: EndpointOrder,
        limit: usize,
    ) -> StoreResult<Vec<EndpointStat>> {
        let api = Self::read(&self.api)?;

        let mut by_path: HashMap<&str, PathAgg> = HashMap::new();
        for sample in api.iter().filter(|s| s.timestamp > since) {
            let agg = by_path.entry(sample.path.as_str()).or_default();
            agg.total += 1;
            agg.sum += sample.duration_ms;
            agg.max = agg.max.max(sample.duration_ms);
            agg.durations.push(sample.duration_ms);
            if sample.is_error() {
                agg.errors += 1;
            }
        }

        let mut stats: Vec<EndpointStat> = by_path
            .into_iter()
            .map(|(path, mut agg)| {
                agg.durations.sort_by(f64::total_cmp);
                EndpointStat {
                    path: path.to_string(),
                    total_requests: agg.total,
                    avg_duration_ms: agg.sum / agg.total as f64,
                    p95_duration_ms: percentile_cont(&agg.durations, P95),
                    max_duration_ms: agg.max,
                    error_count: agg.errors,
                }
            })
            .collect();

        match order {
            EndpointOrder::MostRequested => stats.sort_by(|a, b| {
                b.total_requests.cmp(&a.total_requests).then_with(|| a.path.cmp(&b.path))
            }),
            EndpointOrder::Slowest => stats.sort_by(|a, b| {
                b.avg_duration_ms
                    .total_cmp(&a.avg_duration_ms)
                    .then_with(|| a.path.cmp(&b.path))
            }),
        }
        stats.truncate(limit);
        Ok(stats)
    }
}
