//! Backend capability consumed by the store.
//!
//! A backend executes fixed statements with bound parameters against some
//! storage. It knows nothing about deadlines or modes beyond what each call
//! receives; the store wraps every call in its own timeout.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::store::error::StoreResult;
use crate::store::types::{
    ApiMetricSample, ApiSummary, EndpointOrder, EndpointStat, LogFilter, Resource, StoreMode,
    SystemMetricSample, Table, TimePoint,
};

#[async_trait]
pub trait MetricsBackend: Send + Sync + 'static {
    /// Short name for logs and status output.
    fn name(&self) -> &'static str;

    /// Whether the time-series extension can be installed.
    async fn extension_available(&self) -> StoreResult<bool>;

    /// Install the time-series extension.
    async fn activate_extension(&self) -> StoreResult<()>;

    /// Whether the time-series extension is installed right now.
    async fn extension_active(&self) -> StoreResult<bool>;

    /// Create both tables and their time indexes. Must be idempotent.
    async fn create_tables(&self) -> StoreResult<()>;

    /// Convert a table to a time-partitioned table. Must be idempotent.
    async fn create_hypertable(&self, table: Table) -> StoreResult<()>;

    async fn insert_system(&self, sample: &SystemMetricSample) -> StoreResult<()>;

    async fn insert_api(&self, sample: &ApiMetricSample) -> StoreResult<()>;

    /// Aggregate API samples newer than `since`.
    async fn api_summary(&self, since: DateTime<Utc>) -> StoreResult<ApiSummary>;

    /// Bucketed average of `resource` over system samples newer than
    /// `since`, ascending by bucket. Buckets are aligned to the Unix epoch.
    async fn resource_trend(
        &self,
        mode: StoreMode,
        resource: Resource,
        since: DateTime<Utc>,
        bucket: Duration,
    ) -> StoreResult<Vec<TimePoint>>;

    async fn api_logs(&self, filter: &LogFilter) -> StoreResult<Vec<ApiMetricSample>>;

    async fn endpoint_stats(
        &self,
        since: DateTime<Utc>,
        order: EndpointOrder,
        limit: usize,
    ) -> StoreResult<Vec<EndpointStat>>;
}
