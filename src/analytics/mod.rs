//! Analytics read façade.
//!
//! # Data Flow
//! ```text
//! reporting route (admin/handlers.rs)
//!     → window.rs (parse "5m", "1h", ...)
//!     → AnalyticsReader::get_*
//!     → MetricsStore read path (read deadline)
//! ```
//!
//! The reader holds no state of its own. Store errors pass through
//! unchanged so the caller can tell an empty window from a failed query.

pub mod window;

use std::time::Duration;

use crate::store::{
    ApiMetricSample, ApiSummary, EndpointOrder, EndpointStat, MetricsStore, Resource, StoreMode,
    StoreResult, TimePoint,
};

pub use window::{format_window, parse_window, WindowError, DEFAULT_WINDOW};

#[derive(Clone)]
pub struct AnalyticsReader {
    store: MetricsStore,
}

impl AnalyticsReader {
    pub fn new(store: MetricsStore) -> Self {
        Self { store }
    }

    pub fn mode(&self) -> StoreMode {
        self.store.mode()
    }

    pub fn backend_name(&self) -> &'static str {
        self.store.backend_name()
    }

    pub async fn get_api_summary(&self, window: Duration) -> StoreResult<ApiSummary> {
        self.store.api_summary(window).await
    }

    pub async fn get_cpu_trend(&self, window: Duration) -> StoreResult<Vec<TimePoint>> {
        self.store.cpu_trend(window).await
    }

    pub async fn get_memory_trend(&self, window: Duration) -> StoreResult<Vec<TimePoint>> {
        self.store.resource_trend(Resource::Memory, window).await
    }

    pub async fn get_disk_trend(&self, window: Duration) -> StoreResult<Vec<TimePoint>> {
        self.store.resource_trend(Resource::Disk, window).await
    }

    pub async fn get_trend(&self, resource: Resource, window: Duration) -> StoreResult<Vec<TimePoint>> {
        self.store.resource_trend(resource, window).await
    }

    /// Newest first.
    pub async fn get_api_logs(
        &self,
        window: Duration,
        errors_only: bool,
        limit: usize,
        offset: usize,
    ) -> StoreResult<Vec<ApiMetricSample>> {
        self.store.api_logs(window, errors_only, limit, offset).await
    }

    pub async fn get_top_endpoints(&self, window: Duration, limit: usize) -> StoreResult<Vec<EndpointStat>> {
        self.store
            .endpoint_stats(window, EndpointOrder::MostRequested, limit)
            .await
    }

    pub async fn get_slowest_endpoints(&self, window: Duration, limit: usize) -> StoreResult<Vec<EndpointStat>> {
        self.store
            .endpoint_stats(window, EndpointOrder::Slowest, limit)
            .await
    }
}
