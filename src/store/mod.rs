//! Metrics storage subsystem.
//!
//! # Data Flow
//! ```text
//! Collector ──record_system_metrics (awaited, deadline)──▶ MetricsStore ──▶ backend
//! Middleware ──record_api_metric (returns at once)──▶ writer.rs queue ──▶ backend
//! AnalyticsReader ──api_summary / resource_trend / ...──▶ MetricsStore ──▶ backend
//!
//! Backends (backend.rs trait):
//!     postgres.rs  TimescaleDB when available, plain tables otherwise
//!     memory.rs    bounded ring buffers, no database configured
//! ```
//!
//! # Design Decisions
//! - Mode (`Enabled`/`Degraded`) is probed once in `init` and stored as a value
//! - Reads return the same rows in both modes; only the bucketing SQL differs
//! - Every backend call carries its own deadline
//! - Write failures are dropped samples, read failures are errors

pub mod backend;
pub mod error;
pub mod memory;
pub mod metrics_store;
pub mod postgres;
pub mod types;
mod writer;

pub use backend::MetricsBackend;
pub use error::{StoreError, StoreResult};
pub use memory::MemoryBackend;
pub use metrics_store::MetricsStore;
pub use postgres::PgBackend;
pub use types::{
    ApiMetricSample, ApiSummary, EndpointOrder, EndpointStat, LogFilter, Resource, StoreMode,
    SystemMetricSample, Table, TimePoint,
};
