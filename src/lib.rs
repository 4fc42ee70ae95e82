//! Observability pipeline for the cold-storage backend.
//!
//! Host resource samples and per-request API samples flow into a
//! [`store::MetricsStore`] backed by TimescaleDB, plain PostgreSQL or
//! memory, and are read back as summaries and time-bucketed trends.

pub mod admin;
pub mod analytics;
pub mod collector;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod sampler;
pub mod store;

pub use analytics::AnalyticsReader;
pub use config::TelemetryConfig;
pub use http::{HttpServer, Instrumentation};
pub use lifecycle::Shutdown;
pub use store::{MetricsStore, StoreMode};
