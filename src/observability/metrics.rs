//! Pipeline self-metrics.
//!
//! # Metrics
//! - `coldwatch_system_samples_total` (counter): system samples written
//! - `coldwatch_api_samples_dropped_total` (counter): API samples rejected by a full queue
//! - `coldwatch_store_write_failures_total` (counter): failed inserts by `kind` and `reason`
//! - `coldwatch_store_mode` (gauge): 1 = time-series enabled, 0 = degraded

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::store::{StoreError, StoreMode};

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_store_mode(mode: StoreMode) {
    let value = match mode {
        StoreMode::Enabled => 1.0,
        StoreMode::Degraded => 0.0,
    };
    metrics::gauge!("coldwatch_store_mode").set(value);
}

pub fn record_system_sample() {
    metrics::counter!("coldwatch_system_samples_total").increment(1);
}

pub fn record_api_sample_dropped() {
    metrics::counter!("coldwatch_api_samples_dropped_total").increment(1);
}

pub fn record_write_failure(kind: &'static str, error: &StoreError) {
    let reason = match error {
        StoreError::Timeout(_) => "timeout",
        StoreError::Database(_) => "database",
        StoreError::Backend(_) => "backend",
    };
    metrics::counter!("coldwatch_store_write_failures_total", "kind" => kind, "reason" => reason)
        .increment(1);
}
