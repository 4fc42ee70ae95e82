//! Startup orchestration.
//!
//! # Responsibilities
//! - Choose the store backend from the database section
//! - Initialize the store (schema, mode) before any traffic is accepted
//!
//! # Design Decisions
//! - No database URL: in-memory backend
//! - Database unreachable or schema setup failing: logged, in-memory backend
//! - The server keeps serving either way; only the reporting data differs

use std::sync::Arc;

use crate::config::TelemetryConfig;
use crate::store::{MemoryBackend, MetricsStore, PgBackend, StoreResult};

/// Open the metrics store described by `config`.
pub async fn open_store(config: &TelemetryConfig) -> StoreResult<MetricsStore> {
    if let Some(url) = config.database.url.as_deref() {
        match connect_postgres(url, config).await {
            Ok(store) => return Ok(store),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    "Metrics database unavailable, falling back to in-memory store"
                );
            }
        }
    } else {
        tracing::info!("No metrics database configured, using in-memory store");
    }

    open_memory_store(config).await
}

async fn connect_postgres(url: &str, config: &TelemetryConfig) -> StoreResult<MetricsStore> {
    let backend = PgBackend::connect(url, &config.database).await?;
    MetricsStore::init(Arc::new(backend), config.store.clone()).await
}

async fn open_memory_store(config: &TelemetryConfig) -> StoreResult<MetricsStore> {
    let backend = MemoryBackend::new(config.store.memory_capacity);
    MetricsStore::init(Arc::new(backend), config.store.clone()).await
}
