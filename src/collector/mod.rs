//! Periodic system sample collection.
//!
//! # Data Flow
//! ```text
//! ticker (collector.interval_secs)
//!     → Sampler (cpu, memory, disk)
//!     → SystemMetricSample
//!     → MetricsStore::record_system_metrics (write deadline)
//! ```
//!
//! # Design Decisions
//! - A failed reading becomes zero with a warning; the cycle still writes
//! - A failed write is logged and the sample discarded, no retry
//! - The first sample is taken one interval after start
//! - Stops on the broadcast shutdown signal

use std::path::PathBuf;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::broadcast;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::config::CollectorConfig;
use crate::sampler::Sampler;
use crate::store::{MetricsStore, StoreResult, SystemMetricSample};

pub struct Collector<S> {
    sampler: S,
    store: MetricsStore,
    interval: Duration,
    disk_mount: PathBuf,
    enabled: bool,
}

impl<S: Sampler> Collector<S> {
    pub fn new(sampler: S, store: MetricsStore, config: &CollectorConfig) -> Self {
        Self {
            sampler,
            store,
            interval: Duration::from_secs(config.interval_secs.max(1)),
            disk_mount: PathBuf::from(&config.disk_mount),
            enabled: config.enabled,
        }
    }

    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        if !self.enabled {
            tracing::info!("System metrics collection disabled");
            return;
        }

        tracing::info!(
            interval_secs = self.interval.as_secs(),
            disk_mount = %self.disk_mount.display(),
            "Metrics collector starting"
        );

        let mut ticker = time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.collect_once().await {
                        tracing::error!(error = %e, "Failed to record system metrics");
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Metrics collector received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Take one sample and write it.
    pub async fn collect_once(&mut self) -> StoreResult<()> {
        let sample = self.sample();
        tracing::debug!(
            cpu_percent = sample.cpu_percent,
            mem_used = sample.mem_used,
            disk_used = sample.disk_used,
            "System sample taken"
        );
        self.store.record_system_metrics(sample).await
    }

    /// Build a sample, substituting zero for every reading that fails.
    pub fn sample(&mut self) -> SystemMetricSample {
        let cpu_percent = match self.sampler.sample_cpu() {
            Ok(Some(cpu)) => cpu,
            Ok(None) => 0.0,
            Err(e) => {
                tracing::warn!(error = %e, "CPU reading failed, recording 0");
                0.0
            }
        };

        let (mem_used, mem_total) = self.sampler.sample_memory().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Memory reading failed, recording 0");
            (0, 0)
        });

        let (disk_used, disk_total) = self
            .sampler
            .sample_disk(&self.disk_mount)
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Disk reading failed, recording 0");
                (0, 0)
            });

        SystemMetricSample {
            timestamp: Utc::now(),
            cpu_percent,
            mem_used,
            mem_total,
            disk_used,
            disk_total,
        }
    }
}
