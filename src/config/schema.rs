//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the pipeline.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the telemetry pipeline.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct TelemetryConfig {
    /// HTTP server settings.
    pub server: ServerConfig,

    /// Database connection settings.
    pub database: DatabaseConfig,

    /// Metrics store tunables.
    pub store: StoreConfig,

    /// Host sampling loop.
    pub collector: CollectorConfig,

    /// Per-request instrumentation.
    pub instrumentation: InstrumentationConfig,

    /// Logging and self-metrics.
    pub observability: ObservabilityConfig,

    #[serde(default)]
    pub admin: AdminConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Request timeout (total time for request/response) in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Postgres connection URL. When absent, samples are kept in memory.
    pub url: Option<String>,

    /// Maximum pooled connections.
    pub max_connections: u32,

    /// Connection acquisition timeout in seconds.
    pub connect_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 5,
            connect_timeout_secs: 5,
        }
    }
}

/// Metrics store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Deadline for a single insert, in milliseconds.
    pub write_timeout_ms: u64,

    /// Deadline for a single analytics query, in milliseconds.
    pub read_timeout_ms: u64,

    /// Width of a trend bucket in seconds.
    pub trend_bucket_secs: u64,

    /// Samples retained per table by the in-memory backend.
    pub memory_capacity: usize,

    /// API samples waiting to be written before new ones are dropped.
    pub api_queue_capacity: usize,

    /// API inserts allowed in flight at once.
    pub max_concurrent_writes: usize,
}

impl StoreConfig {
    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn trend_bucket(&self) -> Duration {
        Duration::from_secs(self.trend_bucket_secs)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            write_timeout_ms: 2_000,
            read_timeout_ms: 10_000,
            trend_bucket_secs: 60,
            memory_capacity: 1_000,
            api_queue_capacity: 1_024,
            max_concurrent_writes: 8,
        }
    }
}

/// Host sampling configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CollectorConfig {
    /// Enable the background sampler.
    pub enabled: bool,

    /// Sampling interval in seconds.
    pub interval_secs: u64,

    /// Mount point whose usage is reported as disk usage.
    pub disk_mount: String,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 10,
            disk_mount: "/".to_string(),
        }
    }
}

/// Request instrumentation configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct InstrumentationConfig {
    /// Path prefixes that are not recorded. Empty records every request.
    pub exclude_prefixes: Vec<String>,

    /// Resolve the client address from proxy headers before the socket peer.
    pub trust_forwarded_headers: bool,

    /// Longest recorded path, in characters. Longer paths are cut, not
    /// normalized: ids and slugs stay as they arrived.
    pub max_path_len: usize,
}

impl Default for InstrumentationConfig {
    fn default() -> Self {
        Self {
            exclude_prefixes: Vec::new(),
            trust_forwarded_headers: false,
            max_path_len: 500,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log line format.
    pub log_format: LogFormat,

    /// Enable the Prometheus endpoint for pipeline self-metrics.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Shipped `api_key` value; rejected while the admin routes are enabled.
pub const PLACEHOLDER_ADMIN_KEY: &str = "CHANGE_ME_IN_PRODUCTION";

/// Reporting routes configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Mount the `/admin` reporting routes. Requires a real `api_key`.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: PLACEHOLDER_ADMIN_KEY.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: TelemetryConfig = toml::from_str(
            r#"
            [store]
            write_timeout_ms = 500

            [instrumentation]
            exclude_prefixes = ["/static/"]
            "#,
        )
        .unwrap();

        assert_eq!(config.store.write_timeout(), Duration::from_millis(500));
        assert_eq!(config.store.trend_bucket(), Duration::from_secs(60));
        assert_eq!(config.collector.interval_secs, 10);
        assert_eq!(config.instrumentation.exclude_prefixes, vec!["/static/"]);
        assert!(config.database.url.is_none());
        assert_eq!(config.instrumentation.max_path_len, 500);
        assert!(!config.admin.enabled);
    }

    #[test]
    fn test_log_format_lowercase() {
        let config: ObservabilityConfig = toml::from_str(r#"log_format = "json""#).unwrap();
        assert_eq!(config.log_format, LogFormat::Json);
    }
}
