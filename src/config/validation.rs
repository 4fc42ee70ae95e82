//! Configuration validation.
//!
//! Serde handles syntax; this module checks value ranges and addresses.
//! Every problem is reported, not just the first.

use std::net::SocketAddr;

use crate::config::schema::{TelemetryConfig, PLACEHOLDER_ADMIN_KEY};

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Validate a parsed configuration.
pub fn validate_config(config: &TelemetryConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "server.bind_address",
            format!("'{}' is not a socket address", config.server.bind_address),
        ));
    }
    if config.server.request_timeout_secs == 0 {
        errors.push(ValidationError::new("server.request_timeout_secs", "must be > 0"));
    }

    if let Some(url) = &config.database.url {
        if !(url.starts_with("postgres://") || url.starts_with("postgresql://")) {
            errors.push(ValidationError::new("database.url", "must be a postgres:// URL"));
        }
    }
    if config.database.max_connections == 0 {
        errors.push(ValidationError::new("database.max_connections", "must be > 0"));
    }

    if config.store.write_timeout_ms == 0 {
        errors.push(ValidationError::new("store.write_timeout_ms", "must be > 0"));
    }
    if config.store.read_timeout_ms == 0 {
        errors.push(ValidationError::new("store.read_timeout_ms", "must be > 0"));
    }
    if config.store.trend_bucket_secs == 0 {
        errors.push(ValidationError::new("store.trend_bucket_secs", "must be > 0"));
    }
    if config.store.memory_capacity == 0 {
        errors.push(ValidationError::new("store.memory_capacity", "must be > 0"));
    }
    if config.store.api_queue_capacity == 0 {
        errors.push(ValidationError::new("store.api_queue_capacity", "must be > 0"));
    }
    if config.store.max_concurrent_writes == 0 {
        errors.push(ValidationError::new("store.max_concurrent_writes", "must be > 0"));
    }

    if config.collector.interval_secs == 0 {
        errors.push(ValidationError::new("collector.interval_secs", "must be > 0"));
    }
    if config.collector.disk_mount.is_empty() {
        errors.push(ValidationError::new("collector.disk_mount", "must not be empty"));
    }

    if config.instrumentation.exclude_prefixes.iter().any(|p| !p.starts_with('/')) {
        errors.push(ValidationError::new(
            "instrumentation.exclude_prefixes",
            "every prefix must start with '/'",
        ));
    }
    if config.instrumentation.max_path_len == 0 {
        errors.push(ValidationError::new("instrumentation.max_path_len", "must be > 0"));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if config.admin.enabled {
        let key = config.admin.api_key.trim();
        if key.is_empty() {
            errors.push(ValidationError::new("admin.api_key", "must not be empty when admin is enabled"));
        } else if key == PLACEHOLDER_ADMIN_KEY {
            errors.push(ValidationError::new(
                "admin.api_key",
                "still set to the shipped placeholder; choose a real key or disable admin",
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
