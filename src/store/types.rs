//! Sample and aggregate types shared by every backend.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Operating mode of the store, fixed at initialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreMode {
    /// Time-series extension active; tables are time-partitioned.
    Enabled,
    /// Plain relational tables with the same schema.
    Degraded,
}

impl fmt::Display for StoreMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreMode::Enabled => f.write_str("enabled"),
            StoreMode::Degraded => f.write_str("degraded"),
        }
    }
}

/// The two append-only tables owned by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    System,
    Api,
}

impl Table {
    pub const ALL: [Table; 2] = [Table::System, Table::Api];

    pub fn name(&self) -> &'static str {
        match self {
            Table::System => "metrics_system",
            Table::Api => "metrics_api",
        }
    }
}

/// One host resource snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemMetricSample {
    pub timestamp: DateTime<Utc>,
    pub cpu_percent: f64,
    pub mem_used: u64,
    pub mem_total: u64,
    pub disk_used: u64,
    pub disk_total: u64,
}

impl SystemMetricSample {
    /// Memory usage as a percentage, `None` when the total is unknown.
    pub fn mem_percent(&self) -> Option<f64> {
        percent(self.mem_used, self.mem_total)
    }

    /// Disk usage as a percentage, `None` when the total is unknown.
    pub fn disk_percent(&self) -> Option<f64> {
        percent(self.disk_used, self.disk_total)
    }
}

fn percent(used: u64, total: u64) -> Option<f64> {
    (total > 0).then(|| used as f64 / total as f64 * 100.0)
}

/// One observed HTTP request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiMetricSample {
    pub timestamp: DateTime<Utc>,
    pub method: String,
    pub path: String,
    pub status_code: u16,
    pub duration_ms: f64,
    pub ip_address: String,
}

impl ApiMetricSample {
    /// Build a sample stamped with the current time.
    pub fn new(
        method: impl Into<String>,
        path: impl Into<String>,
        status_code: u16,
        duration: Duration,
        ip_address: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            method: method.into(),
            path: path.into(),
            status_code,
            duration_ms: duration.as_secs_f64() * 1000.0,
            ip_address: ip_address.into(),
        }
    }

    /// Counted against the summary error rate.
    pub fn is_server_error(&self) -> bool {
        self.status_code >= 500
    }

    /// Counted by the log filter and per-endpoint error counts.
    pub fn is_error(&self) -> bool {
        self.status_code >= 400
    }
}

/// Request summary over a window.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiSummary {
    pub total_requests: i64,
    pub success_requests: i64,
    pub avg_duration_ms: f64,
    pub p95_duration_ms: f64,
    pub error_rate: f64,
}

/// One bucket of a trend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimePoint {
    pub time: DateTime<Utc>,
    pub value: f64,
}

/// Per-path request statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EndpointStat {
    pub path: String,
    pub total_requests: i64,
    pub avg_duration_ms: f64,
    pub p95_duration_ms: f64,
    pub max_duration_ms: f64,
    pub error_count: i64,
}

/// Host resource a trend is computed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Resource {
    /// Average CPU percent.
    Cpu,
    /// Average memory used, percent of total.
    Memory,
    /// Average disk used, percent of total.
    Disk,
}

impl Resource {
    /// The value this resource contributes to a bucket average.
    pub fn value_of(&self, sample: &SystemMetricSample) -> Option<f64> {
        match self {
            Resource::Cpu => Some(sample.cpu_percent),
            Resource::Memory => sample.mem_percent(),
            Resource::Disk => sample.disk_percent(),
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resource::Cpu => f.write_str("cpu"),
            Resource::Memory => f.write_str("memory"),
            Resource::Disk => f.write_str("disk"),
        }
    }
}

impl FromStr for Resource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cpu" => Ok(Resource::Cpu),
            "memory" | "mem" => Ok(Resource::Memory),
            "disk" => Ok(Resource::Disk),
            other => Err(format!("unknown resource '{}'", other)),
        }
    }
}

/// Ordering for endpoint rankings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointOrder {
    /// Highest request count first.
    MostRequested,
    /// Highest average duration first.
    Slowest,
}

/// Selection of raw API samples, newest first.
#[derive(Debug, Clone, PartialEq)]
pub struct LogFilter {
    pub since: DateTime<Utc>,
    pub errors_only: bool,
    pub limit: usize,
    pub offset: usize,
}
