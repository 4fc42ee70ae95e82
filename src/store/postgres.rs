//! Postgres backend, with optional TimescaleDB.
//!
//! Every statement is a compile-time constant; values are always bound.
//! The same schema serves both modes. In `Enabled` mode trends bucket with
//! `time_bucket`, in `Degraded` mode with epoch arithmetic; both align
//! buckets to the Unix epoch so the two produce the same rows.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;

use crate::config::DatabaseConfig;
use crate::store::backend::MetricsBackend;
use crate::store::error::StoreResult;
use crate::store::types::{
    ApiMetricSample, ApiSummary, EndpointOrder, EndpointStat, LogFilter, Resource, StoreMode,
    SystemMetricSample, Table, TimePoint,
};

const PROBE_EXTENSION: &str =
    "SELECT default_version FROM pg_available_extensions WHERE name = 'timescaledb'";

const CREATE_EXTENSION: &str = "CREATE EXTENSION IF NOT EXISTS timescaledb CASCADE";

const EXTENSION_ACTIVE: &str = "SELECT extversion FROM pg_extension WHERE extname = 'timescaledb'";

const SCHEMA: [&str; 4] = [
    "CREATE TABLE IF NOT EXISTS metrics_system (
        time        TIMESTAMPTZ      NOT NULL,
        cpu_percent DOUBLE PRECISION NOT NULL,
        mem_used    BIGINT           NOT NULL,
        mem_total   BIGINT           NOT NULL,
        disk_used   BIGINT           NOT NULL,
        disk_total  BIGINT           NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS metrics_system_time_range_idx ON metrics_system (time DESC)",
    "CREATE TABLE IF NOT EXISTS metrics_api (
        time        TIMESTAMPTZ      NOT NULL,
        method      TEXT             NOT NULL,
        path        TEXT             NOT NULL,
        status_code INTEGER          NOT NULL,
        duration_ms DOUBLE PRECISION NOT NULL,
        ip_address  TEXT             NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS metrics_api_time_range_idx ON metrics_api (time DESC)",
];

const HYPERTABLE_SYSTEM: &str =
    "SELECT create_hypertable('metrics_system', 'time', if_not_exists => TRUE)";
const HYPERTABLE_API: &str =
    "SELECT create_hypertable('metrics_api', 'time', if_not_exists => TRUE)";

const INSERT_SYSTEM: &str = "INSERT INTO metrics_system
    (time, cpu_percent, mem_used, mem_total, disk_used, disk_total)
    VALUES ($1, $2, $3, $4, $5, $6)";

const INSERT_API: &str = "INSERT INTO metrics_api
    (time, method, path, status_code, duration_ms, ip_address)
    VALUES ($1, $2, $3, $4, $5, $6)";

const API_SUMMARY: &str = "SELECT
        COUNT(*) AS total,
        COUNT(*) FILTER (WHERE status_code < 500) AS success,
        COALESCE(AVG(duration_ms), 0)::float8 AS avg_dur,
        COALESCE(percentile_cont(0.95) WITHIN GROUP (ORDER BY duration_ms), 0)::float8 AS p95_dur,
        COALESCE(SUM(CASE WHEN status_code >= 500 THEN 1 ELSE 0 END)::float8
            / NULLIF(COUNT(*), 0), 0)::float8 AS err_rate
    FROM metrics_api
    WHERE time > $1";

macro_rules! trend_sql {
    ($bucket:literal, $value:literal) => {
        concat!(
            "SELECT ",
            $bucket,
            " AS bucket, COALESCE(AVG(",
            $value,
            "), 0)::float8 AS value FROM metrics_system WHERE time > $1 GROUP BY bucket ORDER BY bucket"
        )
    };
}

const CPU_TREND_BUCKETED: &str = trend_sql!(
    "time_bucket(make_interval(secs => $2), time, TIMESTAMPTZ 'epoch')",
    "cpu_percent"
);
const MEMORY_TREND_BUCKETED: &str = trend_sql!(
    "time_bucket(make_interval(secs => $2), time, TIMESTAMPTZ 'epoch')",
    "mem_used::float8 / NULLIF(mem_total, 0) * 100"
);
const DISK_TREND_BUCKETED: &str = trend_sql!(
    "time_bucket(make_interval(secs => $2), time, TIMESTAMPTZ 'epoch')",
    "disk_used::float8 / NULLIF(disk_total, 0) * 100"
);
const CPU_TREND_PLAIN: &str = trend_sql!(
    "to_timestamp(floor(extract(epoch FROM time)::float8 / $2) * $2)",
    "cpu_percent"
);
const MEMORY_TREND_PLAIN: &str = trend_sql!(
    "to_timestamp(floor(extract(epoch FROM time)::float8 / $2) * $2)",
    "mem_used::float8 / NULLIF(mem_total, 0) * 100"
);
const DISK_TREND_PLAIN: &str = trend_sql!(
    "to_timestamp(floor(extract(epoch FROM time)::float8 / $2) * $2)",
    "disk_used::float8 / NULLIF(disk_total, 0) * 100"
);

const API_LOGS: &str = "SELECT time, method, path, status_code, duration_ms, ip_address
    FROM metrics_api
    WHERE time > $1 AND ($2 = FALSE OR status_code >= 400)
    ORDER BY time DESC
    LIMIT $3 OFFSET $4";

macro_rules! endpoint_sql {
    ($order:literal) => {
        concat!(
            "SELECT path,
                COUNT(*) AS total,
                AVG(duration_ms)::float8 AS avg_dur,
                COALESCE(percentile_cont(0.95) WITHIN GROUP (ORDER BY duration_ms), 0)::float8 AS p95_dur,
                MAX(duration_ms)::float8 AS max_dur,
                COUNT(*) FILTER (WHERE status_code >= 400) AS errors
            FROM metrics_api
            WHERE time > $1
            GROUP BY path
            ORDER BY ",
            $order,
            ", path
            LIMIT $2"
        )
    };
}

const TOP_ENDPOINTS: &str = endpoint_sql!("total DESC");
const SLOWEST_ENDPOINTS: &str = endpoint_sql!("avg_dur DESC");

fn trend_statement(mode: StoreMode, resource: Resource) -> &'static str {
    match (mode, resource) {
        (StoreMode::Enabled, Resource::Cpu) => CPU_TREND_BUCKETED,
        (StoreMode::Enabled, Resource::Memory) => MEMORY_TREND_BUCKETED,
        (StoreMode::Enabled, Resource::Disk) => DISK_TREND_BUCKETED,
        (StoreMode::Degraded, Resource::Cpu) => CPU_TREND_PLAIN,
        (StoreMode::Degraded, Resource::Memory) => MEMORY_TREND_PLAIN,
        (StoreMode::Degraded, Resource::Disk) => DISK_TREND_PLAIN,
    }
}

/// Postgres columns are signed; byte counts beyond `i64::MAX` saturate.
fn to_bigint(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn to_limit(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

pub struct PgBackend {
    pool: PgPool,
}

impl PgBackend {
    /// Open a connection pool.
    pub async fn connect(url: &str, config: &DatabaseConfig) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
            .connect(url)
            .await?;
        Ok(Self::from_pool(pool))
    }

    /// Wrap an existing pool shared with the rest of the application.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl MetricsBackend for PgBackend {
    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn extension_available(&self) -> StoreResult<bool> {
        let version: Option<String> = sqlx::query_scalar(PROBE_EXTENSION)
            .fetch_optional(&self.pool)
            .await?;
        Ok(version.is_some())
    }

    async fn activate_extension(&self) -> StoreResult<()> {
        sqlx::query(CREATE_EXTENSION).execute(&self.pool).await?;
        Ok(())
    }

    async fn extension_active(&self) -> StoreResult<bool> {
        let version: Option<String> = sqlx::query_scalar(EXTENSION_ACTIVE)
            .fetch_optional(&self.pool)
            .await?;
        Ok(version.is_some())
    }

    async fn create_tables(&self) -> StoreResult<()> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&self.pool).await?;
        }
        Ok(())
    }

    async fn create_hypertable(&self, table: Table) -> StoreResult<()> {
        let statement = match table {
            Table::System => HYPERTABLE_SYSTEM,
            Table::Api => HYPERTABLE_API,
        };
        sqlx::query(statement).execute(&self.pool).await?;
        Ok(())
    }

    async fn insert_system(&self, sample: &SystemMetricSample) -> StoreResult<()> {
        sqlx::query(INSERT_SYSTEM)
            .bind(sample.timestamp)
            .bind(sample.cpu_percent)
            .bind(to_bigint(sample.mem_used))
            .bind(to_bigint(sample.mem_total))
            .bind(to_bigint(sample.disk_used))
            .bind(to_bigint(sample.disk_total))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn insert_api(&self, sample: &ApiMetricSample) -> StoreResult<()> {
        sqlx::query(INSERT_API)
            .bind(sample.timestamp)
            .bind(&sample.method)
            .bind(&sample.path)
            .bind(i32::from(sample.status_code))
            .bind(sample.duration_ms)
            .bind(&sample.ip_address)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn api_summary(&self, since: DateTime<Utc>) -> StoreResult<ApiSummary> {
        let row = sqlx::query(API_SUMMARY)
            .bind(since)
            .fetch_one(&self.pool)
            .await?;

        Ok(ApiSummary {
            total_requests: row.try_get("total")?,
            success_requests: row.try_get("success")?,
            avg_duration_ms: row.try_get("avg_dur")?,
            p95_duration_ms: row.try_get("p95_dur")?,
            error_rate: row.try_get("err_rate")?,
        })
    }

    async fn resource_trend(
        &self,
        mode: StoreMode,
        resource: Resource,
        since: DateTime<Utc>,
        bucket: Duration,
    ) -> StoreResult<Vec<TimePoint>> {
        let rows: Vec<(DateTime<Utc>, f64)> = sqlx::query_as(trend_statement(mode, resource))
            .bind(since)
            .bind(bucket.as_secs_f64())
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(time, value)| TimePoint { time, value })
            .collect())
    }

    async fn api_logs(&self, filter: &LogFilter) -> StoreResult<Vec<ApiMetricSample>> {
        let rows: Vec<(DateTime<Utc>, String, String, i32, f64, String)> = sqlx::query_as(API_LOGS)
            .bind(filter.since)
            .bind(filter.errors_only)
            .bind(to_limit(filter.limit))
            .bind(to_limit(filter.offset))
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(timestamp, method, path, status, duration_ms, ip_address)| ApiMetricSample {
                timestamp,
                method,
                path,
                status_code: u16::try_from(status).unwrap_or_default(),
                duration_ms,
                ip_address,
            })
            .collect())
    }

    async fn endpoint_stats(
        &self,
        since: DateTime<Utc>,
        order: EndpointOrder,
        limit: usize,
    ) -> StoreResult<Vec<EndpointStat>> {
        let statement = match order {
            EndpointOrder::MostRequested => TOP_ENDPOINTS,
            EndpointOrder::Slowest => SLOWEST_ENDPOINTS,
        };
        let rows: Vec<(String, i64, f64, f64, f64, i64)> = sqlx::query_as(statement)
            .bind(since)
            .bind(to_limit(limit))
            .fetch_all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(path, total, avg, p95, max, errors)| EndpointStat {
                path,
                total_requests: total,
                avg_duration_ms: avg,
                p95_duration_ms: p95,
                max_duration_ms: max,
                error_count: errors,
            })
            .collect())
    }
}
