use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::analytics::{format_window, parse_window, AnalyticsReader};
use crate::store::{ApiMetricSample, ApiSummary, EndpointStat, Resource, StoreError, StoreMode, TimePoint};

pub const DEFAULT_ENDPOINT_LIMIT: usize = 10;
pub const MAX_ENDPOINT_LIMIT: usize = 100;
pub const DEFAULT_LOG_LIMIT: usize = 100;
pub const MAX_LOG_LIMIT: usize = 500;

/// Error body for reporting routes.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Store(StoreError),
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        ApiError::Store(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::Store(e) => {
                tracing::error!(error = %e, "Analytics query failed");
                (StatusCode::SERVICE_UNAVAILABLE, e.to_string())
            }
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct RangeQuery {
    pub range: Option<String>,
}

impl RangeQuery {
    fn window(&self) -> Result<Duration, ApiError> {
        parse_window(self.range.as_deref().unwrap_or_default())
            .map_err(|e| ApiError::BadRequest(e.to_string()))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct EndpointQuery {
    pub range: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LogQuery {
    pub range: Option<String>,
    #[serde(default)]
    pub errors_only: bool,
    pub limit: Option<usize>,
    #[serde(default)]
    pub offset: usize,
}

fn limit_or(limit: Option<usize>, default: usize, max: usize) -> usize {
    limit.filter(|l| *l > 0).unwrap_or(default).min(max)
}

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub store_mode: StoreMode,
    pub backend: &'static str,
}

#[derive(Serialize)]
pub struct SummaryResponse {
    pub range: String,
    #[serde(flatten)]
    pub summary: ApiSummary,
}

#[derive(Serialize)]
pub struct TrendResponse {
    pub resource: Resource,
    pub range: String,
    pub points: Vec<TimePoint>,
}

#[derive(Serialize)]
pub struct LogsResponse {
    pub range: String,
    pub limit: usize,
    pub offset: usize,
    pub logs: Vec<ApiMetricSample>,
}

#[derive(Serialize)]
pub struct EndpointsResponse {
    pub range: String,
    pub endpoints: Vec<EndpointStat>,
}

pub async fn get_status(State(reader): State<AnalyticsReader>) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        store_mode: reader.mode(),
        backend: reader.backend_name(),
    })
}

pub async fn get_summary(
    State(reader): State<AnalyticsReader>,
    Query(query): Query<RangeQuery>,
) -> Result<Json<SummaryResponse>, ApiError> {
    let window = query.window()?;
    let summary = reader.get_api_summary(window).await?;
    Ok(Json(SummaryResponse {
        range: format_window(window),
        summary,
    }))
}

pub async fn get_trend(
    State(reader): State<AnalyticsReader>,
    Path(resource): Path<String>,
    Query(query): Query<RangeQuery>,
) -> Result<Json<TrendResponse>, ApiError> {
    let resource: Resource = resource.parse().map_err(ApiError::BadRequest)?;
    let window = query.window()?;
    let points = reader.get_trend(resource, window).await?;
    Ok(Json(TrendResponse {
        resource,
        range: format_window(window),
        points,
    }))
}

pub async fn get_logs(
    State(reader): State<AnalyticsReader>,
    Query(query): Query<LogQuery>,
) -> Result<Json<LogsResponse>, ApiError> {
    let window = RangeQuery { range: query.range }.window()?;
    let limit = limit_or(query.limit, DEFAULT_LOG_LIMIT, MAX_LOG_LIMIT);
    let logs = reader
        .get_api_logs(window, query.errors_only, limit, query.offset)
        .await?;
    Ok(Json(LogsResponse {
        range: format_window(window),
        limit,
        offset: query.offset,
        logs,
    }))
}

pub async fn get_top_endpoints(
    State(reader): State<AnalyticsReader>,
    Query(query): Query<EndpointQuery>,
) -> Result<Json<EndpointsResponse>, ApiError> {
    let window = RangeQuery { range: query.range }.window()?;
    let limit = limit_or(query.limit, DEFAULT_ENDPOINT_LIMIT, MAX_ENDPOINT_LIMIT);
    let endpoints = reader.get_top_endpoints(window, limit).await?;
    Ok(Json(EndpointsResponse {
        range: format_window(window),
        endpoints,
    }))
}

pub async fn get_slowest_endpoints(
    State(reader): State<AnalyticsReader>,
    Query(query): Query<EndpointQuery>,
) -> Result<Json<EndpointsResponse>, ApiError> {
    let window = RangeQuery { range: query.range }.window()?;
    let limit = limit_or(query.limit, DEFAULT_ENDPOINT_LIMIT, MAX_ENDPOINT_LIMIT);
    let endpoints = reader.get_slowest_endpoints(window, limit).await?;
    Ok(Json(EndpointsResponse {
        range: format_window(window),
        endpoints,
    }))
}
