//! Bearer-authenticated reporting routes.
//!
//! # Routes
//! ```text
//! GET /admin/status
//! GET /admin/analytics/summary?range=1h
//! GET /admin/analytics/trends/{cpu|memory|disk}?range=1h
//! GET /admin/analytics/logs?range=1h&errors_only=true&limit=100&offset=0
//! GET /admin/analytics/endpoints/top?range=1h&limit=10
//! GET /admin/analytics/endpoints/slowest?range=1h&limit=10
//! ```
//!
//! Bad query parameters answer 400, store failures 503.

pub mod auth;
pub mod handlers;

use std::sync::Arc;

use axum::{middleware, routing::get, Router};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::analytics::AnalyticsReader;

pub fn setup_admin_router(reader: AnalyticsReader, api_key: &str) -> Router {
    let api_key: Arc<str> = Arc::from(api_key);

    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/analytics/summary", get(get_summary))
        .route("/admin/analytics/trends/{resource}", get(get_trend))
        .route("/admin/analytics/logs", get(get_logs))
        .route("/admin/analytics/endpoints/top", get(get_top_endpoints))
        .route("/admin/analytics/endpoints/slowest", get(get_slowest_endpoints))
        .route_layer(middleware::from_fn_with_state(api_key, admin_auth_middleware))
        .with_state(reader)
}
