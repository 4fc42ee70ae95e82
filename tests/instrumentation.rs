//! In-process HTTP tests for the instrumentation middleware and reporting routes.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    routing::get,
    Router,
};
use serde_json::Value;
use tower::ServiceExt;

use coldwatch::config::TelemetryConfig;
use coldwatch::http::HttpServer;
use coldwatch::store::{MetricsStore, Table};

mod common;
use common::{store_on, test_config, TestBackend};

const ADMIN_KEY: &str = "test-admin-key";

fn app() -> Router {
    Router::new()
        .route("/api/rooms", get(|| async { "rooms" }))
        .route(
            "/api/created",
            get(|| async { (StatusCode::CREATED, [("x-room", "7")], "made") }),
        )
        .route(
            "/api/broken",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        )
        .route("/static/app.js", get(|| async { "js" }))
}

async fn server(config: TelemetryConfig) -> (Router, MetricsStore, Arc<TestBackend>) {
    let backend = Arc::new(TestBackend::plain());
    let store = store_on(backend.clone(), config.store.clone()).await;
    let router = HttpServer::new(&config, store.clone(), app()).router();
    (router, store, backend)
}

fn get_request(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn admin_request(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {ADMIN_KEY}"))
        .body(Body::empty())
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_response_passes_through_unchanged() {
    let (router, store, _) = server(test_config()).await;

    let response = router.oneshot(get_request("/api/created")).await.unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(response.headers()["x-room"], "7");
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"made");

    store.flush().await;
    let logs = store.api_logs(Duration::from_secs(60), false, 10, 0).await.unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].method, "GET");
    assert_eq!(logs[0].path, "/api/created");
    assert_eq!(logs[0].status_code, 201);
    assert!(logs[0].duration_ms >= 0.0);
}

#[tokio::test]
async fn test_default_status_and_unknown_routes_recorded() {
    let (router, store, _) = server(test_config()).await;

    let ok = router.clone().oneshot(get_request("/api/rooms")).await.unwrap();
    assert_eq!(ok.status(), StatusCode::OK);
    let missing = router.oneshot(get_request("/api/nowhere?x=1")).await.unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);

    store.flush().await;
    let logs = store.api_logs(Duration::from_secs(60), false, 10, 0).await.unwrap();
    let mut recorded: Vec<_> = logs.iter().map(|s| (s.path.as_str(), s.status_code)).collect();
    recorded.sort();
    assert_eq!(recorded, vec![("/api/nowhere", 404), ("/api/rooms", 200)]);
}

#[tokio::test]
async fn test_every_path_recorded_by_default() {
    let (router, store, backend) = server(test_config()).await;

    for uri in ["/health", "/static/app.js"] {
        let response = router.clone().oneshot(get_request(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    store.flush().await;
    assert_eq!(backend.stored(Table::Api), 2);
}

#[tokio::test]
async fn test_excluded_prefixes_not_recorded() {
    let mut config = test_config();
    config.instrumentation.exclude_prefixes = vec!["/static/".into(), "/health".into()];
    let (router, store, backend) = server(config).await;

    for uri in ["/health", "/static/app.js", "/api/rooms"] {
        let response = router.clone().oneshot(get_request(uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    store.flush().await;
    assert_eq!(backend.stored(Table::Api), 1);
}

#[tokio::test]
async fn test_long_paths_recorded_up_to_cap() {
    let mut config = test_config();
    config.instrumentation.max_path_len = 12;
    let (router, store, _) = server(config).await;

    let long = format!("/api/rooms/{}", "x".repeat(600));
    let response = router.oneshot(get_request(&long)).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    store.flush().await;
    let logs = store.api_logs(Duration::from_secs(60), false, 10, 0).await.unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].path, "/api/rooms/x");
}

#[tokio::test]
async fn test_admin_off_by_default() {
    let mut config = TelemetryConfig::default();
    config.store = test_config().store;
    let (router, _, _) = server(config).await;

    let response = router.oneshot(admin_request("/admin/status")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_client_address_from_forwarded_headers() {
    let mut config = test_config();
    config.instrumentation.trust_forwarded_headers = true;
    let (router, store, _) = server(config).await;

    let request = Request::builder()
        .uri("/api/rooms")
        .header("x-forwarded-for", "203.0.113.5, 10.0.0.1")
        .body(Body::empty())
        .unwrap();
    router.clone().oneshot(request).await.unwrap();
    router.oneshot(get_request("/api/rooms")).await.unwrap();

    store.flush().await;
    let logs = store.api_logs(Duration::from_secs(60), false, 10, 0).await.unwrap();
    let mut ips: Vec<_> = logs.into_iter().map(|s| s.ip_address).collect();
    ips.sort();
    assert_eq!(ips, vec!["203.0.113.5", "unknown"]);
}

#[tokio::test]
async fn test_request_timeout_is_recorded() {
    let mut config = test_config();
    config.server.request_timeout_secs = 1;
    let backend = Arc::new(TestBackend::plain());
    let store = store_on(backend.clone(), config.store.clone()).await;
    let slow = Router::new().route(
        "/api/slow",
        get(|| async {
            tokio::time::sleep(Duration::from_secs(3)).await;
            "late"
        }),
    );
    let router = HttpServer::new(&config, store.clone(), slow).router();

    let response = router.oneshot(get_request("/api/slow")).await.unwrap();
    assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);

    store.flush().await;
    let logs = store.api_logs(Duration::from_secs(60), false, 10, 0).await.unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].status_code, 408);
}

#[tokio::test]
async fn test_admin_requires_bearer_key() {
    let (router, _, _) = server(test_config()).await;

    let response = router.clone().oneshot(get_request("/admin/status")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let wrong = Request::builder()
        .uri("/admin/status")
        .header(header::AUTHORIZATION, "Bearer nope")
        .body(Body::empty())
        .unwrap();
    let response = router.clone().oneshot(wrong).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = router.oneshot(admin_request("/admin/status")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["store_mode"], "degraded");
    assert_eq!(body["backend"], "test");
}

#[tokio::test]
async fn test_admin_disabled_has_no_routes() {
    let mut config = test_config();
    config.admin.enabled = false;
    let (router, _, _) = server(config).await;

    let response = router.oneshot(admin_request("/admin/status")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_admin_summary_over_http_traffic() {
    let (router, store, _) = server(test_config()).await;

    for uri in ["/api/rooms", "/api/rooms", "/api/created", "/api/nowhere", "/api/broken"] {
        router.clone().oneshot(get_request(uri)).await.unwrap();
    }
    store.flush().await;

    let response = router
        .clone()
        .oneshot(admin_request("/admin/analytics/summary?range=1h"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["range"], "1h");
    assert_eq!(body["total_requests"], 5);
    assert_eq!(body["success_requests"], 4);
    assert!((body["error_rate"].as_f64().unwrap() - 0.2).abs() < 1e-9);

    let response = router
        .clone()
        .oneshot(admin_request("/admin/analytics/endpoints/top?limit=1"))
        .await
        .unwrap();
    let body = json_body(response).await;
    let endpoints = body["endpoints"].as_array().unwrap();
    assert_eq!(endpoints.len(), 1);
    assert_eq!(endpoints[0]["path"], "/api/rooms");
    assert_eq!(endpoints[0]["total_requests"], 2);

    let response = router
        .oneshot(admin_request("/admin/analytics/logs?errors_only=true"))
        .await
        .unwrap();
    let body = json_body(response).await;
    assert_eq!(body["limit"], 100);
    let mut statuses: Vec<u64> = body["logs"]
        .as_array()
        .unwrap()
        .iter()
        .map(|log| log["status_code"].as_u64().unwrap())
        .collect();
    statuses.sort();
    assert_eq!(statuses, vec![404, 500]);
}

#[tokio::test]
async fn test_admin_rejects_bad_parameters() {
    let (router, _, _) = server(test_config()).await;

    let response = router
        .clone()
        .oneshot(admin_request("/admin/analytics/summary?range=forever"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(json_body(response).await["error"].is_string());

    let response = router
        .oneshot(admin_request("/admin/analytics/trends/gpu"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_admin_read_failure_is_unavailable() {
    let config = test_config();
    let backend = Arc::new(TestBackend::plain().failing_reads());
    let store = store_on(backend, config.store.clone()).await;
    let router = HttpServer::new(&config, store, app()).router();

    let response = router
        .oneshot(admin_request("/admin/analytics/trends/cpu?range=5m"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
}
