//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Merge the application router with `/health` and the admin routes
//! - Wire up middleware (tracing, API metrics, request timeout)
//! - Serve with connect info and graceful shutdown

use std::net::SocketAddr;
use std::time::Duration;

use axum::{extract::State, routing::get, Json, Router};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::admin::setup_admin_router;
use crate::analytics::AnalyticsReader;
use crate::config::TelemetryConfig;
use crate::http::instrument::Instrumentation;
use crate::store::{MetricsStore, StoreMode};

/// HTTP server hosting the application routes and the reporting API.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Build the server around `app`, the domain routes to be instrumented.
    pub fn new(config: &TelemetryConfig, store: MetricsStore, app: Router) -> Self {
        let router = Self::build_router(config, store, app);
        Self { router }
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// Layers listed later wrap earlier ones, so the instrumentation sees
    /// the timeout's 408 responses.
    #[allow(deprecated)]
    fn build_router(config: &TelemetryConfig, store: MetricsStore, app: Router) -> Router {
        let health = Router::new()
            .route("/health", get(health_handler))
            .with_state(store.clone());

        let mut router = app.merge(health);

        if config.admin.enabled {
            let reader = AnalyticsReader::new(store.clone());
            router = router.merge(setup_admin_router(reader, &config.admin.api_key));
        }

        let router = router.layer(TimeoutLayer::new(Duration::from_secs(
            config.server.request_timeout_secs,
        )));

        Instrumentation::new(store, &config.instrumentation)
            .instrument(router)
            .layer(TraceLayer::new_for_http())
    }

    /// The fully layered router, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve on `listener` until the shutdown signal fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

#[derive(Serialize)]
struct HealthStatus {
    status: &'static str,
    store_mode: StoreMode,
    backend: &'static str,
}

async fn health_handler(State(store): State<MetricsStore>) -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "healthy",
        store_mode: store.mode(),
        backend: store.backend_name(),
    })
}
