//! Per-request API metric middleware.
//!
//! # Responsibilities
//! - Time the inner stage around `next.run`
//! - Pass the response through untouched
//! - Hand one `ApiMetricSample` to the store without awaiting the write

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::{self, Next},
    response::Response,
    Router,
};

use crate::config::InstrumentationConfig;
use crate::http::client_ip::client_ip;
use crate::store::{ApiMetricSample, MetricsStore};

/// Middleware state: the store plus the request filters.
#[derive(Clone)]
pub struct Instrumentation {
    store: MetricsStore,
    exclude_prefixes: Arc<[String]>,
    trust_forwarded_headers: bool,
    max_path_len: usize,
}

impl Instrumentation {
    pub fn new(store: MetricsStore, config: &InstrumentationConfig) -> Self {
        Self {
            store,
            exclude_prefixes: config.exclude_prefixes.clone().into(),
            trust_forwarded_headers: config.trust_forwarded_headers,
            max_path_len: config.max_path_len,
        }
    }

    /// Wrap every route of `router` with the middleware.
    pub fn instrument<S>(self, router: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        router.layer(middleware::from_fn_with_state(self, record_api_metrics))
    }

    fn is_excluded(&self, path: &str) -> bool {
        self.exclude_prefixes
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
    }

    /// Owned copy of `path`, cut to at most `max_path_len` characters.
    /// A length cap only; no segment is rewritten.
    fn recorded_path(&self, path: &str) -> String {
        match path.char_indices().nth(self.max_path_len) {
            Some((end, _)) => path[..end].to_owned(),
            None => path.to_owned(),
        }
    }
}

pub async fn record_api_metrics(
    State(instrumentation): State<Instrumentation>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if instrumentation.is_excluded(request.uri().path()) {
        return next.run(request).await;
    }

    let path = instrumentation.recorded_path(request.uri().path());

    let method = request.method().as_str().to_owned();
    let ip = client_ip(&request, instrumentation.trust_forwarded_headers);

    let start = Instant::now();
    let response = next.run(request).await;
    let elapsed = start.elapsed();

    let status = response.status().as_u16();
    instrumentation
        .store
        .record_api_metric(ApiMetricSample::new(method, path, status, elapsed, ip));

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use crate::store::MemoryBackend;

    #[tokio::test]
    async fn test_prefix_exclusion() {
        let store = MetricsStore::init(Arc::new(MemoryBackend::new(10)), StoreConfig::default())
            .await
            .unwrap();
        let config = InstrumentationConfig {
            exclude_prefixes: vec!["/static/".into(), "/health".into()],
            ..InstrumentationConfig::default()
        };
        let instrumentation = Instrumentation::new(store, &config);

        assert!(instrumentation.is_excluded("/health"));
        assert!(instrumentation.is_excluded("/static/app.js"));
        assert!(!instrumentation.is_excluded("/static"));
        assert!(!instrumentation.is_excluded("/api/rooms"));
    }

    #[tokio::test]
    async fn test_long_paths_cut_on_char_boundary() {
        let store = MetricsStore::init(Arc::new(MemoryBackend::new(10)), StoreConfig::default())
            .await
            .unwrap();
        let config = InstrumentationConfig {
            max_path_len: 6,
            ..InstrumentationConfig::default()
        };
        let instrumentation = Instrumentation::new(store, &config);

        assert_eq!(instrumentation.recorded_path("/rooms"), "/rooms");
        assert_eq!(instrumentation.recorded_path("/rooms/42"), "/rooms");
        assert_eq!(instrumentation.recorded_path("/café/menu"), "/café/");
        assert_eq!(instrumentation.recorded_path("/ééééééé"), "/ééééé");
    }

    #[tokio::test]
    async fn test_nothing_excluded_by_default() {
        let store = MetricsStore::init(Arc::new(MemoryBackend::new(10)), StoreConfig::default())
            .await
            .unwrap();
        let instrumentation = Instrumentation::new(store, &InstrumentationConfig::default());
        assert!(!instrumentation.is_excluded("/health"));
        assert!(!instrumentation.is_excluded("/"));
    }
}
