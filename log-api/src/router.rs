use std::future::ready;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::DefaultBodyLimit;
use axum::http::Method;
use axum::{routing::get, Router};
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::prometheus::{setup_metrics_recorder, track_metrics};
use crate::store::LogStore;
use crate::time::TimeSource;

#[derive(Clone)]
pub struct State {
    pub store: Arc<LogStore>,
    pub timesource: Arc<dyn TimeSource + Send + Sync>,
    pub started_at: Instant,
}

pub fn router<TZ: TimeSource + Send + Sync + 'static>(
    timesource: TZ,
    store: Arc<LogStore>,
    max_body_size: usize,
    metrics: bool,
) -> Router {
    let state = State {
        store,
        timesource: Arc::new(timesource),
        started_at: Instant::now(),
    };

    // Dashboards read this API straight from the browser
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
        .allow_origin(AllowOrigin::mirror_request());

    let router = Router::new()
        .route("/", get(handlers::index))
        .route(
            "/logs",
            get(handlers::list)
                .post(handlers::ingest)
                .delete(handlers::clear),
        )
        .route("/search", get(handlers::search))
        .route("/stats", get(handlers::stats))
        .route("/health", get(handlers::health))
        .layer(DefaultBodyLimit::max(max_body_size))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(axum::middleware::from_fn(track_metrics))
        .with_state(state);

    // Don't install metrics unless asked to
    // Installing a global recorder when the API is used as a library (during tests etc)
    // does not work well.
    if metrics {
        let recorder_handle = setup_metrics_recorder();
        router.route("/metrics", get(move || ready(recorder_handle.render())))
    } else {
        router
    }
}
