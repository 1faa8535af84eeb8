// prometheus exporter setup

use std::time::Instant;

use axum::body::Body;
use axum::extract::MatchedPath;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::IntoResponse;
use metrics::{counter, gauge};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};

use crate::store::KNOWN_LEVELS;

pub const RECORDS_ADMITTED_TOTAL: &str = "log_api_records_admitted_total";
pub const RECORDS_REJECTED_TOTAL: &str = "log_api_records_rejected_total";
pub const RECORDS_EVICTED_TOTAL: &str = "log_api_records_evicted_total";
pub const RECORDS_CLEARED_TOTAL: &str = "log_api_records_cleared_total";
pub const WINDOW_SIZE: &str = "log_api_window_size";

pub fn report_admitted(level: &str) {
    // Levels are free-form, keep the label set bounded
    let level = KNOWN_LEVELS
        .iter()
        .find(|known| **known == level)
        .copied()
        .unwrap_or("other");
    counter!(RECORDS_ADMITTED_TOTAL, "level" => level).increment(1);
}

pub fn report_rejected(cause: &'static str) {
    counter!(RECORDS_REJECTED_TOTAL, "cause" => cause).increment(1);
}

pub fn report_evicted(quantity: usize) {
    if quantity > 0 {
        counter!(RECORDS_EVICTED_TOTAL).increment(quantity as u64);
    }
}

pub fn report_cleared(quantity: usize) {
    counter!(RECORDS_CLEARED_TOTAL).increment(quantity as u64);
}

pub fn report_window_size(size: usize) {
    gauge!(WINDOW_SIZE).set(size as f64);
}

pub fn setup_metrics_recorder() -> PrometheusHandle {
    const EXPONENTIAL_SECONDS: &[f64] = &[
        0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
    ];

    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("http_requests_duration_seconds".to_string()),
            EXPONENTIAL_SECONDS,
        )
        .unwrap()
        .install_recorder()
        .unwrap()
}

/// Middleware to record some common HTTP metrics
/// Someday tower-http might provide a metrics middleware: https://github.com/tower-rs/tower-http/issues/57
pub async fn track_metrics(req: Request<Body>, next: Next) -> impl IntoResponse {
    let start = Instant::now();

    let path = if let Some(matched_path) = req.extensions().get::<MatchedPath>() {
        matched_path.as_str().to_owned()
    } else {
        req.uri().path().to_owned()
    };

    let method = req.method().clone();

    let response = next.run(req).await;

    let latency = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();

    let labels = [
        ("method", method.to_string()),
        ("path", path),
        ("status", status),
    ];

    counter!("http_requests_total", &labels).increment(1);
    metrics::histogram!("http_requests_duration_seconds", &labels).record(latency);

    response
}
