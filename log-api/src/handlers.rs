use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use bytes::Bytes;
use tracing::instrument;

use crate::api::{
    ApiError, ClearResponse, HealthResponse, IngestResponse, IngestStatus, ListQuery,
    ListResponse, SearchQuery, SearchResponse, StatsResponse,
};
use crate::prometheus::{
    report_admitted, report_cleared, report_evicted, report_rejected, report_window_size,
};
use crate::record::RawLog;
use crate::router;
use crate::system::memory_usage;

pub async fn index() -> &'static str {
    "log-api"
}

#[instrument(skip_all, fields(log_level, record_id, body_size = body.len()))]
pub async fn ingest(
    State(state): State<router::State>,
    body: Bytes,
) -> Result<(StatusCode, Json<IngestResponse>), ApiError> {
    // An empty body is an empty document, which then fails validation.
    let raw: RawLog = if body.iter().all(u8::is_ascii_whitespace) {
        RawLog::new()
    } else {
        serde_json::from_slice(&body).map_err(|err| {
            report_rejected("malformed_body");
            tracing::warn!("rejected malformed payload: {}", err);
            err
        })?
    };

    let received_at = state.timesource.current_time();
    let admission = state.store.admit(raw, received_at).map_err(|err| {
        report_rejected("missing_fields");
        tracing::warn!("rejected invalid payload: {}", err);
        err
    })?;

    tracing::Span::current().record("log_level", admission.level.as_str());
    tracing::Span::current().record("record_id", admission.id.as_str());
    tracing::debug!(evicted = admission.evicted, "admitted log record");

    report_admitted(&admission.level);
    report_evicted(admission.evicted);
    report_window_size(admission.window_size);

    Ok((
        StatusCode::ACCEPTED,
        Json(IngestResponse {
            status: IngestStatus::Accepted,
            id: admission.id,
            received_at: admission.received_at,
        }),
    ))
}

#[instrument(skip_all)]
pub async fn list(
    State(state): State<router::State>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Json<ListResponse> {
    let filter = pairs.into_iter().collect::<ListQuery>().into_filter();
    tracing::debug!(?filter, "listing logs");

    Json(state.store.list(&filter).into())
}

#[instrument(skip_all, fields(log_level))]
pub async fn search(
    State(state): State<router::State>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Json<SearchResponse>, ApiError> {
    let query: SearchQuery = pairs.into_iter().collect();
    if let Some(level) = query.level() {
        tracing::Span::current().record("log_level", level);
    }

    let found = state.store.search(query.query(), query.level())?;

    Ok(Json(SearchResponse {
        results: found.results,
        total: found.total,
    }))
}

pub async fn stats(State(state): State<router::State>) -> Json<StatsResponse> {
    Json(state.store.stats().into())
}

#[instrument(skip_all)]
pub async fn clear(State(state): State<router::State>) -> Json<ClearResponse> {
    let cleared = state.store.clear();
    let cleared_at = state.timesource.current_time();

    tracing::info!(cleared, "cleared log window");
    report_cleared(cleared);
    report_window_size(state.store.len());

    Json(ClearResponse {
        message: format!("Cleared {cleared} logs"),
        cleared_at,
    })
}

pub async fn health(State(state): State<router::State>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_owned(),
        uptime: state.started_at.elapsed().as_secs_f64(),
        memory: memory_usage(),
        logs_in_memory: state.store.len(),
    })
}
