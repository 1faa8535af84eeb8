use std::collections::BTreeMap;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;

use crate::record::LogRecord;
use crate::store::{ListFilter, LogPage, StoreStats, ValidationError, DEFAULT_PAGE_LIMIT};
use crate::system::MemoryUsage;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("failed to parse request: {0}")]
    RequestParsing(#[from] serde_json::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::Validation(_) | ApiError::RequestParsing(_) => StatusCode::BAD_REQUEST,
        };
        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}

#[derive(Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestStatus {
    Accepted,
}

#[derive(Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct IngestResponse {
    pub status: IngestStatus,
    pub id: String,
    #[serde(with = "time::serde::rfc3339")]
    pub received_at: OffsetDateTime,
}

/// Query string of `GET /logs`. Built from the raw key/value pairs so that
/// malformed or repeated values fall back to their defaults instead of
/// failing the extraction. The first occurrence of a key wins.
#[derive(Debug, Default)]
pub struct ListQuery {
    pub level: Option<String>,
    pub source: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
}

impl FromIterator<(String, String)> for ListQuery {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(pairs: I) -> Self {
        let mut query = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "level" => &mut query.level,
                "source" => &mut query.source,
                "limit" => &mut query.limit,
                "offset" => &mut query.offset,
                _ => continue,
            };
            keep_first(slot, value);
        }
        query
    }
}

impl ListQuery {
    pub fn into_filter(self) -> ListFilter {
        ListFilter {
            level: non_empty(self.level),
            source: non_empty(self.source),
            limit: parse_count(self.limit.as_deref())
                .filter(|limit| *limit > 0)
                .unwrap_or(DEFAULT_PAGE_LIMIT),
            offset: parse_count(self.offset.as_deref()).unwrap_or(0),
        }
    }
}

#[derive(Debug, Default)]
pub struct SearchQuery {
    pub q: Option<String>,
    pub level: Option<String>,
}

impl FromIterator<(String, String)> for SearchQuery {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(pairs: I) -> Self {
        let mut query = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "q" => &mut query.q,
                "level" => &mut query.level,
                _ => continue,
            };
            keep_first(slot, value);
        }
        query
    }
}

impl SearchQuery {
    /// The search needle, or empty when absent.
    pub fn query(&self) -> &str {
        self.q.as_deref().unwrap_or_default()
    }

    pub fn level(&self) -> Option<&str> {
        self.level.as_deref().filter(|level| !level.is_empty())
    }
}

fn keep_first(slot: &mut Option<String>, value: String) {
    if slot.is_none() {
        *slot = Some(value);
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.is_empty())
}

fn parse_count(value: Option<&str>) -> Option<usize> {
    value.and_then(|value| value.trim().parse().ok())
}

#[derive(Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
    pub has_more: bool,
}

#[derive(Debug, PartialEq, Deserialize, Serialize)]
pub struct ListResponse {
    pub logs: Vec<LogRecord>,
    pub pagination: Pagination,
}

impl From<LogPage> for ListResponse {
    fn from(page: LogPage) -> Self {
        Self {
            logs: page.logs,
            pagination: Pagination {
                total: page.total,
                limit: page.limit,
                offset: page.offset,
                has_more: page.has_more,
            },
        }
    }
}

#[derive(Debug, PartialEq, Deserialize, Serialize)]
pub struct SearchResponse {
    pub results: Vec<LogRecord>,
    pub total: usize,
}

#[derive(Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageStats {
    pub total_logs: usize,
    pub memory_usage: MemoryUsage,
}

#[derive(Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub total_received: u64,
    pub by_level: BTreeMap<String, u64>,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_received: Option<OffsetDateTime>,
    pub storage: StorageStats,
}

impl From<StoreStats> for StatsResponse {
    fn from(stats: StoreStats) -> Self {
        Self {
            total_received: stats.total_received,
            by_level: stats.by_level,
            last_received: stats.last_received_at,
            storage: StorageStats {
                total_logs: stats.total_logs,
                memory_usage: stats.memory_usage,
            },
        }
    }
}

#[derive(Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct ClearResponse {
    pub message: String,
    #[serde(with = "time::serde::rfc3339")]
    pub cleared_at: OffsetDateTime,
}

#[derive(Debug, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    /// Seconds since the router was built.
    pub uptime: f64,
    pub memory: MemoryUsage,
    pub logs_in_memory: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(limit: Option<&str>, offset: Option<&str>) -> ListQuery {
        ListQuery {
            limit: limit.map(String::from),
            offset: offset.map(String::from),
            ..Default::default()
        }
    }

    #[test]
    fn malformed_paging_falls_back_to_defaults() {
        let filter = query(Some("abc"), Some("-3")).into_filter();
        assert_eq!(filter.limit, DEFAULT_PAGE_LIMIT);
        assert_eq!(filter.offset, 0);

        let filter = query(Some("0"), Some("")).into_filter();
        assert_eq!(filter.limit, DEFAULT_PAGE_LIMIT);
        assert_eq!(filter.offset, 0);

        assert_eq!(query(None, None).into_filter(), ListFilter::default());
    }

    #[test]
    fn well_formed_paging_is_kept() {
        let filter = query(Some(" 10 "), Some("20")).into_filter();
        assert_eq!(filter.limit, 10);
        assert_eq!(filter.offset, 20);
    }

    #[test]
    fn empty_filters_are_ignored() {
        let filter = ListQuery {
            level: Some(String::new()),
            source: Some("api".to_owned()),
            ..Default::default()
        }
        .into_filter();
        assert_eq!(filter.level, None);
        assert_eq!(filter.source.as_deref(), Some("api"));
    }

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }

    #[test]
    fn repeated_parameters_keep_the_first_value() {
        let filter: ListFilter = pairs(&[
            ("limit", "5"),
            ("limit", "7"),
            ("offset", "1"),
            ("offset", "2"),
            ("level", "warn"),
            ("level", "error"),
            ("unknown", "x"),
        ])
        .into_iter()
        .collect::<ListQuery>()
        .into_filter();
        assert_eq!(filter.limit, 5);
        assert_eq!(filter.offset, 1);
        assert_eq!(filter.level.as_deref(), Some("warn"));

        let search: SearchQuery = pairs(&[("q", "a"), ("q", "b"), ("level", "")])
            .into_iter()
            .collect();
        assert_eq!(search.query(), "a");
        assert_eq!(search.level(), None);
    }

    #[test]
    fn validation_errors_are_bad_requests() {
        let response = ApiError::from(ValidationError::MissingRequiredFields).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
