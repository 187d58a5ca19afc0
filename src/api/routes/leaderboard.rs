use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::api::state::AppState;
use crate::api::{ApiError, Pagination, PaginationMeta};
use crate::calculate::search;
use crate::live::Snapshot;
use crate::models::RankedPlayer;

#[derive(Debug, Deserialize)]
pub struct LeaderboardParams {
    pub page: Option<u32>,
    pub page_size: Option<u32>,
    pub search: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LeaderboardResponse {
    /// Changes whenever the ranking does; also sent as the ETag
    pub version: String,
    pub fetched_at: Option<DateTime<Utc>>,
    /// Set when the latest refresh failed and this board is being retained
    pub last_error: Option<String>,
    pub players: Vec<RankedPlayer>,
    pub pagination: PaginationMeta,
}

/// The applied snapshot, or 503 before the first successful fetch.
pub(crate) fn loaded_snapshot(state: &AppState) -> Result<Snapshot, ApiError> {
    let snapshot = state.feed.snapshot();
    if snapshot.is_loaded() {
        Ok(snapshot)
    } else {
        Err(ApiError::Unavailable(
            snapshot
                .last_error
                .unwrap_or_else(|| "Leaderboard is still loading".to_string()),
        ))
    }
}

fn etag_matches(headers: &HeaderMap, etag: &str) -> bool {
    headers
        .get_all(header::IF_NONE_MATCH)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .map(str::trim)
        .any(|tag| tag == "*" || tag == etag || tag.strip_prefix("W/") == Some(etag))
}

pub async fn get_leaderboard(
    State(state): State<AppState>,
    Query(params): Query<LeaderboardParams>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let snapshot = loaded_snapshot(&state)?;
    let etag = format!("\"{}\"", snapshot.version);
    let etag_header =
        HeaderValue::from_str(&etag).map_err(|e| ApiError::Internal(e.to_string()))?;

    if etag_matches(&headers, &etag) {
        return Ok((StatusCode::NOT_MODIFIED, [(header::ETAG, etag_header)]).into_response());
    }

    let matches: Vec<RankedPlayer> = search(&snapshot.players, params.search.as_deref().unwrap_or(""))
        .into_iter()
        .cloned()
        .collect();

    let pagination = Pagination::new(params.page, params.page_size);
    let meta = PaginationMeta::new(&pagination, matches.len() as u32);

    let body = LeaderboardResponse {
        version: snapshot.version,
        fetched_at: snapshot.fetched_at,
        last_error: snapshot.last_error,
        players: pagination.apply(&matches),
        pagination: meta,
    };

    Ok(([(header::ETAG, etag_header)], Json(body)).into_response())
}
