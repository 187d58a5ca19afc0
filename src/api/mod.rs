//! REST API endpoints.
//!
//! Axum-based HTTP API serving the live leaderboard, player profiles,
//! mini-game tier lists and the token-protected admin surface.

pub mod routes;
pub mod state;

use axum::{
    http::{header, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

use crate::calculate::DraftError;
use crate::models::TierError;
use crate::storage::StorageError;

use self::state::AppState;

/// API error types.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<TierError> for ApiError {
    fn from(e: TierError) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

impl From<DraftError> for ApiError {
    fn from(e: DraftError) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

impl From<StorageError> for ApiError {
    fn from(e: StorageError) -> Self {
        match e {
            StorageError::NotFound(_) => ApiError::NotFound(e.to_string()),
            StorageError::Conflict(_) => ApiError::BadRequest(e.to_string()),
            _ => {
                error!("Storage failure: {}", e);
                ApiError::Internal(e.to_string())
            }
        }
    }
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            ApiError::Unavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        };

        let body = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message: self.to_string(),
            },
        };

        (status, Json(body)).into_response()
    }
}

/// Pagination parameters.
#[derive(Debug, Clone)]
pub struct Pagination {
    pub page: u32,
    pub page_size: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 50,
        }
    }
}

impl Pagination {
    pub fn new(page: Option<u32>, page_size: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            page_size: page_size.unwrap_or(50).clamp(1, 100),
        }
    }

    /// Items skipped before this page. Saturates for out-of-range pages.
    pub fn offset(&self) -> usize {
        (self.page as usize - 1).saturating_mul(self.page_size as usize)
    }

    /// The slice of `items` on this page.
    pub fn apply<T: Clone>(&self, items: &[T]) -> Vec<T> {
        items
            .iter()
            .skip(self.offset())
            .take(self.page_size as usize)
            .cloned()
            .collect()
    }
}

/// Pagination metadata in responses.
#[derive(Debug, Serialize)]
pub struct PaginationMeta {
    pub page: u32,
    pub page_size: u32,
    pub total_items: u32,
    pub total_pages: u32,
    pub has_next: bool,
    pub has_prev: bool,
}

impl PaginationMeta {
    pub fn new(pagination: &Pagination, total_items: u32) -> Self {
        let total_pages = total_items.div_ceil(pagination.page_size);
        Self {
            page: pagination.page,
            page_size: pagination.page_size,
            total_items,
            total_pages,
            has_next: pagination.page < total_pages,
            has_prev: pagination.page > 1,
        }
    }
}

fn cors_layer(origin: &str) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::IF_NONE_MATCH,
        ])
        .expose_headers([header::ETAG]);

    if origin == "*" {
        return layer.allow_origin(Any);
    }
    match HeaderValue::from_str(origin) {
        Ok(value) => layer.allow_origin(value),
        Err(_) => {
            warn!("Invalid CORS origin {:?}, allowing any origin", origin);
            layer.allow_origin(Any)
        }
    }
}

/// Build the application router.
pub fn build_router(state: AppState) -> Router {
    use routes::{admin, config, leaderboard, minigames, players};

    let cors = cors_layer(&state.cors_origin);

    Router::new()
        .route("/api/health", get(config::health))
        .route("/api/config", get(config::get_config))
        .route("/api/leaderboard", get(leaderboard::get_leaderboard))
        .route("/api/players/:id", get(players::get_player))
        .route("/api/minigames/:id", get(minigames::get_tier_list))
        .route(
            "/api/admin/players",
            get(admin::list_players).post(admin::create_player),
        )
        .route(
            "/api/admin/players/:id",
            axum::routing::put(admin::update_player).delete(admin::delete_player),
        )
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

#[cfg(test)]
pub(crate) mod testing {
    //! Shared router test helpers.

    use std::collections::BTreeMap;
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use axum::Router;
    use serde_json::Value;
    use tower::util::ServiceExt;

    use super::state::AppState;
    use crate::config::AppConfig;
    use crate::models::{PlayerId, PlayerRow};
    use crate::storage::{JsonlPlayerStore, JsonlWriter};

    pub const TOKEN: &str = "test-token";

    pub fn row(id: &str, username: &str, tiers: &[(&str, &str)]) -> PlayerRow {
        PlayerRow {
            id: PlayerId::from(id),
            username: username.to_string(),
            skin_url: None,
            tiers: Some(
                tiers
                    .iter()
                    .map(|(g, t)| (g.to_string(), Some(t.to_string())))
                    .collect::<BTreeMap<_, _>>(),
            ),
            total_points: None,
            badges: vec![],
            last_tested: None,
            created_at: None,
            updated_at: None,
        }
    }

    /// State over a JSONL store seeded with `rows`, with the first fetch applied.
    pub async fn setup_test_state(dir: &std::path::Path, rows: &[PlayerRow]) -> AppState {
        let path = dir.join("players.jsonl");
        JsonlWriter::new(path.clone()).write_all(rows).unwrap();

        let mut config = AppConfig::default();
        config.live.poll_interval = "1h".to_string();
        config.admin.token = Some(TOKEN.to_string());

        let state = AppState::from_config(&config, Arc::new(JsonlPlayerStore::new(path))).unwrap();
        state.feed.loaded().await.unwrap();
        state
    }

    pub async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let resp = app.oneshot(request).await.unwrap();
        let status = resp.status();
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
        (status, json)
    }

    pub async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        send(app, Request::builder().uri(uri).body(Body::empty()).unwrap()).await
    }

    pub fn admin_request(method: &str, uri: &str, body: Option<&str>) -> Request<Body> {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("authorization", format!("Bearer {}", TOKEN))
            .header("content-type", "application/json");
        match body {
            Some(body) => builder.body(Body::from(body.to_string())).unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }
}
