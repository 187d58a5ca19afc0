//! Token-protected player management.
//!
//! Every write validates tier strings and mini-game ids strictly, stores a
//! recomputed `total_points` and never stores a rank. After a write the live
//! feed is refreshed so the next read reflects it.

use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{info, warn};

use crate::api::state::AppState;
use crate::api::ApiError;
use crate::calculate::{search, RejectedTier};
use crate::live::LiveFeed;
use crate::models::{PlayerDraft, PlayerId, PlayerRow, RankedPlayer};

const REFRESH_TIMEOUT: Duration = Duration::from_secs(5);

fn require_admin(state: &AppState, headers: &HeaderMap) -> Result<(), ApiError> {
    let Some(expected) = state.admin_token.as_deref() else {
        return Err(ApiError::Unauthorized(
            "Admin API is disabled; set admin.token".to_string(),
        ));
    };

    let provided = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim);

    match provided {
        Some(token) if tokens_match(token, expected) => Ok(()),
        _ => Err(ApiError::Unauthorized(
            "Missing or invalid admin token".to_string(),
        )),
    }
}

/// Compare fixed-length digests so the time taken does not depend on how
/// much of the token matched.
fn tokens_match(provided: &str, expected: &str) -> bool {
    let provided = Sha256::digest(provided.as_bytes());
    let expected = Sha256::digest(expected.as_bytes());
    provided
        .iter()
        .zip(expected.iter())
        .fold(0u8, |diff, (a, b)| diff | (a ^ b))
        == 0
}

/// Wait (bounded) for the live feed to pick up a write.
async fn sync_feed(state: &AppState) {
    match tokio::time::timeout(REFRESH_TIMEOUT, state.feed.refresh_and_wait()).await {
        Ok(Ok(snapshot)) => {
            if let Some(e) = snapshot.last_error {
                warn!("Leaderboard refresh after write failed: {}", e);
            }
        }
        Ok(Err(e)) => warn!("Leaderboard refresh after write failed: {}", e),
        Err(_) => warn!("Leaderboard refresh after write timed out"),
    }
}

#[derive(Debug, Deserialize)]
pub struct AdminListParams {
    pub search: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AdminListResponse {
    pub players: Vec<RankedPlayer>,
    /// Stored tier values that could not be read
    pub rejected: Vec<RejectedTier>,
}

/// Every stored player, read straight from the store and ranked.
pub async fn list_players(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<AdminListParams>,
) -> Result<Json<AdminListResponse>, ApiError> {
    require_admin(&state, &headers)?;

    let board = LiveFeed::fetch(state.store.as_ref(), &state.engine).await?;
    let players = search(&board.players, params.search.as_deref().unwrap_or(""))
        .into_iter()
        .cloned()
        .collect();

    Ok(Json(AdminListResponse {
        players,
        rejected: board.rejected,
    }))
}

pub async fn create_player(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(draft): Json<PlayerDraft>,
) -> Result<impl IntoResponse, ApiError> {
    require_admin(&state, &headers)?;

    let mut row = state.engine.prepare_row(PlayerId::generate(), draft)?;
    let now = Utc::now();
    row.created_at = Some(now);
    row.updated_at = Some(now);

    let stored = state.store.insert(row).await?;
    info!(player_id = %stored.id, username = %stored.username, "Created player");

    sync_feed(&state).await;
    Ok((StatusCode::CREATED, Json(stored)))
}

pub async fn update_player(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(draft): Json<PlayerDraft>,
) -> Result<Json<PlayerRow>, ApiError> {
    require_admin(&state, &headers)?;
    let id = PlayerId::new(id);

    let existing = state
        .store
        .get(&id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Player {}", id)))?;

    let mut row = state.engine.prepare_row(id, draft)?;
    row.created_at = existing.created_at;
    row.updated_at = Some(Utc::now());

    let stored = state.store.update(row).await?;
    info!(player_id = %stored.id, username = %stored.username, "Updated player");

    sync_feed(&state).await;
    Ok(Json(stored))
}

pub async fn delete_player(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    require_admin(&state, &headers)?;
    let id = PlayerId::new(id);

    state.store.delete(&id).await?;
    info!(player_id = %id, "Deleted player");

    sync_feed(&state).await;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::build_router;
    use crate::api::testing::{admin_request, get_json, row, send, setup_test_state};
    use axum::body::Body;
    use axum::http::Request;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_tokens_match() {
        assert!(tokens_match("s3cret", "s3cret"));
        assert!(!tokens_match("s3cre", "s3cret"));
        assert!(!tokens_match("s3creT", "s3cret"));
        assert!(!tokens_match("", "s3cret"));
    }

    #[tokio::test]
    async fn test_admin_requires_token() {
        let tmp = tempfile::tempdir().unwrap();
        let state = setup_test_state(tmp.path(), &[]).await;

        let (status, json) = get_json(build_router(state.clone()), "/api/admin/players").await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json["error"]["code"], "UNAUTHORIZED");

        let (status, _) = send(
            build_router(state),
            Request::builder()
                .uri("/api/admin/players")
                .header("authorization", "Bearer wrong")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_admin_disabled_without_token() {
        let tmp = tempfile::tempdir().unwrap();
        let mut state = setup_test_state(tmp.path(), &[]).await;
        state.admin_token = None;

        let (status, _) = send(
            build_router(state),
            admin_request("GET", "/api/admin/players", None),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_create_player_recomputes_points_and_refreshes() {
        let tmp = tempfile::tempdir().unwrap();
        let state = setup_test_state(tmp.path(), &[row("a", "Alice", &[("vanilla", "lt1")])]).await;

        let (status, created) = send(
            build_router(state.clone()),
            admin_request(
                "POST",
                "/api/admin/players",
                Some(r#"{"username":"Steve","tiers":{"vanilla":"HT1","sword":"lt2","axe":null},"total_points":999,"overall_rank":1}"#),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["username"], "Steve");
        assert_eq!(created["total_points"], 17);
        assert_eq!(created["tiers"]["vanilla"], "ht1");
        assert!(created["tiers"].get("axe").is_none());
        assert!(created.get("overall_rank").is_none());
        assert_eq!(created["skin_url"], "https://mc-heads.net/avatar/Steve/100");
        assert!(created["created_at"].is_string());

        // The write is visible on the live board without waiting for a poll.
        let (_, board) = get_json(build_router(state), "/api/leaderboard").await;
        assert_eq!(board["players"][0]["username"], "Steve");
        assert_eq!(board["players"][0]["overall_rank"], 1);
        assert_eq!(board["players"][1]["username"], "Alice");
    }

    #[tokio::test]
    async fn test_create_player_rejects_invalid_input() {
        let tmp = tempfile::tempdir().unwrap();
        let state = setup_test_state(tmp.path(), &[]).await;

        for body in [
            r#"{"username":"Steve","tiers":{"sword":"ht6"}}"#,
            r#"{"username":"Steve","tiers":{"bedwars":"ht1"}}"#,
            r#"{"username":"No Spaces Allowed"}"#,
            r#"{"username":""}"#,
        ] {
            let (status, json) = send(
                build_router(state.clone()),
                admin_request("POST", "/api/admin/players", Some(body)),
            )
            .await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);
            assert_eq!(json["error"]["code"], "BAD_REQUEST");
        }

        assert!(state.store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_and_delete_player() {
        let tmp = tempfile::tempdir().unwrap();
        let state = setup_test_state(
            tmp.path(),
            &[
                row("a", "Alice", &[("vanilla", "ht2")]),
                row("b", "Bob", &[("vanilla", "ht1")]),
            ],
        )
        .await;

        let (status, updated) = send(
            build_router(state.clone()),
            admin_request(
                "PUT",
                "/api/admin/players/a",
                Some(r#"{"username":"Alice","tiers":{"vanilla":"ht1","mace":"rlt1"}}"#),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["id"], "a");
        assert_eq!(updated["total_points"], 19);

        let (_, board) = get_json(build_router(state.clone()), "/api/leaderboard").await;
        assert_eq!(board["players"][0]["username"], "Alice");

        let (status, _) = send(
            build_router(state.clone()),
            admin_request("DELETE", "/api/admin/players/b", None),
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (_, listed) = send(
            build_router(state.clone()),
            admin_request("GET", "/api/admin/players", None),
        )
        .await;
        let names: Vec<&str> = listed["players"]
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["username"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["Alice"]);

        let (status, _) = send(
            build_router(state),
            admin_request("DELETE", "/api/admin/players/b", None),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_update_missing_player_is_404() {
        let tmp = tempfile::tempdir().unwrap();
        let state = setup_test_state(tmp.path(), &[]).await;

        let (status, _) = send(
            build_router(state),
            admin_request("PUT", "/api/admin/players/ghost", Some(r#"{"username":"Ghost"}"#)),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_admin_list_search_and_rejections() {
        let tmp = tempfile::tempdir().unwrap();
        let state = setup_test_state(
            tmp.path(),
            &[
                row("a", "EnderQueen", &[("vanilla", "lt1")]),
                row("b", "DragonSlayer99", &[("vanilla", "ht1"), ("sword", "ht0")]),
            ],
        )
        .await;

        let (status, json) = send(
            build_router(state),
            admin_request("GET", "/api/admin/players?search=dragon", None),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["players"].as_array().unwrap().len(), 1);
        assert_eq!(json["players"][0]["overall_rank"], 1);
        assert_eq!(json["rejected"][0]["value"], "ht0");
        assert_eq!(json["rejected"][0]["mini_game"], "sword");
    }
}
