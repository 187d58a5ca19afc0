use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::api::state::AppState;
use crate::calculate::TierEntry;
use crate::models::MiniGame;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub store: &'static str,
    pub players: usize,
    pub leaderboard_version: String,
    pub fetched_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let snapshot = state.feed.snapshot();
    let status = match (snapshot.is_loaded(), &snapshot.last_error) {
        (false, _) => "starting",
        (true, Some(_)) => "degraded",
        (true, None) => "ok",
    };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        store: state.store.name(),
        players: snapshot.players.len(),
        leaderboard_version: snapshot.version,
        fetched_at: snapshot.fetched_at,
        last_error: snapshot.last_error,
    })
}

/// Mini-games and the full tier table, for any client rendering tiers.
#[derive(Debug, Serialize)]
pub struct ConfigResponse {
    pub mini_games: Vec<MiniGame>,
    pub tiers: Vec<TierEntry>,
}

pub async fn get_config(State(state): State<AppState>) -> Json<ConfigResponse> {
    let catalog = state.engine.catalog();
    Json(ConfigResponse {
        mini_games: catalog.mini_games().to_vec(),
        tiers: catalog.resolver().entries(),
    })
}

#[cfg(test)]
mod tests {
    use crate::api::build_router;
    use crate::api::testing::{get_json, row, setup_test_state};
    use axum::http::StatusCode;

    #[tokio::test]
    async fn test_health_endpoint() {
        let tmp = tempfile::tempdir().unwrap();
        let state = setup_test_state(tmp.path(), &[row("1", "Steve", &[("sword", "ht1")])]).await;

        let (status, json) = get_json(build_router(state), "/api/health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "ok");
        assert_eq!(json["store"], "jsonl");
        assert_eq!(json["players"], 1);
        assert_eq!(json["leaderboard_version"].as_str().unwrap().len(), 16);
        assert!(json["last_error"].is_null());
    }

    #[tokio::test]
    async fn test_config_endpoint() {
        let tmp = tempfile::tempdir().unwrap();
        let state = setup_test_state(tmp.path(), &[]).await;

        let (status, json) = get_json(build_router(state), "/api/config").await;

        assert_eq!(status, StatusCode::OK);
        let games = json["mini_games"].as_array().unwrap();
        assert_eq!(games.len(), 8);
        assert_eq!(games[0]["id"], "vanilla");

        let tiers = json["tiers"].as_array().unwrap();
        assert_eq!(tiers.len(), 20);
        assert_eq!(tiers[0]["key"], "ht1");
        assert_eq!(tiers[0]["abbreviation"], "HT1");
        assert_eq!(tiers[0]["points"], 10);
        assert_eq!(tiers[0]["display_text"], "High Tier 1");

        let rlt3 = tiers.iter().find(|t| t["key"] == "rlt3").unwrap();
        assert_eq!(rlt3["points"], 5);
        assert_eq!(rlt3["is_retired"], true);
    }
}
