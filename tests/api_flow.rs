//! End-to-end flow: seed the demo players, serve them, edit through the
//! admin API and watch the leaderboard follow.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use pretty_assertions::assert_eq;
use serde_json::Value;
use tower::util::ServiceExt;

use tier_board::api::{build_router, state::AppState};
use tier_board::calculate::{Catalog, RankingEngine};
use tier_board::config::AppConfig;
use tier_board::models::PlayerId;
use tier_board::seed::{read_seed_file, seed_players};

const TOKEN: &str = "integration-token";

fn demo_players() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("demos/players.json")
}

async fn seeded_state(dir: &Path) -> AppState {
    let mut config = AppConfig::default();
    config.data_dir = dir.to_path_buf();
    config.live.poll_interval = "1h".to_string();
    config.admin.token = Some(TOKEN.to_string());
    config.validate().unwrap();

    let store = config.open_store().unwrap();
    let engine = RankingEngine::new(Arc::new(Catalog::standard()));
    let report = seed_players(
        store.as_ref(),
        &engine,
        read_seed_file(&demo_players()).unwrap(),
        false,
    )
    .await
    .unwrap();
    assert_eq!(report.created, 10);
    assert!(report.errors.is_empty());

    let state = AppState::from_config(&config, store).unwrap();
    state.feed.loaded().await.unwrap();
    state
}

async fn call(state: &AppState, request: Request<Body>) -> (StatusCode, Value) {
    let resp = build_router(state.clone()).oneshot(request).await.unwrap();
    let status = resp.status();
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn admin(method: &str, uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {}", TOKEN))
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn standings(board: &Value) -> Vec<(String, u64, u64)> {
    board["players"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| {
            (
                p["username"].as_str().unwrap().to_string(),
                p["total_points"].as_u64().unwrap(),
                p["overall_rank"].as_u64().unwrap(),
            )
        })
        .collect()
}

fn expected(rows: &[(&str, u64, u64)]) -> Vec<(String, u64, u64)> {
    rows.iter().map(|(n, p, r)| (n.to_string(), *p, *r)).collect()
}

#[tokio::test]
async fn test_demo_leaderboard_is_recomputed() {
    let tmp = tempfile::tempdir().unwrap();
    let state = seeded_state(tmp.path()).await;

    let (status, board) = call(&state, get("/api/leaderboard")).await;
    assert_eq!(status, StatusCode::OK);

    // Stored ranks in the demo data are ignored; ties break on username.
    assert_eq!(
        standings(&board),
        expected(&[
            ("EnderQueen", 57, 1),
            ("DragonSlayer99", 55, 2),
            ("RedstoneWizard", 51, 3),
            ("NetherKnight", 48, 4),
            ("DiamondMiner", 45, 5),
            ("BlazeMaster", 39, 6),
            ("EmeraldArcher", 38, 7),
            ("WitherKing", 38, 8),
            ("ZombieHunter", 28, 9),
            ("IronGolem", 20, 10),
        ])
    );
}

#[tokio::test]
async fn test_mini_game_and_profile_views() {
    let tmp = tempfile::tempdir().unwrap();
    let state = seeded_state(tmp.path()).await;

    let (status, mace) = call(&state, get("/api/minigames/mace")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(mace["player_count"], 10);
    let tier2 = &mace["columns"][1];
    assert_eq!(tier2["high"][0]["username"], "EnderQueen");
    assert_eq!(tier2["retired_high"][0]["username"], "WitherKing");
    assert_eq!(tier2["retired_high"][0]["abbreviation"], "RHT2");

    // Nobody in the demo data is rated in UHC.
    let (_, uhc) = call(&state, get("/api/minigames/UHC")).await;
    assert_eq!(uhc["player_count"], 0);

    let (status, profile) = call(&state, get("/api/players/9")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["username"], "WitherKing");
    assert_eq!(profile["overall_rank"], 8);
    assert_eq!(profile["last_tested"]["tester"], "MainAdmin");
    let netherite = profile["standings"]
        .as_array()
        .unwrap()
        .iter()
        .find(|s| s["mini_game_id"] == "netherite")
        .unwrap();
    assert_eq!(netherite["abbreviation"], "RHT1");
    assert_eq!(netherite["tier"]["points"], 10);
}

#[tokio::test]
async fn test_admin_edits_move_the_board() {
    let tmp = tempfile::tempdir().unwrap();
    let state = seeded_state(tmp.path()).await;

    // IronGolem climbs from last to first.
    let (status, updated) = call(
        &state,
        admin(
            "PUT",
            "/api/admin/players/8",
            r#"{"username":"IronGolem","tiers":{"vanilla":"ht1","UHC":"ht1","potPvp":"ht1","netherite":"ht1","smp":"ht1","sword":"ht1"}}"#,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["total_points"], 60);

    let (_, board) = call(&state, get("/api/leaderboard?page_size=2")).await;
    assert_eq!(
        standings(&board),
        expected(&[("IronGolem", 60, 1), ("EnderQueen", 57, 2)])
    );

    // Invalid writes change nothing.
    let (status, _) = call(
        &state,
        admin(
            "PUT",
            "/api/admin/players/1",
            r#"{"username":"DragonSlayer99","tiers":{"vanilla":"ht0"}}"#,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let dragon = state.store.get(&PlayerId::from("1")).await.unwrap().unwrap();
    assert_eq!(dragon.total_points, Some(55));

    let (status, _) = call(&state, admin("DELETE", "/api/admin/players/8", "")).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, board) = call(&state, get("/api/leaderboard?page_size=1")).await;
    assert_eq!(standings(&board), expected(&[("EnderQueen", 57, 1)]));
    assert_eq!(board["pagination"]["total_items"], 9);
}

#[tokio::test]
async fn test_corrupt_store_value_is_excluded_on_read() {
    let tmp = tempfile::tempdir().unwrap();
    let state = seeded_state(tmp.path()).await;

    // Simulate a row edited outside the API.
    let mut row = state.store.get(&PlayerId::from("2")).await.unwrap().unwrap();
    if let Some(tiers) = row.tiers.as_mut() {
        tiers.insert("vanilla".to_string(), Some("ht7".to_string()));
    }
    state.store.update(row).await.unwrap();
    let snapshot = state.feed.refresh_and_wait().await.unwrap();

    assert_eq!(snapshot.rejected.len(), 1);
    assert_eq!(snapshot.rejected[0].value, "ht7");

    let (_, profile) = call(&state, get("/api/players/2")).await;
    // 57 minus the 9 points of the unreadable vanilla tier.
    assert_eq!(profile["total_points"], 48);
    assert_eq!(profile["username"], "EnderQueen");
}
