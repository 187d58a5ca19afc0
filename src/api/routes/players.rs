use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;
use tracing::debug;

use crate::api::state::AppState;
use crate::api::ApiError;
use crate::calculate::{find_ranked, game_standings, GameStanding};
use crate::live::LiveFeed;
use crate::models::{PlayerId, RankedPlayer};

use super::leaderboard::loaded_snapshot;

/// A player's profile with their overall rank and per-game tiers.
#[derive(Debug, Serialize)]
pub struct PlayerProfile {
    #[serde(flatten)]
    pub player: RankedPlayer,
    pub standings: Vec<GameStanding>,
}

pub async fn get_player(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<PlayerProfile>, ApiError> {
    let id = PlayerId::new(id);
    let snapshot = loaded_snapshot(&state)?;

    let player = match find_ranked(&snapshot.players, &id) {
        Some(player) => player.clone(),
        None => {
            // Possibly created since the last poll; rank against the store directly.
            debug!(player_id = %id, "Player not in snapshot, reading store");
            let board = LiveFeed::fetch(state.store.as_ref(), &state.engine).await?;
            let player = find_ranked(&board.players, &id)
                .cloned()
                .ok_or_else(|| ApiError::NotFound(format!("Player {}", id)))?;
            state.feed.refresh();
            player
        }
    };

    let standings = game_standings(state.engine.catalog(), &player.player);
    Ok(Json(PlayerProfile { player, standings }))
}
