use axum::extract::{Path, State};
use axum::Json;

use crate::api::state::AppState;
use crate::api::ApiError;
use crate::calculate::{mini_game_tier_list, TierList};

use super::leaderboard::loaded_snapshot;

/// Tier columns for one mini-game. Players unrated in it are not listed.
pub async fn get_tier_list(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TierList>, ApiError> {
    let catalog = state.engine.catalog();
    // Unknown ids are a 404 here, unlike in admin input where they are a 400.
    if catalog.mini_game(&id).is_none() {
        return Err(ApiError::NotFound(format!("Mini-game {}", id)));
    }

    let snapshot = loaded_snapshot(&state)?;
    let list = mini_game_tier_list(catalog, &id, &snapshot.players)?;
    Ok(Json(list))
}
