//! Ranking engine.
//!
//! Turns store rows into validated records, sums tier points and assigns a
//! dense overall rank. Nothing here is stored: every read recomputes.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::warn;

use crate::models::{
    default_avatar_url, is_valid_username, MiniGameId, PlayerDraft, PlayerId, PlayerRecord,
    PlayerRow, RankedPlayer, TierError, TierLabel,
};

use super::Catalog;

/// Why an admin draft cannot be stored.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DraftError {
    #[error("Invalid username {0:?}: expected 3-16 letters, digits or underscores")]
    InvalidUsername(String),

    #[error(transparent)]
    Tier(#[from] TierError),
}

/// A tier entry left out of a player's total because it failed validation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RejectedTier {
    pub player_id: PlayerId,
    pub username: String,
    pub mini_game: String,
    pub value: String,
    pub reason: String,
}

/// A validated record and whatever had to be dropped to build it.
#[derive(Debug, Clone)]
pub struct Admitted {
    pub record: PlayerRecord,
    pub rejected: Vec<RejectedTier>,
}

/// Output of one ranking pass.
#[derive(Debug, Clone, Default)]
pub struct RankedBoard {
    pub players: Vec<RankedPlayer>,
    pub rejected: Vec<RejectedTier>,
}

/// Sums tier points and ranks players against an injected catalog.
#[derive(Debug, Clone)]
pub struct RankingEngine {
    catalog: Arc<Catalog>,
}

impl RankingEngine {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Sum of tier points over a validated tier map. Empty map is 0.
    pub fn compute_total_points(&self, tiers: &BTreeMap<MiniGameId, TierLabel>) -> u32 {
        let resolver = self.catalog.resolver();
        // `Catalog::new` bounds totals over known mini-games; saturate for
        // maps built outside the catalog.
        tiers
            .values()
            .fold(0u32, |total, &label| total.saturating_add(resolver.points_for(label)))
    }

    /// Strictly validate a raw tier map.
    ///
    /// Null or blank values mean "unrated" and are dropped. Any unknown
    /// mini-game or tier string fails the whole map.
    pub fn validate_tiers(
        &self,
        raw: &BTreeMap<String, Option<String>>,
    ) -> Result<BTreeMap<MiniGameId, TierLabel>, TierError> {
        let resolver = self.catalog.resolver();
        let mut tiers = BTreeMap::new();
        for (game, value) in raw {
            let Some(value) = rated(value) else {
                continue;
            };
            self.catalog.check_mini_game(game)?;
            tiers.insert(game.clone(), resolver.resolve(value)?);
        }
        Ok(tiers)
    }

    /// Sum of tier points over raw store values, failing on the first
    /// invalid entry rather than counting it as zero.
    pub fn compute_total_points_raw(
        &self,
        raw: Option<&BTreeMap<String, Option<String>>>,
    ) -> Result<u32, TierError> {
        match raw {
            Some(raw) => Ok(self.compute_total_points(&self.validate_tiers(raw)?)),
            None => Ok(0),
        }
    }

    /// Strictly validate a draft and build the row to store.
    ///
    /// Tier keys are normalized, unrated entries dropped and `total_points`
    /// recomputed. Timestamps are left for the caller to set.
    pub fn prepare_row(&self, id: PlayerId, draft: PlayerDraft) -> Result<PlayerRow, DraftError> {
        let username = draft.username.trim().to_string();
        if !is_valid_username(&username) {
            return Err(DraftError::InvalidUsername(username));
        }

        let tiers = self.validate_tiers(&draft.tiers)?;
        let total_points = self.compute_total_points(&tiers);
        let skin_url = draft
            .skin_url
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| default_avatar_url(&username));

        Ok(PlayerRow {
            id,
            username,
            skin_url: Some(skin_url),
            tiers: Some(
                tiers
                    .iter()
                    .map(|(game, label)| (game.clone(), Some(label.key())))
                    .collect(),
            ),
            total_points: Some(i64::from(total_points)),
            badges: draft.badges,
            last_tested: draft.last_tested,
            created_at: None,
            updated_at: None,
        })
    }

    /// Validate a store row for reading.
    ///
    /// Invalid entries are logged and excluded individually so one corrupt
    /// tier does not keep the player (or anyone else) out of the ranking.
    pub fn admit(&self, row: PlayerRow) -> Admitted {
        let resolver = self.catalog.resolver();
        let mut tiers = BTreeMap::new();
        let mut rejected = Vec::new();

        for (game, value) in row.tiers.iter().flatten() {
            let Some(value) = rated(value) else {
                continue;
            };
            let checked = self
                .catalog
                .check_mini_game(game)
                .and_then(|_| resolver.resolve(value));
            match checked {
                Ok(label) => {
                    tiers.insert(game.clone(), label);
                }
                Err(e) => {
                    warn!(
                        player_id = %row.id,
                        username = %row.username,
                        mini_game = %game,
                        "Excluding invalid tier entry {:?}: {}",
                        value,
                        e
                    );
                    rejected.push(RejectedTier {
                        player_id: row.id.clone(),
                        username: row.username.clone(),
                        mini_game: game.clone(),
                        value: value.to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        let avatar_url = row.avatar_url();
        let total_points = self.compute_total_points(&tiers);
        Admitted {
            record: PlayerRecord {
                id: row.id,
                username: row.username,
                avatar_url,
                tiers,
                total_points,
                badges: row.badges,
                last_tested: row.last_tested,
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
            rejected,
        }
    }

    /// Validate and rank a full set of store rows.
    pub fn rank_rows(&self, rows: Vec<PlayerRow>) -> RankedBoard {
        let mut rejected = Vec::new();
        let records = rows
            .into_iter()
            .map(|row| {
                let admitted = self.admit(row);
                rejected.extend(admitted.rejected);
                admitted.record
            })
            .collect();

        RankedBoard {
            players: rank_players(records),
            rejected,
        }
    }
}

fn rated(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Overall ordering: points descending, then username ascending ignoring
/// case, then id so identical names still order the same way every time.
pub fn compare_for_rank(a: &PlayerRecord, b: &PlayerRecord) -> Ordering {
    b.total_points
        .cmp(&a.total_points)
        .then_with(|| a.username.to_lowercase().cmp(&b.username.to_lowercase()))
        .then_with(|| a.id.cmp(&b.id))
}

/// Assign dense ranks `1..=N`; no gaps and no shared positions.
pub fn rank_players(mut players: Vec<PlayerRecord>) -> Vec<RankedPlayer> {
    players.sort_by(compare_for_rank);
    players
        .into_iter()
        .zip(1u32..)
        .map(|(player, overall_rank)| RankedPlayer {
            overall_rank,
            player,
        })
        .collect()
}
