//! Read views derived from a ranking pass.

use serde::Serialize;

use crate::models::{
    MiniGame, PlayerId, PlayerRecord, RankedPlayer, TierError, TierLabel, BOTTOM_TIER, TOP_TIER,
};

use super::{Catalog, TierResolver};

/// One player in a mini-game tier column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TierListEntry {
    pub id: PlayerId,
    pub username: String,
    pub avatar_url: String,
    pub overall_rank: u32,
    pub tier: TierLabel,
    pub abbreviation: String,
}

/// Players holding one numeric tier, split by sub-tier.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TierColumn {
    pub numeric_tier: u8,
    pub high: Vec<TierListEntry>,
    pub low: Vec<TierListEntry>,
    pub retired_high: Vec<TierListEntry>,
    pub retired_low: Vec<TierListEntry>,
}

impl TierColumn {
    pub fn len(&self) -> usize {
        self.high.len() + self.low.len() + self.retired_high.len() + self.retired_low.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slot(&mut self, label: TierLabel) -> &mut Vec<TierListEntry> {
        match (label.is_retired(), label.is_high()) {
            (false, true) => &mut self.high,
            (false, false) => &mut self.low,
            (true, true) => &mut self.retired_high,
            (true, false) => &mut self.retired_low,
        }
    }
}

/// The tier list for one mini-game.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TierList {
    pub mini_game: MiniGame,
    pub player_count: usize,
    pub columns: Vec<TierColumn>,
}

/// Group the players rated in `game_id` into tier columns 1 through 5.
///
/// Unrated players are left out. Within a slot players keep their overall
/// rank order.
pub fn mini_game_tier_list(
    catalog: &Catalog,
    game_id: &str,
    ranked: &[RankedPlayer],
) -> Result<TierList, TierError> {
    let mini_game = catalog.check_mini_game(game_id)?.clone();
    let resolver = catalog.resolver();

    let mut columns: Vec<TierColumn> = (TOP_TIER..=BOTTOM_TIER)
        .map(|numeric_tier| TierColumn {
            numeric_tier,
            ..Default::default()
        })
        .collect();

    let mut player_count = 0;
    for entry in ranked {
        let Some(&label) = entry.player.tiers.get(game_id) else {
            continue;
        };
        let column = &mut columns[usize::from(label.numeric_tier() - TOP_TIER)];
        column.slot(label).push(TierListEntry {
            id: entry.player.id.clone(),
            username: entry.player.username.clone(),
            avatar_url: entry.player.avatar_url.clone(),
            overall_rank: entry.overall_rank,
            tier: label,
            abbreviation: resolver.format_abbreviation(Some(label)),
        });
        player_count += 1;
    }

    Ok(TierList {
        mini_game,
        player_count,
        columns,
    })
}

pub fn find_ranked<'a>(ranked: &'a [RankedPlayer], id: &PlayerId) -> Option<&'a RankedPlayer> {
    ranked.iter().find(|r| &r.player.id == id)
}

/// Case-insensitive username filter. Ranks stay those of the full pass.
pub fn search<'a>(ranked: &'a [RankedPlayer], term: &str) -> Vec<&'a RankedPlayer> {
    let term = term.trim().to_lowercase();
    ranked
        .iter()
        .filter(|r| term.is_empty() || r.player.username.to_lowercase().contains(&term))
        .collect()
}

/// Display form of a held tier.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TierDisplay {
    pub key: TierLabel,
    pub abbreviation: String,
    pub display_text: String,
    pub points: u32,
}

impl TierDisplay {
    pub fn new(resolver: &TierResolver, label: TierLabel) -> Self {
        Self {
            key: label,
            abbreviation: resolver.format_abbreviation(Some(label)),
            display_text: resolver.metadata_for(label).display_text,
            points: resolver.points_for(label),
        }
    }
}

/// A player's standing in one mini-game.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameStanding {
    pub mini_game_id: String,
    pub mini_game_name: String,
    pub abbreviation: String,
    pub tier: Option<TierDisplay>,
}

/// Standings for every configured mini-game, in catalog order.
/// Unrated games are included with an "N/A" abbreviation.
pub fn game_standings(catalog: &Catalog, player: &PlayerRecord) -> Vec<GameStanding> {
    let resolver = catalog.resolver();
    catalog
        .mini_games()
        .iter()
        .map(|game| {
            let label = player.tiers.get(&game.id).copied();
            GameStanding {
                mini_game_id: game.id.clone(),
                mini_game_name: game.name.clone(),
                abbreviation: resolver.format_abbreviation(label),
                tier: label.map(|l| TierDisplay::new(resolver, l)),
            }
        })
        .collect()
}
