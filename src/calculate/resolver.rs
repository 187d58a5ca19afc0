//! Tier points resolution.
//!
//! The `TierTable` is the single source of truth for what each label is
//! worth. It is validated once when built, so every lookup afterwards is
//! total. The `Catalog` bundles the table with the mini-game list and is
//! shared immutably by every consumer.

use std::collections::{BTreeMap, HashSet};

use serde::Serialize;
use thiserror::Error;

use crate::models::{
    default_mini_games, MiniGame, TierError, TierLabel, TierMetadata, BOTTOM_TIER, TOP_TIER,
};

/// Errors in the configured tier table or mini-game list.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error(transparent)]
    Tier(#[from] TierError),

    #[error("No points configured for tier {0}")]
    MissingTier(String),

    #[error("Retired tier {0} cannot be configured; it scores like its active tier")]
    RetiredTier(String),

    #[error("Tier {0} must be worth at least one point")]
    ZeroPoints(String),

    #[error("Tier {better} ({better_points}) must outscore {worse} ({worse_points})")]
    Ordering {
        better: String,
        better_points: u32,
        worse: String,
        worse_points: u32,
    },

    #[error("At least one mini-game must be configured")]
    NoMiniGames,

    #[error("Duplicate mini-game id: {0}")]
    DuplicateMiniGame(String),

    #[error("Top tier worth {max_points} points across {mini_games} mini-games overflows a player total")]
    PointsOverflow { max_points: u32, mini_games: usize },
}

/// Points per active tier label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierTable {
    points: BTreeMap<TierLabel, u32>,
}

impl TierTable {
    /// Build a table from points keyed by active label.
    ///
    /// Requires all ten active labels, positive values, `high >= low` within
    /// a tier and the low half of a tier strictly above the high half of the
    /// next one.
    pub fn new(points: BTreeMap<TierLabel, u32>) -> Result<Self, CatalogError> {
        if let Some(retired) = points.keys().find(|l| l.is_retired()) {
            return Err(CatalogError::RetiredTier(retired.key()));
        }

        for label in TierLabel::all().filter(|l| !l.is_retired()) {
            match points.get(&label) {
                None => return Err(CatalogError::MissingTier(label.key())),
                Some(0) => return Err(CatalogError::ZeroPoints(label.key())),
                Some(_) => {}
            }
        }

        let table = Self { points };
        table.check_ordering()?;
        Ok(table)
    }

    /// Build a table from store keys such as `"ht1"`.
    pub fn from_keys(points: &BTreeMap<String, u32>) -> Result<Self, CatalogError> {
        let parsed = points
            .iter()
            .map(|(key, &value)| Ok((key.parse::<TierLabel>()?, value)))
            .collect::<Result<BTreeMap<_, _>, CatalogError>>()?;
        Self::new(parsed)
    }

    /// Points keyed by store key, the inverse of `from_keys`.
    pub fn to_keys(&self) -> BTreeMap<String, u32> {
        self.points
            .iter()
            .map(|(label, &points)| (label.key(), points))
            .collect()
    }

    /// The standard table: HT1 = 10 down to LT5 = 1.
    pub fn standard() -> Self {
        let points = TierLabel::all()
            .filter(|l| !l.is_retired())
            .map(|l| {
                let worse_halves = u32::from(BOTTOM_TIER - l.numeric_tier()) * 2;
                (l, worse_halves + if l.is_high() { 2 } else { 1 })
            })
            .collect();
        Self { points }
    }

    /// Points for the best label in the table.
    pub fn max_points(&self) -> u32 {
        self.points.values().copied().max().unwrap_or_default()
    }

    /// Points for any label; retired labels score like their active tier.
    pub fn points(&self, label: TierLabel) -> u32 {
        // Completeness is checked in `new`, so the fallback is unreachable.
        self.points.get(&label.active()).copied().unwrap_or_default()
    }

    fn check_ordering(&self) -> Result<(), CatalogError> {
        let half = |tier, high| {
            let label = TierLabel::new(tier, high, false).ok_or_else(|| {
                CatalogError::MissingTier(format!("{}t{}", if high { "h" } else { "l" }, tier))
            })?;
            Ok::<_, CatalogError>((label, self.points(label)))
        };
        let ordered = |(better, bp): (TierLabel, u32), (worse, wp): (TierLabel, u32), strict| {
            let ok = if strict { bp > wp } else { bp >= wp };
            if ok {
                Ok(())
            } else {
                Err(CatalogError::Ordering {
                    better: better.key(),
                    better_points: bp,
                    worse: worse.key(),
                    worse_points: wp,
                })
            }
        };

        for tier in TOP_TIER..=BOTTOM_TIER {
            ordered(half(tier, true)?, half(tier, false)?, false)?;
            if tier < BOTTOM_TIER {
                ordered(half(tier, false)?, half(tier + 1, true)?, true)?;
            }
        }
        Ok(())
    }
}

impl Default for TierTable {
    fn default() -> Self {
        Self::standard()
    }
}

/// One row of the published tier table.
#[derive(Debug, Clone, Serialize)]
pub struct TierEntry {
    pub key: String,
    pub abbreviation: String,
    pub points: u32,
    #[serde(flatten)]
    pub metadata: TierMetadata,
}

/// Pure lookups over a validated tier table.
#[derive(Debug, Clone, Default)]
pub struct TierResolver {
    table: TierTable,
}

impl TierResolver {
    pub fn new(table: TierTable) -> Self {
        Self { table }
    }

    /// Parse a tier string at a system boundary.
    pub fn resolve(&self, key: &str) -> Result<TierLabel, TierError> {
        key.parse()
    }

    pub fn points_for(&self, label: TierLabel) -> u32 {
        self.table.points(label)
    }

    /// Points for a raw tier string; unknown strings are an error, never zero.
    pub fn points_for_key(&self, key: &str) -> Result<u32, TierError> {
        self.resolve(key).map(|label| self.points_for(label))
    }

    pub fn metadata_for(&self, label: TierLabel) -> TierMetadata {
        label.metadata()
    }

    /// Badge text such as "HT1" or "RLT3"; "N/A" when the player is unrated.
    pub fn format_abbreviation(&self, label: Option<TierLabel>) -> String {
        match label {
            Some(label) => {
                let meta = self.metadata_for(label);
                format!(
                    "{}{}T{}",
                    if meta.is_retired { "R" } else { "" },
                    if meta.is_high { "H" } else { "L" },
                    meta.numeric_tier
                )
            }
            None => "N/A".to_string(),
        }
    }

    /// Every label with its points and metadata, best first.
    pub fn entries(&self) -> Vec<TierEntry> {
        TierLabel::all()
            .map(|label| TierEntry {
                key: label.key(),
                abbreviation: self.format_abbreviation(Some(label)),
                points: self.points_for(label),
                metadata: self.metadata_for(label),
            })
            .collect()
    }
}

/// Immutable configuration shared by every view: mini-games and tier points.
#[derive(Debug, Clone)]
pub struct Catalog {
    mini_games: Vec<MiniGame>,
    resolver: TierResolver,
}

impl Catalog {
    pub fn new(mini_games: Vec<MiniGame>, table: TierTable) -> Result<Self, CatalogError> {
        if mini_games.is_empty() {
            return Err(CatalogError::NoMiniGames);
        }
        let mut seen = HashSet::new();
        for game in &mini_games {
            if !seen.insert(game.id.as_str()) {
                return Err(CatalogError::DuplicateMiniGame(game.id.clone()));
            }
        }

        // A player holds at most one tier per mini-game.
        let max_points = table.max_points();
        if u64::from(max_points) * mini_games.len() as u64 > u64::from(u32::MAX) {
            return Err(CatalogError::PointsOverflow {
                max_points,
                mini_games: mini_games.len(),
            });
        }

        Ok(Self {
            mini_games,
            resolver: TierResolver::new(table),
        })
    }

    /// Default mini-games with the standard tier table.
    pub fn standard() -> Self {
        Self {
            mini_games: default_mini_games(),
            resolver: TierResolver::default(),
        }
    }

    pub fn mini_games(&self) -> &[MiniGame] {
        &self.mini_games
    }

    pub fn mini_game(&self, id: &str) -> Option<&MiniGame> {
        self.mini_games.iter().find(|g| g.id == id)
    }

    /// Check a mini-game id at a system boundary.
    pub fn check_mini_game(&self, id: &str) -> Result<&MiniGame, TierError> {
        self.mini_game(id)
            .ok_or_else(|| TierError::UnknownMiniGame(id.to_string()))
    }

    pub fn resolver(&self) -> &TierResolver {
        &self.resolver
    }
}
