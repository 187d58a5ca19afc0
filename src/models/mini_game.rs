//! Mini-game categories.

use serde::{Deserialize, Serialize};

/// Key of a mini-game in a player's tier map.
pub type MiniGameId = String;

/// A competitive category players are tiered in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MiniGame {
    /// Unique key, matched exactly (e.g. "potPvp")
    pub id: MiniGameId,

    /// Display name (e.g. "Pot PvP")
    pub name: String,

    /// Community invite link, if the mini-game has one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub community_link: Option<String>,
}

impl MiniGame {
    pub fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            community_link: None,
        }
    }

    pub fn with_community_link(mut self, link: String) -> Self {
        self.community_link = Some(link);
        self
    }
}

/// The mini-games tracked out of the box.
pub fn default_mini_games() -> Vec<MiniGame> {
    [
        ("vanilla", "Vanilla"),
        ("UHC", "UHC"),
        ("potPvp", "Pot PvP"),
        ("netherite", "Netherite"),
        ("smp", "SMP"),
        ("sword", "Sword"),
        ("axe", "Axe"),
        ("mace", "Mace"),
    ]
    .into_iter()
    .map(|(id, name)| MiniGame::new(id, name))
    .collect()
}
