//! Tier labels.
//!
//! A player holds at most one tier label per mini-game. Labels are a fixed
//! set: five numeric tiers, each split into high and low, each of which can
//! be active or retired. The wire form is the short key used by the store,
//! e.g. `ht1`, `lt3`, `rht2`, `rlt5`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Best numeric tier.
pub const TOP_TIER: u8 = 1;

/// Worst numeric tier.
pub const BOTTOM_TIER: u8 = 5;

/// Errors raised when tier data entering the system does not match the
/// configured sets.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TierError {
    #[error("Unknown tier label: {0:?}")]
    UnknownTier(String),

    #[error("Unknown mini-game: {0:?}")]
    UnknownMiniGame(String),
}

/// A discrete tier a player can hold in one mini-game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TierLabel {
    tier: u8,
    high: bool,
    retired: bool,
}

/// Display metadata derived from a label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TierMetadata {
    pub numeric_tier: u8,
    pub is_high: bool,
    pub is_retired: bool,
    pub display_text: String,
}

impl TierLabel {
    /// Build a label; `tier` must be within 1..=5.
    pub fn new(tier: u8, high: bool, retired: bool) -> Option<Self> {
        (TOP_TIER..=BOTTOM_TIER)
            .contains(&tier)
            .then_some(Self {
                tier,
                high,
                retired,
            })
    }

    pub fn numeric_tier(&self) -> u8 {
        self.tier
    }

    pub fn is_high(&self) -> bool {
        self.high
    }

    pub fn is_retired(&self) -> bool {
        self.retired
    }

    /// The same tier and half with the retired flag cleared.
    pub fn active(self) -> Self {
        Self {
            retired: false,
            ..self
        }
    }

    /// Every label, best first: active before retired, high before low.
    pub fn all() -> impl Iterator<Item = TierLabel> {
        [false, true].into_iter().flat_map(|retired| {
            (TOP_TIER..=BOTTOM_TIER).flat_map(move |tier| {
                [true, false].into_iter().map(move |high| TierLabel {
                    tier,
                    high,
                    retired,
                })
            })
        })
    }

    /// Canonical store key, e.g. `rlt3`.
    pub fn key(&self) -> String {
        format!(
            "{}{}t{}",
            if self.retired { "r" } else { "" },
            if self.high { "h" } else { "l" },
            self.tier
        )
    }

    /// Human-readable text, e.g. "Retired Low Tier 3".
    pub fn display_text(&self) -> String {
        format!(
            "{}{} Tier {}",
            if self.retired { "Retired " } else { "" },
            if self.high { "High" } else { "Low" },
            self.tier
        )
    }

    pub fn metadata(&self) -> TierMetadata {
        TierMetadata {
            numeric_tier: self.tier,
            is_high: self.high,
            is_retired: self.retired,
            display_text: self.display_text(),
        }
    }
}

impl FromStr for TierLabel {
    type Err = TierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unknown = || TierError::UnknownTier(s.to_string());
        let lower = s.trim().to_ascii_lowercase();

        let (retired, rest) = match lower.strip_prefix('r') {
            Some(rest) => (true, rest),
            None => (false, lower.as_str()),
        };
        let (high, rest) = if let Some(rest) = rest.strip_prefix("ht") {
            (true, rest)
        } else if let Some(rest) = rest.strip_prefix("lt") {
            (false, rest)
        } else {
            return Err(unknown());
        };

        // Exactly one digit; rejects "ht01", "ht+1" and friends.
        if rest.len() != 1 {
            return Err(unknown());
        }
        let tier: u8 = rest.parse().map_err(|_| unknown())?;
        TierLabel::new(tier, high, retired).ok_or_else(unknown)
    }
}

impl TryFrom<String> for TierLabel {
    type Error = TierError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TierLabel> for String {
    fn from(label: TierLabel) -> Self {
        label.key()
    }
}

impl fmt::Display for TierLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}
