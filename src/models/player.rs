//! Player models.
//!
//! `PlayerRow` is what the store holds; its tier values are unvalidated
//! strings. `PlayerRecord` is the validated form the ranking engine works on.
//! Rank is never read from storage: a legacy `overall_rank` column is
//! ignored on deserialization and never written back.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};

use super::{MiniGameId, PlayerId, TierLabel};

/// An achievement badge shown on a player's profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Badge {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub image_url: String,
}

/// When and by whom a player was last tested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastTested {
    pub date: String,
    pub tester: String,
}

/// A player row as persisted by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRow {
    pub id: PlayerId,

    pub username: String,

    /// Avatar image reference; empty or absent means "use the default"
    #[serde(default)]
    pub skin_url: Option<String>,

    /// Mini-game id -> tier key. `null` or missing means no tiers.
    #[serde(default)]
    pub tiers: Option<BTreeMap<String, Option<String>>>,

    /// Cached sum written alongside the tiers; recomputed on every read
    #[serde(default)]
    pub total_points: Option<i64>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub badges: Vec<Badge>,

    #[serde(default)]
    pub last_tested: Option<LastTested>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// A validated player with derived total points.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerRecord {
    pub id: PlayerId,
    pub username: String,
    pub avatar_url: String,
    pub tiers: BTreeMap<MiniGameId, TierLabel>,
    pub total_points: u32,
    pub badges: Vec<Badge>,
    pub last_tested: Option<LastTested>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// A player annotated with the rank from one ranking pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedPlayer {
    pub overall_rank: u32,
    #[serde(flatten)]
    pub player: PlayerRecord,
}

/// Admin input for creating or replacing a player.
#[derive(Debug, Clone, Deserialize)]
pub struct PlayerDraft {
    pub username: String,

    #[serde(default)]
    pub skin_url: Option<String>,

    #[serde(default)]
    pub tiers: BTreeMap<String, Option<String>>,

    #[serde(default)]
    pub badges: Vec<Badge>,

    #[serde(default)]
    pub last_tested: Option<LastTested>,
}

/// Avatar used when a player has none stored.
pub fn default_avatar_url(username: &str) -> String {
    format!("https://mc-heads.net/avatar/{}/100", username)
}

/// Minecraft account names: 3 to 16 letters, digits or underscores.
pub fn is_valid_username(username: &str) -> bool {
    static USERNAME: OnceLock<Regex> = OnceLock::new();
    USERNAME
        .get_or_init(|| Regex::new(r"^[A-Za-z0-9_]{3,16}$").expect("username pattern"))
        .is_match(username)
}

impl PlayerRow {
    /// Stored avatar, or the default one for this username.
    pub fn avatar_url(&self) -> String {
        match self.skin_url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => url.to_string(),
            _ => default_avatar_url(&self.username),
        }
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_tolerates_nulls_and_missing_fields() {
        let row: PlayerRow = serde_json::from_str(
            r#"{"id":"1","username":"Steve","skin_url":null,"tiers":null,"badges":null}"#,
        )
        .unwrap();

        assert_eq!(row.id.as_str(), "1");
        assert!(row.tiers.is_none());
        assert!(row.badges.is_empty());
        assert!(row.total_points.is_none());
        assert!(row.created_at.is_none());
    }

    #[test]
    fn test_row_ignores_stored_rank() {
        let row: PlayerRow = serde_json::from_str(
            r#"{"id":"1","username":"Alex","overall_rank":"7","tiers":{"vanilla":"ht1","axe":null}}"#,
        )
        .unwrap();

        let tiers = row.tiers.as_ref().unwrap();
        assert_eq!(tiers.get("vanilla"), Some(&Some("ht1".to_string())));
        assert_eq!(tiers.get("axe"), Some(&None));

        let json = serde_json::to_string(&row).unwrap();
        assert!(!json.contains("overall_rank"));
    }

    #[test]
    fn test_avatar_defaults_to_username_head() {
        let mut row: PlayerRow =
            serde_json::from_str(r#"{"id":"1","username":"Notch"}"#).unwrap();
        assert_eq!(row.avatar_url(), "https://mc-heads.net/avatar/Notch/100");

        row.skin_url = Some("   ".to_string());
        assert_eq!(row.avatar_url(), "https://mc-heads.net/avatar/Notch/100");

        row.skin_url = Some("https://cdn.example/notch.png".to_string());
        assert_eq!(row.avatar_url(), "https://cdn.example/notch.png");
    }

    #[test]
    fn test_draft_defaults() {
        let draft: PlayerDraft = serde_json::from_str(r#"{"username":"Herobrine"}"#).unwrap();
        assert!(draft.tiers.is_empty());
        assert!(draft.badges.is_empty());
        assert!(draft.skin_url.is_none());
    }

    #[test]
    fn test_ranked_player_flattens_record() {
        let ranked = RankedPlayer {
            overall_rank: 3,
            player: PlayerRecord {
                id: PlayerId::from("p"),
                username: "Alex".to_string(),
                avatar_url: default_avatar_url("Alex"),
                tiers: BTreeMap::from([("sword".to_string(), "lt2".parse().unwrap())]),
                total_points: 7,
                badges: vec![],
                last_tested: None,
                created_at: None,
                updated_at: None,
            },
        };

        let value = serde_json::to_value(&ranked).unwrap();
        assert_eq!(value["overall_rank"], 3);
        assert_eq!(value["username"], "Alex");
        assert_eq!(value["tiers"]["sword"], "lt2");
        assert_eq!(value["total_points"], 7);
    }

    #[test]
    fn test_username_validation() {
        assert!(is_valid_username("DragonSlayer99"));
        assert!(is_valid_username("Notch"));
        assert!(is_valid_username("a_b"));
        assert!(!is_valid_username("ab"));
        assert!(!is_valid_username("ThisNameIsWayTooLong"));
        assert!(!is_valid_username("New Player"));
        assert!(!is_valid_username(""));
    }
}
