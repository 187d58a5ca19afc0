//! Bulk loading of players from a JSON file.
//!
//! Each entry goes through the same strict validation as an admin write.
//! Entries that fail validation are reported and skipped; the rest are
//! inserted, or replace the stored row when the id already exists.

use std::path::Path;

use chrono::Utc;
use serde::Deserialize;
use tracing::{info, warn};

use crate::calculate::RankingEngine;
use crate::models::{PlayerDraft, PlayerId};
use crate::storage::{PlayerStore, StorageError};

/// One player in a seed file. Entries without an id get a fresh one.
#[derive(Debug, Clone, Deserialize)]
pub struct SeedEntry {
    #[serde(default)]
    pub id: Option<String>,

    #[serde(flatten)]
    pub draft: PlayerDraft,
}

/// Result of a seed run.
#[derive(Debug, Default)]
pub struct SeedReport {
    pub created: usize,
    pub updated: usize,
    pub errors: Vec<String>,
}

/// Parse a seed file: a JSON array of entries.
pub fn read_seed_file(path: &Path) -> Result<Vec<SeedEntry>, StorageError> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Validate and write `entries`. With `dry_run` nothing is written.
pub async fn seed_players(
    store: &dyn PlayerStore,
    engine: &RankingEngine,
    entries: Vec<SeedEntry>,
    dry_run: bool,
) -> Result<SeedReport, StorageError> {
    info!("Seeding {} players into {} store", entries.len(), store.name());
    let mut report = SeedReport::default();

    for entry in entries {
        let id = entry.id.map(PlayerId::new).unwrap_or_else(PlayerId::generate);
        let username = entry.draft.username.clone();

        let mut row = match engine.prepare_row(id, entry.draft) {
            Ok(row) => row,
            Err(e) => {
                warn!("Skipping {:?}: {}", username, e);
                report.errors.push(format!("{}: {}", username, e));
                continue;
            }
        };

        let existing = store.get(&row.id).await?;
        info!(
            "  - {} ({} points){}",
            row.username,
            row.total_points.unwrap_or_default(),
            if existing.is_some() { " [update]" } else { "" }
        );
        if dry_run {
            continue;
        }

        let now = Utc::now();
        row.updated_at = Some(now);
        match existing {
            Some(existing) => {
                row.created_at = existing.created_at.or(Some(now));
                store.update(row).await?;
                report.updated += 1;
            }
            None => {
                row.created_at = Some(now);
                store.insert(row).await?;
                report.created += 1;
            }
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculate::Catalog;
    use crate::storage::JsonlPlayerStore;
    use std::sync::Arc;

    const SEED: &str = r#"[
        {"id": "1", "username": "DragonSlayer99", "tiers": {"vanilla": "ht1", "sword": "ht1"},
         "badges": [{"id": "1", "name": "Tournament Winner", "image_url": "/trophy.png"}],
         "last_tested": {"date": "2023-05-10", "tester": "MainAdmin"}},
        {"username": "EnderQueen", "tiers": {"vanilla": "lt1"}},
        {"id": "3", "username": "Broken", "tiers": {"vanilla": "mid"}}
    ]"#;

    fn engine() -> RankingEngine {
        RankingEngine::new(Arc::new(Catalog::standard()))
    }

    #[tokio::test]
    async fn test_seed_creates_then_updates() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("seed.json");
        std::fs::write(&path, SEED).unwrap();
        let store = JsonlPlayerStore::new(tmp.path().join("players.jsonl"));

        let entries = read_seed_file(&path).unwrap();
        assert_eq!(entries.len(), 3);

        let report = seed_players(&store, &engine(), entries, false).await.unwrap();
        assert_eq!(report.created, 2);
        assert_eq!(report.updated, 0);
        assert_eq!(report.errors.len(), 1);
        assert!(report.errors[0].starts_with("Broken"));

        let dragon = store.get(&PlayerId::from("1")).await.unwrap().unwrap();
        assert_eq!(dragon.total_points, Some(20));
        assert_eq!(dragon.badges.len(), 1);
        assert_eq!(dragon.last_tested.unwrap().tester, "MainAdmin");
        let created_at = dragon.created_at;

        // Re-seeding keeps ids stable and creation times intact.
        let report = seed_players(&store, &engine(), read_seed_file(&path).unwrap(), false)
            .await
            .unwrap();
        assert_eq!(report.updated, 1);
        assert_eq!(report.created, 1);
        let dragon = store.get(&PlayerId::from("1")).await.unwrap().unwrap();
        assert_eq!(dragon.created_at, created_at);
    }

    #[tokio::test]
    async fn test_seed_dry_run_writes_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let store = JsonlPlayerStore::new(tmp.path().join("players.jsonl"));
        let entries: Vec<SeedEntry> = serde_json::from_str(SEED).unwrap();

        let report = seed_players(&store, &engine(), entries, true).await.unwrap();
        assert_eq!(report.created, 0);
        assert!(store.list().await.unwrap().is_empty());
    }
}
