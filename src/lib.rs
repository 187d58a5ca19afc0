//! # Tier Board
//!
//! A Minecraft PvP tier list: players hold a tier in each mini-game, tiers
//! are worth points, and the overall leaderboard ranks players by their
//! point totals.
//!
//! ## Architecture
//!
//! - **models**: Core data structures (tier labels, mini-games, players)
//! - **calculate**: Tier points, ranking and derived views
//! - **storage**: Player stores (local JSONL, hosted REST table)
//! - **live**: Polling feed that keeps the ranked leaderboard current
//! - **api**: REST API endpoints
//! - **config**: Configuration loading and validation
//! - **seed**: Bulk player import

pub mod api;
pub mod calculate;
pub mod config;
pub mod live;
pub mod models;
pub mod seed;
pub mod storage;

pub use models::*;

use std::time::Duration;

/// Parse a human-friendly duration string (e.g., "6h", "30m", "90s").
pub fn parse_duration(s: &str) -> Option<Duration> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    let (num_str, multiplier) = if let Some(n) = s.strip_suffix('h') {
        (n, 3600)
    } else if let Some(n) = s.strip_suffix('m') {
        (n, 60)
    } else if let Some(n) = s.strip_suffix('s') {
        (n, 1)
    } else {
        // Default to seconds
        (s, 1)
    };

    let num: u64 = num_str.parse().ok()?;
    Some(Duration::from_secs(num.checked_mul(multiplier)?))
}
