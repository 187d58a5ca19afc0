//! Route handlers, one module per resource.

pub mod admin;
pub mod config;
pub mod leaderboard;
pub mod minigames;
pub mod players;
