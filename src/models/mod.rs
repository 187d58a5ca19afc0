//! Core data models for the tier board.

mod ids;
mod mini_game;
mod player;
mod tier;

pub use ids::*;
pub use mini_game::*;
pub use player::*;
pub use tier::*;
