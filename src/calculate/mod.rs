//! Points and ranking.
//!
//! - **resolver**: tier label -> points and display metadata, plus the
//!   immutable `Catalog` every view shares
//! - **ranking**: total points and dense overall ranks
//! - **views**: per-mini-game tier lists, profiles and search over a ranking

mod ranking;
mod resolver;
mod views;

pub use ranking::*;
pub use resolver::*;
pub use views::*;
