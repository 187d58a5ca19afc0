//! Player storage.
//!
//! The store is an external collaborator: it holds player rows and answers
//! single-row reads and writes. Each write is atomic on its own; there are
//! no multi-row transactions and concurrent edits are last-write-wins.
//!
//! - **jsonl**: local JSONL file, one row per line
//! - **rest**: a hosted PostgREST-style players table

mod jsonl;
mod rest;

pub use jsonl::*;
pub use rest::*;

use std::path::PathBuf;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{PlayerId, PlayerRow};

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status}: {message}")]
    HttpStatus { status: u16, message: String },

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Player not found: {0}")]
    NotFound(PlayerId),

    #[error("Player already exists: {0}")]
    Conflict(PlayerId),
}

/// Access to the players table.
#[async_trait]
pub trait PlayerStore: Send + Sync {
    /// Backend identifier for logging.
    fn name(&self) -> &'static str;

    /// Every stored row, in storage order.
    async fn list(&self) -> Result<Vec<PlayerRow>, StorageError>;

    async fn get(&self, id: &PlayerId) -> Result<Option<PlayerRow>, StorageError>;

    /// Insert a new row and return it as stored.
    async fn insert(&self, row: PlayerRow) -> Result<PlayerRow, StorageError>;

    /// Replace an existing row and return it as stored.
    async fn update(&self, row: PlayerRow) -> Result<PlayerRow, StorageError>;

    async fn delete(&self, id: &PlayerId) -> Result<(), StorageError>;
}

/// Configuration for local storage paths.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

impl StorageConfig {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    pub fn players_path(&self) -> PathBuf {
        self.data_dir.join("players.jsonl")
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::new(PathBuf::from("./data"))
    }
}
