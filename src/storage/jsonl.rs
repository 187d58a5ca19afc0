//! JSONL (JSON Lines) storage.
//!
//! Each line is a valid JSON object representing one row. Rewrites go
//! through a temporary file and a rename, so readers never see a torn file.
//! Lines that fail to parse are skipped on read and written back verbatim.

use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::marker::PhantomData;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::{PlayerStore, StorageConfig, StorageError};
use crate::models::{PlayerId, PlayerRow};

/// JSONL file writer.
pub struct JsonlWriter<T> {
    path: PathBuf,
    _marker: PhantomData<T>,
}

impl<T: Serialize> JsonlWriter<T> {
    /// Create a new JSONL writer for the given path.
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            _marker: PhantomData,
        }
    }

    /// Ensure the parent directory exists.
    fn ensure_dir(&self) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        Ok(())
    }

    /// Append a single entity to the file.
    pub fn append(&self, entity: &T) -> Result<(), StorageError> {
        self.ensure_dir()?;

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let mut writer = BufWriter::new(file);
        let json = serde_json::to_string(entity)?;
        writeln!(writer, "{}", json)?;
        writer.flush()?;

        debug!("Appended entity to {:?}", self.path);
        Ok(())
    }

    /// Write entities, replacing the entire file.
    pub fn write_all(&self, entities: &[T]) -> Result<usize, StorageError> {
        let lines = entities
            .iter()
            .map(serde_json::to_string)
            .collect::<Result<Vec<_>, _>>()?;
        self.write_lines(&lines)
    }

    /// Write pre-encoded lines verbatim, replacing the entire file.
    pub fn write_lines(&self, lines: &[String]) -> Result<usize, StorageError> {
        self.ensure_dir()?;

        let tmp_path = self.path.with_extension("jsonl.tmp");
        let file = File::create(&tmp_path)?;
        let mut writer = BufWriter::new(file);

        for line in lines {
            writeln!(writer, "{}", line)?;
        }

        writer.flush()?;
        drop(writer);
        fs::rename(&tmp_path, &self.path)?;
        info!("Wrote {} lines to {:?}", lines.len(), self.path);

        Ok(lines.len())
    }
}

/// JSONL file reader.
pub struct JsonlReader<T> {
    path: PathBuf,
    _marker: PhantomData<T>,
}

impl<T: DeserializeOwned> JsonlReader<T> {
    /// Create a new JSONL reader for the given path.
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            _marker: PhantomData,
        }
    }

    /// Check if the file exists.
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Read all entities from the file. Unparseable lines are skipped.
    pub fn read_all(&self) -> Result<Vec<T>, StorageError> {
        let entities: Vec<T> = self
            .read_lines()?
            .into_iter()
            .filter_map(|line| match line {
                Line::Parsed(entity) => Some(entity),
                Line::Raw(_) => None,
            })
            .collect();

        debug!("Read {} entities from {:?}", entities.len(), self.path);
        Ok(entities)
    }

    /// Read every non-blank line, keeping the text of lines that fail to
    /// parse so a rewrite can put them back unchanged.
    pub fn read_lines(&self) -> Result<Vec<Line<T>>, StorageError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = File::open(&self.path)?;
        let reader = BufReader::new(file);
        let mut lines = Vec::new();

        for (idx, line) in reader.lines().enumerate() {
            let line = line?;

            if line.trim().is_empty() {
                continue;
            }

            match serde_json::from_str(&line) {
                Ok(entity) => lines.push(Line::Parsed(entity)),
                Err(e) => {
                    warn!("Failed to parse line {} in {:?}: {}", idx + 1, self.path, e);
                    lines.push(Line::Raw(line));
                }
            }
        }

        Ok(lines)
    }
}

/// One line of a JSONL file.
#[derive(Debug, Clone, PartialEq)]
pub enum Line<T> {
    Parsed(T),
    /// Text that did not parse, kept verbatim.
    Raw(String),
}

/// The `id` field of a line that failed to parse as a full row, if any.
fn raw_id(line: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(line).ok()?;
    value.get("id")?.as_str().map(str::to_string)
}

/// Player store backed by a single local JSONL file.
pub struct JsonlPlayerStore {
    reader: JsonlReader<PlayerRow>,
    writer: JsonlWriter<PlayerRow>,
    // Serializes read-modify-write cycles within this process.
    lock: Mutex<()>,
}

impl JsonlPlayerStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            reader: JsonlReader::new(path.clone()),
            writer: JsonlWriter::new(path),
            lock: Mutex::new(()),
        }
    }

    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(config.players_path())
    }
}

#[async_trait]
impl PlayerStore for JsonlPlayerStore {
    fn name(&self) -> &'static str {
        "jsonl"
    }

    async fn list(&self) -> Result<Vec<PlayerRow>, StorageError> {
        let _guard = self.lock.lock().await;
        self.reader.read_all()
    }

    async fn get(&self, id: &PlayerId) -> Result<Option<PlayerRow>, StorageError> {
        let _guard = self.lock.lock().await;
        Ok(self.reader.read_all()?.into_iter().find(|r| &r.id == id))
    }

    async fn insert(&self, row: PlayerRow) -> Result<PlayerRow, StorageError> {
        let _guard = self.lock.lock().await;
        let taken = self
            .reader
            .read_lines()?
            .iter()
            .any(|line| line_id(line).as_deref() == Some(row.id.as_str()));
        if taken {
            return Err(StorageError::Conflict(row.id));
        }
        self.writer.append(&row)?;
        Ok(row)
    }

    async fn update(&self, row: PlayerRow) -> Result<PlayerRow, StorageError> {
        let _guard = self.lock.lock().await;
        let mut lines = self.reader.read_lines()?;
        // An unreadable line with this id is replaced too, so a bad row can
        // be repaired through the store.
        let slot = lines
            .iter_mut()
            .find(|line| line_id(line).as_deref() == Some(row.id.as_str()))
            .ok_or_else(|| StorageError::NotFound(row.id.clone()))?;
        *slot = Line::Parsed(row.clone());
        self.writer.write_lines(&encode(&lines)?)?;
        Ok(row)
    }

    async fn delete(&self, id: &PlayerId) -> Result<(), StorageError> {
        let _guard = self.lock.lock().await;
        let mut lines = self.reader.read_lines()?;
        let before = lines.len();
        lines.retain(|line| line_id(line).as_deref() != Some(id.as_str()));
        if lines.len() == before {
            return Err(StorageError::NotFound(id.clone()));
        }
        self.writer.write_lines(&encode(&lines)?)?;
        Ok(())
    }
}

fn line_id(line: &Line<PlayerRow>) -> Option<String> {
    match line {
        Line::Parsed(row) => Some(row.id.as_str().to_string()),
        Line::Raw(text) => raw_id(text),
    }
}

fn encode(lines: &[Line<PlayerRow>]) -> Result<Vec<String>, StorageError> {
    lines
        .iter()
        .map(|line| -> Result<String, StorageError> {
            match line {
                Line::Parsed(row) => Ok(serde_json::to_string(row)?),
                Line::Raw(text) => Ok(text.clone()),
            }
        })
        .collect()
}
