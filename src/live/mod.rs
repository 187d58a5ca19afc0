//! Live leaderboard feed.
//!
//! A background task polls the player store on a fixed interval and keeps
//! the latest ranking in a `watch` channel. Every fetch carries a sequence
//! number; a result is applied only if it is newer than the last applied
//! one, so a slow response can never overwrite a fresher board.
//!
//! Dropping the [`FeedHandle`] stops the timer and any in-flight fetches.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::calculate::{RankedBoard, RankingEngine, RejectedTier};
use crate::models::{fingerprint, RankedPlayer};
use crate::storage::{PlayerStore, StorageError};

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Live feed has stopped")]
    Stopped,
}

/// The most recently applied ranking.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub players: Arc<Vec<RankedPlayer>>,
    pub rejected: Arc<Vec<RejectedTier>>,

    /// Content hash of `players`; equal versions mean identical boards
    pub version: String,

    /// Sequence number of the fetch that produced this snapshot
    pub sequence: u64,

    /// When the store was last read successfully
    pub fetched_at: Option<DateTime<Utc>>,

    /// Error from the latest fetch, if it failed
    pub last_error: Option<String>,
}

impl Snapshot {
    fn empty() -> Self {
        Self {
            players: Arc::new(Vec::new()),
            rejected: Arc::new(Vec::new()),
            version: board_version(&[]),
            sequence: 0,
            fetched_at: None,
            last_error: None,
        }
    }

    /// Whether at least one fetch has succeeded.
    pub fn is_loaded(&self) -> bool {
        self.fetched_at.is_some()
    }
}

/// Version hash over the serialized board.
pub fn board_version(players: &[RankedPlayer]) -> String {
    let json = serde_json::to_string(players).unwrap_or_default();
    fingerprint(&[json.as_str()])
}

/// Applies fetch results in sequence order.
struct Publisher {
    tx: watch::Sender<Snapshot>,
    applied: u64,
}

impl Publisher {
    fn new(tx: watch::Sender<Snapshot>) -> Self {
        Self { tx, applied: 0 }
    }

    /// Returns false when the result was stale and dropped.
    fn apply(&mut self, sequence: u64, result: Result<RankedBoard, StorageError>) -> bool {
        if sequence <= self.applied {
            debug!(
                sequence,
                applied = self.applied,
                "Dropping stale leaderboard fetch"
            );
            return false;
        }
        self.applied = sequence;

        match result {
            Ok(board) => {
                let version = board_version(&board.players);
                debug!(sequence, %version, players = board.players.len(), "Applying leaderboard");
                self.tx.send_modify(|snapshot| {
                    snapshot.players = Arc::new(board.players);
                    snapshot.rejected = Arc::new(board.rejected);
                    snapshot.version = version;
                    snapshot.sequence = sequence;
                    snapshot.fetched_at = Some(Utc::now());
                    snapshot.last_error = None;
                });
            }
            Err(e) => {
                warn!(sequence, "Leaderboard fetch failed, keeping previous snapshot: {}", e);
                self.tx.send_modify(|snapshot| {
                    snapshot.sequence = sequence;
                    snapshot.last_error = Some(e.to_string());
                });
            }
        }
        true
    }
}

/// Replies with the sequence number assigned to the requested fetch.
type RefreshRequest = oneshot::Sender<u64>;

/// Polls a store and ranks what it returns.
pub struct LiveFeed {
    store: Arc<dyn PlayerStore>,
    engine: RankingEngine,
    poll_interval: Duration,
}

impl LiveFeed {
    pub fn new(store: Arc<dyn PlayerStore>, engine: RankingEngine, poll_interval: Duration) -> Self {
        Self {
            store,
            engine,
            poll_interval,
        }
    }

    /// Read and rank the store once.
    pub async fn fetch(
        store: &dyn PlayerStore,
        engine: &RankingEngine,
    ) -> Result<RankedBoard, StorageError> {
        let rows = store.list().await?;
        Ok(engine.rank_rows(rows))
    }

    /// Start polling. The first fetch is issued immediately.
    pub fn spawn(self) -> FeedHandle {
        let (snapshot_tx, snapshot_rx) = watch::channel(Snapshot::empty());
        let (refresh_tx, refresh_rx) = mpsc::channel(8);

        info!(
            store = self.store.name(),
            interval = ?self.poll_interval,
            "Starting live leaderboard feed"
        );
        let task = tokio::spawn(self.run(Publisher::new(snapshot_tx), refresh_rx));

        FeedHandle {
            snapshot: snapshot_rx,
            refresh_tx,
            task,
        }
    }

    async fn run(self, mut publisher: Publisher, mut refresh_rx: mpsc::Receiver<RefreshRequest>) {
        let mut ticker = interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        // Dropped along with this future, which aborts every pending fetch.
        let mut fetches: JoinSet<(u64, Result<RankedBoard, StorageError>)> = JoinSet::new();
        let mut issued: u64 = 0;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    issued += 1;
                    self.start_fetch(&mut fetches, issued);
                }
                Some(reply) = refresh_rx.recv() => {
                    issued += 1;
                    self.start_fetch(&mut fetches, issued);
                    // The requester may have given up waiting.
                    let _ = reply.send(issued);
                }
                Some(joined) = fetches.join_next(), if !fetches.is_empty() => {
                    match joined {
                        Ok((sequence, result)) => {
                            publisher.apply(sequence, result);
                        }
                        Err(e) => warn!("Leaderboard fetch task failed: {}", e),
                    }
                }
            }
        }
    }

    fn start_fetch(
        &self,
        fetches: &mut JoinSet<(u64, Result<RankedBoard, StorageError>)>,
        sequence: u64,
    ) {
        let store = Arc::clone(&self.store);
        let engine = self.engine.clone();
        fetches.spawn(async move { (sequence, Self::fetch(store.as_ref(), &engine).await) });
    }
}

/// Owner of a running feed.
pub struct FeedHandle {
    snapshot: watch::Receiver<Snapshot>,
    refresh_tx: mpsc::Sender<RefreshRequest>,
    task: JoinHandle<()>,
}

impl FeedHandle {
    /// The latest applied snapshot.
    pub fn snapshot(&self) -> Snapshot {
        self.snapshot.borrow().clone()
    }

    /// Receiver notified whenever a fetch result is applied.
    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshot.clone()
    }

    /// Ask for a fetch now without waiting for it.
    pub fn refresh(&self) {
        let (reply, _) = oneshot::channel();
        if self.refresh_tx.try_send(reply).is_err() {
            debug!("Refresh already queued");
        }
    }

    /// Fetch now and wait until a result at least that fresh is applied.
    pub async fn refresh_and_wait(&self) -> Result<Snapshot, FeedError> {
        let (reply, assigned) = oneshot::channel();
        self.refresh_tx
            .send(reply)
            .await
            .map_err(|_| FeedError::Stopped)?;
        let sequence = assigned.await.map_err(|_| FeedError::Stopped)?;

        let mut rx = self.snapshot.clone();
        let snapshot = rx
            .wait_for(|s| s.sequence >= sequence)
            .await
            .map_err(|_| FeedError::Stopped)?;
        Ok(snapshot.clone())
    }

    /// Wait for the first successful fetch.
    pub async fn loaded(&self) -> Result<Snapshot, FeedError> {
        let mut rx = self.snapshot.clone();
        let snapshot = rx
            .wait_for(Snapshot::is_loaded)
            .await
            .map_err(|_| FeedError::Stopped)?;
        Ok(snapshot.clone())
    }

    pub fn shutdown(self) {
        // Drop aborts the task.
    }
}

impl Drop for FeedHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}
