//! Snapshot store: persistence of the latest scoreboard per resource key.
//!
//! One JSON file per key, written through the `FileSystem` port:
//!
//! ```text
//! <root>/
//!   ├── scoreboard_2023_123456.json
//!   └── scoreboard_2024_123456.json
//! ```
//!
//! Saves go to a sibling `.tmp` file first and are renamed into place, so a
//! crash mid-write leaves the previous snapshot intact.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::StoreError;
use crate::model::{ResourceKey, Scoreboard};
use crate::ports::FileSystem;

/// Persistence layer for scoreboard snapshots.
#[derive(Clone)]
pub struct SnapshotStore {
    fs: Arc<dyn FileSystem>,
    root: PathBuf,
}

impl SnapshotStore {
    /// Creates a new store rooted at the given path.
    #[must_use]
    pub fn new(fs: Arc<dyn FileSystem>, root: &Path) -> Self {
        Self { fs, root: root.to_path_buf() }
    }

    /// Directory holding the snapshot files.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Loads the snapshot stored for `key`.
    ///
    /// Returns `Ok(None)` when nothing was saved yet.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the file exists but cannot be read and
    /// [`StoreError::Corrupt`] if it cannot be parsed or violates an invariant.
    pub fn load(&self, key: ResourceKey) -> Result<Option<Scoreboard>, StoreError> {
        let path = self.snapshot_path(key);
        if !self.fs.exists(&path) {
            tracing::info!(leaderboard = %key, path = %path.display(), "no stored snapshot");
            return Ok(None);
        }
        let contents = self
            .fs
            .read_to_string(&path)
            .map_err(|e| StoreError::Io { path: path.clone(), message: e.to_string() })?;
        let board: Scoreboard = serde_json::from_str(&contents)
            .map_err(|e| StoreError::Corrupt { path: path.clone(), reason: e.to_string() })?;
        if board.key() != key {
            return Err(StoreError::Corrupt {
                path,
                reason: format!("file holds scoreboard {}", board.key()),
            });
        }
        tracing::debug!(leaderboard = %key, members = board.member_count(), "loaded snapshot");
        Ok(Some(board))
    }

    /// Saves `board` as the latest snapshot for its key.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or file writing fails.
    pub fn save(&self, board: &Scoreboard) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(board)?;
        let path = self.snapshot_path(board.key());
        let staging = path.with_extension("json.tmp");
        self.fs
            .write(&staging, &json)
            .map_err(|e| StoreError::Io { path: staging.clone(), message: e.to_string() })?;
        self.fs
            .rename(&staging, &path)
            .map_err(|e| StoreError::Io { path: path.clone(), message: e.to_string() })?;
        tracing::debug!(leaderboard = %board.key(), path = %path.display(), "saved snapshot");
        Ok(())
    }

    /// Path of the snapshot file for `key`.
    #[must_use]
    pub fn snapshot_path(&self, key: ResourceKey) -> PathBuf {
        self.root.join(format!("scoreboard_{}_{}.json", key.year, key.owner_id))
    }
}
