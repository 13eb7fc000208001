use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Flush strategy for file-backed storage.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// `fsync` every file touched by a commit before reporting success.
    EveryCommit,
    /// Rely on OS page-cache buffering.
    #[default]
    OsDefault,
}

/// Configuration for [`FileContentStorage`](crate::FileContentStorage) and
/// [`FileJournalStorage`](crate::FileJournalStorage).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileStorageConfig {
    /// Directory holding the `content/` and `journals/` trees.
    pub root: PathBuf,
    /// Sync strategy applied on commit.
    pub sync_mode: SyncMode,
    /// Largest accepted record or value, in bytes (default: 16 MiB).
    pub max_record_size: u32,
}

impl Default for FileStorageConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("feedstore"),
            sync_mode: SyncMode::default(),
            max_record_size: 16 * 1024 * 1024,
        }
    }
}

impl FileStorageConfig {
    /// Default configuration rooted at `root`.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            ..Default::default()
        }
    }

    pub fn content_dir(&self) -> PathBuf {
        self.root.join("content")
    }

    pub fn journal_dir(&self) -> PathBuf {
        self.root.join("journals")
    }

    /// Scratch directory for files that are renamed into place.
    pub fn staging_dir(&self) -> PathBuf {
        self.root.join("staging")
    }
}
