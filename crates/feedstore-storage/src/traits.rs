//! The storage primitives the feed store is built on.
//!
//! Hosts may supply their own implementations; this crate ships in-memory
//! and file-backed ones. All calls are synchronous and may block.

use std::collections::HashMap;

use crate::error::StorageResult;
use crate::mutation::{CommitResult, ContentMutation, JournalMutation};

/// Key/value storage for opaque content bytes.
///
/// Implementations must apply each [`ContentMutation`] in operation order
/// and report the outcome of the whole batch as one [`CommitResult`].
pub trait ContentStorage: Send + Sync {
    /// Fetch the values stored under `keys`.
    ///
    /// Keys with no stored value are omitted from the returned map.
    fn get(&self, keys: &[String]) -> StorageResult<HashMap<String, Vec<u8>>>;

    /// Fetch every entry whose key starts with `prefix`.
    fn get_all(&self, prefix: &str) -> StorageResult<HashMap<String, Vec<u8>>>;

    /// List every key currently stored.
    fn get_all_keys(&self) -> StorageResult<Vec<String>>;

    /// Apply a batch of upserts and deletes.
    fn commit(&self, mutation: ContentMutation) -> CommitResult;
}

/// Storage for named, append-only journals of byte records.
pub trait JournalStorage: Send + Sync {
    /// Read every record of `journal` in append order.
    ///
    /// A journal that does not exist reads as empty.
    fn read(&self, journal: &str) -> StorageResult<Vec<Vec<u8>>>;

    /// List the names of all existing journals.
    fn get_all_journals(&self) -> StorageResult<Vec<String>>;

    /// Apply a batch of operations to one journal.
    fn commit(&self, mutation: JournalMutation) -> CommitResult;

    /// Remove every journal.
    fn delete_all(&self) -> CommitResult;
}
