//! In-memory storage primitives for tests and embedding.
//!
//! Both stores keep their data in a `HashMap` behind a `RwLock`. Each
//! commit is applied to a copy of the affected state and swapped in only
//! when every operation succeeded, so a failed commit leaves no trace.
//!
//! Reads and commits can be made to fail on demand, which lets callers
//! exercise their error paths without a real backend.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use tracing::{debug, warn};

use crate::error::{StorageError, StorageResult};
use crate::mutation::{
    CommitResult, ContentMutation, ContentOperation, JournalMutation, JournalOperation,
};
use crate::traits::{ContentStorage, JournalStorage};

/// Toggles that make a store refuse reads or commits.
#[derive(Debug, Default)]
struct FailureSwitch {
    reads: AtomicBool,
    commits: AtomicBool,
}

impl FailureSwitch {
    fn check_read(&self) -> StorageResult<()> {
        if self.reads.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable);
        }
        Ok(())
    }

    fn commits_fail(&self) -> bool {
        self.commits.load(Ordering::SeqCst)
    }
}

/// `HashMap`-backed [`ContentStorage`].
#[derive(Debug, Default)]
pub struct InMemoryContentStorage {
    entries: RwLock<HashMap<String, Vec<u8>>>,
    failures: FailureSwitch,
}

impl InMemoryContentStorage {
    /// Create a new empty content store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent reads fail with [`StorageError::Unavailable`].
    pub fn set_fail_reads(&self, fail: bool) {
        self.failures.reads.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent commits report [`CommitResult::Failure`].
    pub fn set_fail_commits(&self, fail: bool) {
        self.failures.commits.store(fail, Ordering::SeqCst);
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.read().map(|m| m.len()).unwrap_or(0)
    }

    /// Returns `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sorted snapshot of every stored key.
    pub fn keys(&self) -> Vec<String> {
        let mut keys = self
            .entries
            .read()
            .map(|m| m.keys().cloned().collect::<Vec<_>>())
            .unwrap_or_default();
        keys.sort();
        keys
    }

    fn apply(&self, mutation: ContentMutation) -> StorageResult<()> {
        let mut entries = self.entries.write().map_err(|_| StorageError::LockPoisoned)?;
        let mut staged = entries.clone();
        for op in mutation.into_operations() {
            match op {
                ContentOperation::Upsert { key, value } => {
                    staged.insert(key, value);
                }
                ContentOperation::Delete { key } => {
                    staged.remove(&key);
                }
                ContentOperation::DeleteAll => staged.clear(),
            }
        }
        *entries = staged;
        Ok(())
    }
}

impl ContentStorage for InMemoryContentStorage {
    fn get(&self, keys: &[String]) -> StorageResult<HashMap<String, Vec<u8>>> {
        self.failures.check_read()?;
        let entries = self.entries.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(keys
            .iter()
            .filter_map(|key| entries.get(key).map(|value| (key.clone(), value.clone())))
            .collect())
    }

    fn get_all(&self, prefix: &str) -> StorageResult<HashMap<String, Vec<u8>>> {
        self.failures.check_read()?;
        let entries = self.entries.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(entries
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect())
    }

    fn get_all_keys(&self) -> StorageResult<Vec<String>> {
        self.failures.check_read()?;
        let entries = self.entries.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(entries.keys().cloned().collect())
    }

    fn commit(&self, mutation: ContentMutation) -> CommitResult {
        if self.failures.commits_fail() {
            warn!(operations = mutation.len(), "content commit refused");
            return CommitResult::Failure;
        }
        let operations = mutation.len();
        match self.apply(mutation) {
            Ok(()) => {
                debug!(operations, "content commit");
                CommitResult::Success
            }
            Err(e) => {
                warn!(error = %e, "content commit failed");
                CommitResult::Failure
            }
        }
    }
}

/// `HashMap`-backed [`JournalStorage`].
///
/// A journal exists once it has been appended to or copied into, even if it
/// holds no records.
#[derive(Debug, Default)]
pub struct InMemoryJournalStorage {
    journals: RwLock<HashMap<String, Vec<Vec<u8>>>>,
    failures: FailureSwitch,
}

impl InMemoryJournalStorage {
    /// Create a new storage with no journals.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent reads fail with [`StorageError::Unavailable`].
    pub fn set_fail_reads(&self, fail: bool) {
        self.failures.reads.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent commits and `delete_all` report [`CommitResult::Failure`].
    pub fn set_fail_commits(&self, fail: bool) {
        self.failures.commits.store(fail, Ordering::SeqCst);
    }

    /// Returns `true` if `journal` exists.
    pub fn contains(&self, journal: &str) -> bool {
        self.journals
            .read()
            .map(|m| m.contains_key(journal))
            .unwrap_or(false)
    }

    fn apply(&self, mutation: JournalMutation) -> StorageResult<()> {
        let mut journals = self.journals.write().map_err(|_| StorageError::LockPoisoned)?;
        let name = mutation.journal().to_string();
        let mut image = journals.get(&name).cloned();
        let mut copies = Vec::new();
        for op in mutation.operations() {
            match op {
                JournalOperation::Append(record) => {
                    image.get_or_insert_with(Vec::new).push(record.clone());
                }
                JournalOperation::Copy { to } => {
                    copies.push((to.clone(), image.clone().unwrap_or_default()));
                }
                JournalOperation::Delete => image = None,
            }
        }
        for (to, records) in copies {
            journals.insert(to, records);
        }
        match image {
            Some(records) => {
                journals.insert(name, records);
            }
            None => {
                journals.remove(&name);
            }
        }
        Ok(())
    }
}

impl JournalStorage for InMemoryJournalStorage {
    fn read(&self, journal: &str) -> StorageResult<Vec<Vec<u8>>> {
        self.failures.check_read()?;
        let journals = self.journals.read().map_err(|_| StorageError::LockPoisoned)?;
        Ok(journals.get(journal).cloned().unwrap_or_default())
    }

    fn get_all_journals(&self) -> StorageResult<Vec<String>> {
        self.failures.check_read()?;
        let journals = self.journals.read().map_err(|_| StorageError::LockPoisoned)?;
        let mut names: Vec<String> = journals.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    fn commit(&self, mutation: JournalMutation) -> CommitResult {
        if self.failures.commits_fail() {
            warn!(journal = mutation.journal(), "journal commit refused");
            return CommitResult::Failure;
        }
        let journal = mutation.journal().to_string();
        match self.apply(mutation) {
            Ok(()) => {
                debug!(%journal, "journal commit");
                CommitResult::Success
            }
            Err(e) => {
                warn!(%journal, error = %e, "journal commit failed");
                CommitResult::Failure
            }
        }
    }

    fn delete_all(&self) -> CommitResult {
        if self.failures.commits_fail() {
            warn!("journal delete_all refused");
            return CommitResult::Failure;
        }
        match self.journals.write() {
            Ok(mut journals) => {
                journals.clear();
                CommitResult::Success
            }
            Err(_) => {
                warn!("journal delete_all failed: lock poisoned");
                CommitResult::Failure
            }
        }
    }
}
