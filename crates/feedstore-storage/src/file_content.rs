use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::config::{FileStorageConfig, SyncMode};
use crate::error::{StorageError, StorageResult};
use crate::mutation::{CommitResult, ContentMutation, ContentOperation};
use crate::names::{
    decode_file_name, file_path, has_extension, hashed_file_path, CONTENT_EXTENSION,
    KEYED_CONTENT_EXTENSION,
};
use crate::traits::ContentStorage;

/// How a value file relates to its key.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Layout {
    /// The file name encodes the key; the file holds the bare value.
    Named,
    /// The file name is a key digest; the file holds
    /// `[u32 LE key length][key][value]`.
    Keyed,
}

/// [`ContentStorage`] keeping one file per key.
///
/// Values are written to a staging file and renamed into place, so a reader
/// never observes a partially written value. Operations within one commit
/// are applied in order; if one fails, the ones before it stay applied.
///
/// Keys too long for a hex file name are stored under their BLAKE3 digest
/// with the key written at the head of the file.
pub struct FileContentStorage {
    dir: PathBuf,
    config: FileStorageConfig,
    commit_lock: Mutex<()>,
}

impl FileContentStorage {
    /// Open (or create) content storage under `config.root`.
    pub fn open(config: FileStorageConfig) -> StorageResult<Self> {
        let dir = config.content_dir();
        fs::create_dir_all(&dir)?;
        fs::create_dir_all(config.staging_dir())?;
        Ok(Self {
            dir,
            config,
            commit_lock: Mutex::new(()),
        })
    }

    /// Directory holding the value files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn locate(&self, key: &str) -> (PathBuf, Layout) {
        match file_path(&self.dir, key, CONTENT_EXTENSION) {
            Some(path) => (path, Layout::Named),
            None => (
                hashed_file_path(&self.dir, key, KEYED_CONTENT_EXTENSION),
                Layout::Keyed,
            ),
        }
    }

    fn read_value(&self, key: &str) -> StorageResult<Option<Vec<u8>>> {
        let (path, layout) = self.locate(key);
        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(match layout {
            Layout::Named => Some(data),
            Layout::Keyed => match split_keyed(&data) {
                Some((stored, value)) if stored == key => Some(value.to_vec()),
                Some((stored, _)) => {
                    warn!(key, stored, "content digest collision; treating key as absent");
                    None
                }
                None => {
                    warn!(path = ?path, "corrupt keyed content file; treating key as absent");
                    None
                }
            },
        })
    }

    /// Every (key, path) pair currently on disk, with the value when it had
    /// to be read to recover the key.
    fn list(&self) -> StorageResult<Vec<(String, PathBuf, Option<Vec<u8>>)>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            let file_name = entry.file_name();
            if let Some(key) = decode_file_name(&file_name, CONTENT_EXTENSION) {
                entries.push((key, entry.path(), None));
                continue;
            }
            if !has_extension(&file_name, KEYED_CONTENT_EXTENSION) {
                debug!(path = ?entry.path(), "ignoring foreign file in content dir");
                continue;
            }
            let data = match fs::read(entry.path()) {
                Ok(data) => data,
                // Deleted between listing and reading.
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };
            match split_keyed(&data) {
                Some((key, value)) => {
                    entries.push((key.to_string(), entry.path(), Some(value.to_vec())))
                }
                None => warn!(path = ?entry.path(), "skipping corrupt keyed content file"),
            }
        }
        Ok(entries)
    }

    fn write_value(&self, key: &str, value: &[u8]) -> StorageResult<()> {
        if value.len() > self.config.max_record_size as usize {
            return Err(StorageError::RecordTooLarge {
                size: value.len(),
                limit: self.config.max_record_size,
            });
        }
        let (path, layout) = self.locate(key);
        let mut staged = NamedTempFile::new_in(self.config.staging_dir())?;
        if layout == Layout::Keyed {
            staged.write_all(&(key.len() as u32).to_le_bytes())?;
            staged.write_all(key.as_bytes())?;
        }
        staged.write_all(value)?;
        if matches!(self.config.sync_mode, SyncMode::EveryCommit) {
            staged.as_file().sync_all()?;
        }
        staged.persist(&path).map_err(|e| StorageError::Persist {
            path,
            source: e.error,
        })?;
        Ok(())
    }

    fn remove(path: &Path) -> StorageResult<()> {
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn apply(&self, mutation: ContentMutation) -> StorageResult<()> {
        let _guard = self.commit_lock.lock().map_err(|_| StorageError::LockPoisoned)?;
        for op in mutation.into_operations() {
            match op {
                ContentOperation::Upsert { key, value } => self.write_value(&key, &value)?,
                ContentOperation::Delete { key } => {
                    let (path, layout) = self.locate(&key);
                    // A keyed file owned by a colliding key is left alone.
                    if layout == Layout::Named || self.read_value(&key)?.is_some() {
                        Self::remove(&path)?;
                    }
                }
                ContentOperation::DeleteAll => {
                    for (_, path, _) in self.list()? {
                        Self::remove(&path)?;
                    }
                }
            }
        }
        Ok(())
    }
}

/// Split a keyed file into its key and value.
fn split_keyed(data: &[u8]) -> Option<(&str, &[u8])> {
    let header: [u8; 4] = data.get(..4)?.try_into().ok()?;
    let key_len = u32::from_le_bytes(header) as usize;
    let key = data.get(4..4 + key_len)?;
    Some((std::str::from_utf8(key).ok()?, &data[4 + key_len..]))
}

impl ContentStorage for FileContentStorage {
    fn get(&self, keys: &[String]) -> StorageResult<HashMap<String, Vec<u8>>> {
        let mut found = HashMap::with_capacity(keys.len());
        for key in keys {
            if let Some(value) = self.read_value(key)? {
                found.insert(key.clone(), value);
            }
        }
        Ok(found)
    }

    fn get_all(&self, prefix: &str) -> StorageResult<HashMap<String, Vec<u8>>> {
        let mut found = HashMap::new();
        for (key, path, value) in self.list()? {
            if !key.starts_with(prefix) {
                continue;
            }
            if let Some(value) = value {
                found.insert(key, value);
                continue;
            }
            match fs::read(&path) {
                Ok(value) => {
                    found.insert(key, value);
                }
                // Deleted between listing and reading.
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(found)
    }

    fn get_all_keys(&self) -> StorageResult<Vec<String>> {
        Ok(self.list()?.into_iter().map(|(key, _, _)| key).collect())
    }

    fn commit(&self, mutation: ContentMutation) -> CommitResult {
        let operations = mutation.len();
        match self.apply(mutation) {
            Ok(()) => {
                debug!(operations, "content commit");
                CommitResult::Success
            }
            Err(e) => {
                warn!(operations, error = %e, "content commit failed");
                CommitResult::Failure
            }
        }
    }
}

impl std::fmt::Debug for FileContentStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileContentStorage")
            .field("dir", &self.dir)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open(dir: &Path) -> FileContentStorage {
        FileContentStorage::open(FileStorageConfig::new(dir)).unwrap()
    }

    #[test]
    fn upsert_get_and_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let storage = open(dir.path());
        let result = storage.commit(
            ContentMutation::new()
                .upsert("c1", b"payload".to_vec())
                .upsert("sp::c1", b"props".to_vec()),
        );
        assert!(result.is_success());
        drop(storage);

        let storage = open(dir.path());
        let found = storage
            .get(&["c1".to_string(), "missing".to_string()])
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found["c1"], b"payload");
    }

    #[test]
    fn get_all_by_prefix_and_keys() {
        let dir = tempfile::tempdir().unwrap();
        let storage = open(dir.path());
        storage.commit(
            ContentMutation::new()
                .upsert("ss::a", vec![1])
                .upsert("ss::b", vec![2])
                .upsert("c1", vec![3]),
        );
        assert_eq!(storage.get_all("ss::").unwrap().len(), 2);

        let mut keys = storage.get_all_keys().unwrap();
        keys.sort();
        assert_eq!(keys, vec!["c1", "ss::a", "ss::b"]);
    }

    #[test]
    fn delete_and_delete_all() {
        let dir = tempfile::tempdir().unwrap();
        let storage = open(dir.path());
        storage.commit(
            ContentMutation::new()
                .upsert("a", vec![1])
                .upsert("b", vec![2])
                .upsert("c", vec![3]),
        );
        storage.commit(ContentMutation::new().delete("a").delete("never-written"));
        assert_eq!(storage.get_all_keys().unwrap().len(), 2);

        storage.commit(ContentMutation::new().delete_all());
        assert!(storage.get_all_keys().unwrap().is_empty());
    }

    #[test]
    fn oversized_value_fails_commit() {
        let dir = tempfile::tempdir().unwrap();
        let config = FileStorageConfig {
            max_record_size: 4,
            ..FileStorageConfig::new(dir.path())
        };
        let storage = FileContentStorage::open(config).unwrap();
        let result = storage.commit(ContentMutation::new().upsert("a", vec![0; 5]));
        assert_eq!(result, CommitResult::Failure);
        assert!(storage.get_all_keys().unwrap().is_empty());
    }

    #[test]
    fn long_keys_are_stored_and_listed() {
        let dir = tempfile::tempdir().unwrap();
        let storage = open(dir.path());
        let long = format!("sp::{}", "c".repeat(200));
        let result = storage.commit(
            ContentMutation::new()
                .upsert(long.as_str(), b"props".to_vec())
                .upsert("short", b"x".to_vec()),
        );
        assert!(result.is_success());

        let found = storage.get(&[long.clone(), "short".to_string()]).unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[&long], b"props");
        assert_eq!(storage.get_all("sp::").unwrap()[&long], b"props");

        let mut keys = storage.get_all_keys().unwrap();
        keys.sort();
        assert_eq!(keys, vec![long.clone(), "short".to_string()]);

        storage.commit(ContentMutation::new().delete(long.as_str()));
        assert!(storage.get(&[long]).unwrap().is_empty());
        assert_eq!(storage.get_all_keys().unwrap(), vec!["short".to_string()]);
    }

    #[test]
    fn key_length_boundary_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let storage = open(dir.path());
        let named = "k".repeat(124);
        let keyed = "k".repeat(125);
        storage.commit(
            ContentMutation::new()
                .upsert(named.as_str(), vec![1])
                .upsert(keyed.as_str(), vec![2]),
        );

        let found = storage.get(&[named.clone(), keyed.clone()]).unwrap();
        assert_eq!(found[&named], vec![1]);
        assert_eq!(found[&keyed], vec![2]);

        storage.commit(ContentMutation::new().delete_all());
        assert!(storage.get_all_keys().unwrap().is_empty());
    }

    #[test]
    fn foreign_files_are_not_keys() {
        let dir = tempfile::tempdir().unwrap();
        let storage = open(dir.path());
        fs::write(storage.dir().join("notes.txt"), b"hi").unwrap();
        assert!(storage.get_all_keys().unwrap().is_empty());
    }
}
