use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::config::{FileStorageConfig, SyncMode};
use crate::error::{StorageError, StorageResult};
use crate::mutation::{CommitResult, JournalMutation, JournalOperation};
use crate::names::{decode_file_name, file_path, JOURNAL_EXTENSION};
use crate::traits::JournalStorage;

/// Header size: 4 bytes length + 4 bytes CRC.
const HEADER_SIZE: usize = 8;

/// [`JournalStorage`] keeping one framed log file per journal.
///
/// On-disk record format:
/// ```text
/// [4 bytes: record length (little-endian u32)]
/// [4 bytes: CRC32 of payload (little-endian u32)]
/// [N bytes: payload, N may be zero]
/// ```
///
/// Commits made only of appends extend the file in place. Any commit that
/// copies or deletes materializes the resulting journal and renames it into
/// place, so the journal is never left half rewritten.
pub struct FileJournalStorage {
    dir: PathBuf,
    config: FileStorageConfig,
    commit_lock: Mutex<()>,
}

impl FileJournalStorage {
    /// Open (or create) journal storage under `config.root`.
    pub fn open(config: FileStorageConfig) -> StorageResult<Self> {
        let dir = config.journal_dir();
        fs::create_dir_all(&dir)?;
        fs::create_dir_all(config.staging_dir())?;
        Ok(Self {
            dir,
            config,
            commit_lock: Mutex::new(()),
        })
    }

    /// Directory holding the journal files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, journal: &str) -> StorageResult<PathBuf> {
        file_path(&self.dir, journal, JOURNAL_EXTENSION)
            .ok_or(StorageError::NameTooLong { len: journal.len() })
    }

    fn check_size(&self, record: &[u8]) -> StorageResult<()> {
        if record.len() > self.config.max_record_size as usize {
            return Err(StorageError::RecordTooLarge {
                size: record.len(),
                limit: self.config.max_record_size,
            });
        }
        Ok(())
    }

    /// Current records of `journal`, or `None` if it does not exist.
    fn load(&self, journal: &str) -> StorageResult<Option<Vec<Vec<u8>>>> {
        // A name with no file name was never written.
        let Ok(path) = self.path_for(journal) else {
            return Ok(None);
        };
        match fs::read(path) {
            Ok(data) => Ok(Some(decode_records(&data, journal).records)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Append after the last intact frame.
    ///
    /// A torn tail left by an interrupted append is cut off first; frames
    /// written after it would otherwise be unreadable.
    fn append_in_place(&self, journal: &str, records: &[&[u8]]) -> StorageResult<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .open(self.path_for(journal)?)?;
        let mut data = Vec::new();
        file.read_to_end(&mut data)?;
        let intact = decode_records(&data, journal).intact_len;
        if intact < data.len() {
            warn!(
                journal,
                dropped = data.len() - intact,
                "truncating torn journal tail before append"
            );
            file.set_len(intact as u64)?;
        }
        file.seek(SeekFrom::Start(intact as u64))?;

        let mut writer = BufWriter::new(file);
        for record in records {
            write_frame(&mut writer, record)?;
        }
        writer.flush()?;
        if matches!(self.config.sync_mode, SyncMode::EveryCommit) {
            writer.get_ref().sync_all()?;
        }
        Ok(())
    }

    fn replace(&self, journal: &str, records: &[Vec<u8>]) -> StorageResult<()> {
        let path = self.path_for(journal)?;
        let mut staged = NamedTempFile::new_in(self.config.staging_dir())?;
        {
            let mut writer = BufWriter::new(staged.as_file_mut());
            for record in records {
                write_frame(&mut writer, record)?;
            }
            writer.flush()?;
        }
        if matches!(self.config.sync_mode, SyncMode::EveryCommit) {
            staged.as_file().sync_all()?;
        }
        staged.persist(&path).map_err(|e| StorageError::Persist {
            path,
            source: e.error,
        })?;
        Ok(())
    }

    fn remove(&self, journal: &str) -> StorageResult<()> {
        match fs::remove_file(self.path_for(journal)?) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn apply(&self, mutation: &JournalMutation) -> StorageResult<()> {
        for op in mutation.operations() {
            if let JournalOperation::Append(record) = op {
                self.check_size(record)?;
            }
        }

        let _guard = self.commit_lock.lock().map_err(|_| StorageError::LockPoisoned)?;
        let journal = mutation.journal();
        self.path_for(journal)?;

        if mutation.operations().is_empty() {
            return Ok(());
        }

        if mutation.is_append_only() {
            let records: Vec<&[u8]> = mutation
                .operations()
                .iter()
                .filter_map(|op| match op {
                    JournalOperation::Append(record) => Some(record.as_slice()),
                    _ => None,
                })
                .collect();
            return self.append_in_place(journal, &records);
        }

        let mut image = self.load(journal)?;
        let mut copies = Vec::new();
        for op in mutation.operations() {
            match op {
                JournalOperation::Append(record) => {
                    image.get_or_insert_with(Vec::new).push(record.clone());
                }
                JournalOperation::Copy { to } => {
                    self.path_for(to)?;
                    copies.push((to.as_str(), image.clone().unwrap_or_default()));
                }
                JournalOperation::Delete => image = None,
            }
        }
        for (to, records) in &copies {
            self.replace(to, records)?;
        }
        match image {
            Some(records) => self.replace(journal, &records),
            None => self.remove(journal),
        }
    }

    fn journal_files(&self) -> StorageResult<Vec<(String, PathBuf)>> {
        let mut journals = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let entry = entry?;
            if let Some(name) = decode_file_name(&entry.file_name(), JOURNAL_EXTENSION) {
                journals.push((name, entry.path()));
            }
        }
        Ok(journals)
    }
}

impl JournalStorage for FileJournalStorage {
    fn read(&self, journal: &str) -> StorageResult<Vec<Vec<u8>>> {
        Ok(self.load(journal)?.unwrap_or_default())
    }

    fn get_all_journals(&self) -> StorageResult<Vec<String>> {
        let mut names: Vec<String> = self
            .journal_files()?
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        names.sort();
        Ok(names)
    }

    fn commit(&self, mutation: JournalMutation) -> CommitResult {
        match self.apply(&mutation) {
            Ok(()) => {
                debug!(
                    journal = mutation.journal(),
                    operations = mutation.operations().len(),
                    "journal commit"
                );
                CommitResult::Success
            }
            Err(e) => {
                warn!(journal = mutation.journal(), error = %e, "journal commit failed");
                CommitResult::Failure
            }
        }
    }

    fn delete_all(&self) -> CommitResult {
        let result = (|| -> StorageResult<usize> {
            let _guard = self.commit_lock.lock().map_err(|_| StorageError::LockPoisoned)?;
            let files = self.journal_files()?;
            for (_, path) in &files {
                fs::remove_file(path)?;
            }
            Ok(files.len())
        })();
        match result {
            Ok(removed) => {
                debug!(removed, "all journals deleted");
                CommitResult::Success
            }
            Err(e) => {
                warn!(error = %e, "journal delete_all failed");
                CommitResult::Failure
            }
        }
    }
}

impl std::fmt::Debug for FileJournalStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileJournalStorage")
            .field("dir", &self.dir)
            .finish()
    }
}

fn write_frame<W: Write>(writer: &mut W, record: &[u8]) -> io::Result<()> {
    let length = record.len() as u32;
    let crc = crc32fast::hash(record);
    writer.write_all(&length.to_le_bytes())?;
    writer.write_all(&crc.to_le_bytes())?;
    writer.write_all(record)
}

/// Records recovered from a journal file.
struct Decoded {
    records: Vec<Vec<u8>>,
    /// Length of the prefix made of complete frames.
    intact_len: usize,
}

/// Split a journal file into its records.
///
/// A record whose CRC does not match is skipped. A truncated tail (a torn
/// append) ends the scan; everything before it is returned.
fn decode_records(data: &[u8], journal: &str) -> Decoded {
    let mut records = Vec::new();
    let mut offset = 0usize;

    while offset < data.len() {
        if offset + HEADER_SIZE > data.len() {
            warn!(journal, offset, "truncated journal header; stopping read");
            break;
        }
        let header = &data[offset..offset + HEADER_SIZE];
        let length = u32::from_le_bytes([header[0], header[1], header[2], header[3]]) as usize;
        let expected_crc = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);

        let start = offset + HEADER_SIZE;
        let end = start + length;
        if end > data.len() {
            warn!(journal, offset, length, "truncated journal record; stopping read");
            break;
        }

        let payload = &data[start..end];
        let actual_crc = crc32fast::hash(payload);
        if actual_crc == expected_crc {
            records.push(payload.to_vec());
        } else {
            warn!(
                journal,
                offset,
                expected = expected_crc,
                actual = actual_crc,
                "CRC mismatch; skipping journal record"
            );
        }
        offset = end;
    }

    Decoded {
        records,
        intact_len: offset,
    }
}
