use std::path::PathBuf;

/// Errors from content and journal storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// I/O error from the underlying filesystem.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A lock guarding in-memory state was poisoned by a panicking writer.
    #[error("storage lock poisoned")]
    LockPoisoned,

    /// The storage backend refused the operation.
    #[error("storage unavailable")]
    Unavailable,

    /// A record exceeds the configured size limit.
    #[error("record of {size} bytes exceeds limit of {limit} bytes")]
    RecordTooLarge { size: usize, limit: u32 },

    /// A journal name is too long to map to a file name.
    #[error("name of {len} bytes is too long for file-backed storage")]
    NameTooLong { len: usize },

    /// A temporary file could not be moved into place.
    #[error("failed to persist {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
