use feedstore_storage::StorageError;
use feedstore_types::TypeError;

/// Errors surfaced by store read accessors and session creation.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The underlying storage primitive failed.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// A record could not be encoded.
    #[error("record error: {0}")]
    Record(#[from] TypeError),

    /// A storage commit reported failure.
    #[error("commit failed: {0}")]
    CommitFailed(String),

    /// In-memory store state was poisoned by a panicking writer.
    #[error("store state lock poisoned")]
    LockPoisoned,
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
