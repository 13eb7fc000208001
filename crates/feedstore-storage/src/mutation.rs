//! Mutation batches accepted by the storage primitives.
//!
//! A batch is an ordered list of operations handed to a single `commit`
//! call. Backends apply the operations in order.

/// Outcome of a storage commit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CommitResult {
    Success,
    Failure,
}

impl CommitResult {
    pub fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }

    /// `Success` only if both results are `Success`.
    pub fn and(self, other: CommitResult) -> CommitResult {
        if self.is_success() && other.is_success() {
            Self::Success
        } else {
            Self::Failure
        }
    }
}

/// A single operation against content storage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ContentOperation {
    Upsert { key: String, value: Vec<u8> },
    Delete { key: String },
    DeleteAll,
}

/// An ordered batch of content storage operations.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ContentMutation {
    operations: Vec<ContentOperation>,
}

impl ContentMutation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage an insert-or-replace of `key`.
    pub fn upsert(mut self, key: impl Into<String>, value: Vec<u8>) -> Self {
        self.operations.push(ContentOperation::Upsert {
            key: key.into(),
            value,
        });
        self
    }

    /// Stage removal of `key`. Removing an absent key is not an error.
    pub fn delete(mut self, key: impl Into<String>) -> Self {
        self.operations
            .push(ContentOperation::Delete { key: key.into() });
        self
    }

    /// Stage removal of every key.
    pub fn delete_all(mut self) -> Self {
        self.operations.push(ContentOperation::DeleteAll);
        self
    }

    pub fn operations(&self) -> &[ContentOperation] {
        &self.operations
    }

    pub fn into_operations(self) -> Vec<ContentOperation> {
        self.operations
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

/// A single operation against one named journal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JournalOperation {
    /// Append a record. Zero-length records are allowed.
    Append(Vec<u8>),
    /// Replace the journal `to` with the current contents of this journal.
    Copy { to: String },
    /// Remove the journal.
    Delete,
}

/// An ordered batch of operations on one named journal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JournalMutation {
    journal: String,
    operations: Vec<JournalOperation>,
}

impl JournalMutation {
    pub fn new(journal: impl Into<String>) -> Self {
        Self {
            journal: journal.into(),
            operations: Vec::new(),
        }
    }

    pub fn append(mut self, record: Vec<u8>) -> Self {
        self.operations.push(JournalOperation::Append(record));
        self
    }

    pub fn copy(mut self, to: impl Into<String>) -> Self {
        self.operations
            .push(JournalOperation::Copy { to: to.into() });
        self
    }

    pub fn delete(mut self) -> Self {
        self.operations.push(JournalOperation::Delete);
        self
    }

    pub fn journal(&self) -> &str {
        &self.journal
    }

    pub fn operations(&self) -> &[JournalOperation] {
        &self.operations
    }

    /// Returns `true` if every staged operation is an append.
    pub fn is_append_only(&self) -> bool {
        self.operations
            .iter()
            .all(|op| matches!(op, JournalOperation::Append(_)))
    }
}
