//! Storage primitives underneath the feed store.
//!
//! The store persists everything through two narrow interfaces:
//!
//! - [`ContentStorage`] -- a key/value space of opaque byte values
//! - [`JournalStorage`] -- named, append-only logs of byte records
//!
//! Both take their writes as ordered mutation batches
//! ([`ContentMutation`], [`JournalMutation`]) and report a
//! [`CommitResult`] per batch.
//!
//! # Backends
//!
//! - [`InMemoryContentStorage`] / [`InMemoryJournalStorage`] -- `HashMap`
//!   based, with failure injection for tests
//! - [`FileContentStorage`] / [`FileJournalStorage`] -- one file per key or
//!   journal under a [`FileStorageConfig`] root
//!
//! # Design Rules
//!
//! 1. Storage never interprets the bytes it holds.
//! 2. Reads of absent keys or journals are not errors.
//! 3. Operations in a batch apply in order.
//! 4. All calls are synchronous; callers choose the thread.

pub mod config;
pub mod error;
pub mod file_content;
pub mod file_journal;
pub mod memory;
pub mod mutation;
mod names;
pub mod traits;

pub use config::{FileStorageConfig, SyncMode};
pub use error::{StorageError, StorageResult};
pub use file_content::FileContentStorage;
pub use file_journal::FileJournalStorage;
pub use memory::{InMemoryContentStorage, InMemoryJournalStorage};
pub use mutation::{
    CommitResult, ContentMutation, ContentOperation, JournalMutation, JournalOperation,
};
pub use traits::{ContentStorage, JournalStorage};
