//! Content and journal store for a client-side feed.
//!
//! The store keeps the payloads a feed displays, the structural history of
//! each feed session, caller-defined semantic properties and the user's
//! local actions. It sits on the two primitives of `feedstore-storage` and
//! removes what the feed can no longer reach.
//!
//! # Backends
//!
//! All backends implement the [`Store`] trait:
//!
//! - [`PersistentStore`] -- content and journal storage supplied by the host
//! - [`EphemeralStore`] -- instance-owned maps, nothing persisted, GC disabled
//! - [`FeedStore`] -- starts persistent, switchable once to ephemeral mode
//!
//! # Garbage Collection
//!
//! [`Store::trigger_content_gc`] and [`Store::trigger_action_gc`] build a
//! pass and return it as a [`GcTask`] for the caller to run on a thread of
//! its choosing. See [`gc`] for the reachability rules.
//!
//! # Design Rules
//!
//! 1. Stored bytes are decoded defensively; a corrupt record is skipped.
//! 2. The head session always exists and cannot be removed.
//! 3. Shared states are never collected.
//! 4. Multi-step operations report partial failure but do not roll back.

pub mod clock;
pub mod edit;
pub mod ephemeral;
pub mod error;
pub mod feed_store;
pub mod gc;
pub mod helper;
pub mod keys;
pub mod persistent;
pub mod traits;

pub use clock::{Clock, FixedClock, SystemClock};
pub use edit::{
    ActionEdit, ContentChange, ContentEdit, SemanticPropertiesChange, SemanticPropertiesEdit,
    SessionEdit,
};
pub use ephemeral::EphemeralStore;
pub use error::{StoreError, StoreResult};
pub use feed_store::{FeedStore, StoreListener};
pub use gc::{ActionGc, ContentGc, GcReport};
pub use helper::StoreHelper;
pub use persistent::PersistentStore;
pub use traits::{AccessibleContentSupplier, GcTask, Store};
