//! The [`Store`] contract shared by every backend.

use std::collections::HashSet;

use feedstore_storage::CommitResult;
use feedstore_types::{
    LocalAction, PayloadWithId, SemanticPropertiesWithId, Session, StreamSharedState,
    StreamStructure,
};

use crate::edit::{ActionEdit, ContentEdit, SemanticPropertiesEdit, SessionEdit};
use crate::error::StoreResult;

/// A deferred unit of work, such as a GC pass, for the caller to run on a
/// thread of its choosing.
pub type GcTask = Box<dyn FnOnce() + Send + 'static>;

/// Lazily computes the content ids that are currently displayable.
///
/// Evaluated once, when the GC pass runs.
pub type AccessibleContentSupplier = Box<dyn FnOnce() -> HashSet<String> + Send + 'static>;

/// Persistence for one feed's content, sessions, semantic properties and
/// local actions.
///
/// Every call is synchronous and may block on storage. Implementations take
/// no cross-call locks: callers are expected to serialize writes.
pub trait Store: Send + Sync {
    /// Payloads stored under `content_ids`, in request order.
    ///
    /// Ids with no stored payload are omitted.
    fn get_payloads(&self, content_ids: &[String]) -> StoreResult<Vec<PayloadWithId>>;

    /// Every stored shared state.
    fn get_shared_states(&self) -> StoreResult<Vec<StreamSharedState>>;

    /// Structural records of `session` in append order.
    ///
    /// An unknown session yields an empty list.
    fn get_stream_structures(&self, session: &Session) -> StoreResult<Vec<StreamStructure>>;

    /// Every session except the head.
    fn get_all_sessions(&self) -> StoreResult<Vec<Session>>;

    /// Semantic properties stored for `content_ids`, in request order.
    fn get_semantic_properties(
        &self,
        content_ids: &[String],
    ) -> StoreResult<Vec<SemanticPropertiesWithId>>;

    /// Every recorded dismiss action, oldest first.
    fn get_all_dismiss_actions(&self) -> StoreResult<Vec<LocalAction>>;

    /// Create a session whose structures start as a copy of the head's.
    fn create_new_session(&self) -> StoreResult<Session>;

    /// The head session.
    fn get_head_session(&self) -> Session;

    /// Delete a session's structures.
    ///
    /// # Panics
    ///
    /// Panics if `session` is the head session.
    fn remove_session(&self, session: &Session) -> CommitResult;

    /// Reset the head session to an empty structure list.
    fn clear_head(&self) -> CommitResult;

    fn edit_content(&self) -> ContentEdit<'_>;

    fn edit_session(&self, session: &Session) -> SessionEdit<'_>;

    fn edit_semantic_properties(&self) -> SemanticPropertiesEdit<'_>;

    fn edit_actions(&self) -> ActionEdit<'_>;

    /// Build a content GC pass without running it.
    ///
    /// Content ids in `reserved` or returned by `accessible` survive, as do
    /// their semantic properties, the semantic properties of any content
    /// with a recorded action, and all shared states.
    fn trigger_content_gc(
        &self,
        reserved: HashSet<String>,
        accessible: AccessibleContentSupplier,
    ) -> GcTask;

    /// Build an action-journal compaction pass without running it.
    ///
    /// Only `actions` whose content id is in `valid_content_ids` survive.
    fn trigger_action_gc(
        &self,
        actions: Vec<LocalAction>,
        valid_content_ids: HashSet<String>,
    ) -> GcTask;

    fn is_ephemeral_mode(&self) -> bool;

    /// Remove all content and sessions, then recreate an empty head.
    ///
    /// Returns `false` if any step failed. Steps that succeeded before the
    /// failure are not rolled back.
    fn clear_all(&self) -> bool;
}
