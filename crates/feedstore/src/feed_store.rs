//! The store handed to feed components.
//!
//! [`FeedStore`] starts on a [`PersistentStore`] and can be switched, once,
//! to a fresh [`EphemeralStore`]. Callers see the same [`Store`] contract
//! either way. Persistent data is neither copied into the ephemeral store
//! nor removed from storage by the switch.

use std::collections::HashSet;
use std::sync::{Arc, PoisonError, RwLock};

use feedstore_storage::{CommitResult, ContentStorage, JournalStorage};
use feedstore_types::{
    LocalAction, PayloadWithId, SemanticPropertiesWithId, Session, StreamSharedState,
    StreamStructure,
};
use tracing::{debug, info};

use crate::clock::{Clock, SystemClock};
use crate::edit::{ActionEdit, ContentEdit, SemanticPropertiesEdit, SessionEdit};
use crate::ephemeral::EphemeralStore;
use crate::error::StoreResult;
use crate::persistent::PersistentStore;
use crate::traits::{AccessibleContentSupplier, GcTask, Store};

/// Observer of store mode changes.
pub trait StoreListener: Send + Sync {
    /// Called after the store has switched to ephemeral mode.
    fn on_switch_to_ephemeral_mode(&self);
}

#[derive(Clone)]
enum Backend {
    Persistent(Arc<PersistentStore>),
    Ephemeral(Arc<EphemeralStore>),
}

impl Backend {
    fn as_store(&self) -> &dyn Store {
        match self {
            Self::Persistent(store) => store.as_ref(),
            Self::Ephemeral(store) => store.as_ref(),
        }
    }
}

/// [`Store`] that dispatches to whichever backend is active.
///
/// Edits are bound to the facade, not to a backend: an edit opened before
/// a mode switch commits to the backend active when `commit` is called.
pub struct FeedStore {
    backend: RwLock<Backend>,
    listeners: RwLock<Vec<Arc<dyn StoreListener>>>,
    clock: Arc<dyn Clock>,
}

impl FeedStore {
    pub fn new(content: Arc<dyn ContentStorage>, journal: Arc<dyn JournalStorage>) -> Self {
        Self::with_clock(content, journal, Arc::new(SystemClock))
    }

    pub fn with_clock(
        content: Arc<dyn ContentStorage>,
        journal: Arc<dyn JournalStorage>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let persistent = PersistentStore::with_clock(content, journal, clock.clone());
        Self {
            backend: RwLock::new(Backend::Persistent(Arc::new(persistent))),
            listeners: RwLock::new(Vec::new()),
            clock,
        }
    }

    fn active(&self) -> Backend {
        self.backend
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn register_listener(&self, listener: Arc<dyn StoreListener>) {
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(listener);
    }

    /// Remove a listener previously passed to [`register_listener`].
    ///
    /// [`register_listener`]: FeedStore::register_listener
    pub fn unregister_listener(&self, listener: &Arc<dyn StoreListener>) {
        let target = Arc::as_ptr(listener) as *const ();
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|l| Arc::as_ptr(l) as *const () != target);
    }

    /// Replace the persistent backend with an empty in-memory one.
    ///
    /// Listeners are notified after the switch. Switching again does
    /// nothing and notifies no one.
    pub fn switch_to_ephemeral_mode(&self) {
        {
            let mut backend = self
                .backend
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            if matches!(*backend, Backend::Ephemeral(_)) {
                debug!("store already in ephemeral mode");
                return;
            }
            *backend = Backend::Ephemeral(Arc::new(EphemeralStore::with_clock(self.clock.clone())));
        }

        let listeners: Vec<Arc<dyn StoreListener>> = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        info!(listeners = listeners.len(), "switched store to ephemeral mode");
        for listener in listeners {
            listener.on_switch_to_ephemeral_mode();
        }
    }

    /// See [`PersistentStore::clear_non_action_content`]. Does nothing and
    /// returns `false` in ephemeral mode.
    pub fn clear_non_action_content(&self) -> bool {
        match self.active() {
            Backend::Persistent(store) => store.clear_non_action_content(),
            Backend::Ephemeral(_) => {
                debug!("clear_non_action_content ignored in ephemeral mode");
                false
            }
        }
    }
}

impl Store for FeedStore {
    fn get_payloads(&self, content_ids: &[String]) -> StoreResult<Vec<PayloadWithId>> {
        self.active().as_store().get_payloads(content_ids)
    }

    fn get_shared_states(&self) -> StoreResult<Vec<StreamSharedState>> {
        self.active().as_store().get_shared_states()
    }

    fn get_stream_structures(&self, session: &Session) -> StoreResult<Vec<StreamStructure>> {
        self.active().as_store().get_stream_structures(session)
    }

    fn get_all_sessions(&self) -> StoreResult<Vec<Session>> {
        self.active().as_store().get_all_sessions()
    }

    fn get_semantic_properties(
        &self,
        content_ids: &[String],
    ) -> StoreResult<Vec<SemanticPropertiesWithId>> {
        self.active().as_store().get_semantic_properties(content_ids)
    }

    fn get_all_dismiss_actions(&self) -> StoreResult<Vec<LocalAction>> {
        self.active().as_store().get_all_dismiss_actions()
    }

    fn create_new_session(&self) -> StoreResult<Session> {
        self.active().as_store().create_new_session()
    }

    fn get_head_session(&self) -> Session {
        self.active().as_store().get_head_session()
    }

    fn remove_session(&self, session: &Session) -> CommitResult {
        self.active().as_store().remove_session(session)
    }

    fn clear_head(&self) -> CommitResult {
        self.active().as_store().clear_head()
    }

    fn edit_content(&self) -> ContentEdit<'_> {
        ContentEdit::new(move |changes| match self.active() {
            Backend::Persistent(store) => store.commit_content(changes),
            Backend::Ephemeral(store) => store.commit_content(changes),
        })
    }

    fn edit_session(&self, session: &Session) -> SessionEdit<'_> {
        let session = session.clone();
        SessionEdit::new(move |structures| match self.active() {
            Backend::Persistent(store) => store.commit_session(&session, structures),
            Backend::Ephemeral(store) => store.commit_session(&session, structures),
        })
    }

    fn edit_semantic_properties(&self) -> SemanticPropertiesEdit<'_> {
        SemanticPropertiesEdit::new(move |changes| match self.active() {
            Backend::Persistent(store) => store.commit_semantic_properties(changes),
            Backend::Ephemeral(store) => store.commit_semantic_properties(changes),
        })
    }

    fn edit_actions(&self) -> ActionEdit<'_> {
        ActionEdit::new(self.clock.as_ref(), move |actions| match self.active() {
            Backend::Persistent(store) => store.commit_actions(actions),
            Backend::Ephemeral(store) => store.commit_actions(actions),
        })
    }

    fn trigger_content_gc(
        &self,
        reserved: HashSet<String>,
        accessible: AccessibleContentSupplier,
    ) -> GcTask {
        self.active()
            .as_store()
            .trigger_content_gc(reserved, accessible)
    }

    fn trigger_action_gc(
        &self,
        actions: Vec<LocalAction>,
        valid_content_ids: HashSet<String>,
    ) -> GcTask {
        self.active()
            .as_store()
            .trigger_action_gc(actions, valid_content_ids)
    }

    fn is_ephemeral_mode(&self) -> bool {
        matches!(self.active(), Backend::Ephemeral(_))
    }

    fn clear_all(&self) -> bool {
        self.active().as_store().clear_all()
    }
}

impl std::fmt::Debug for FeedStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeedStore")
            .field("ephemeral", &self.is_ephemeral_mode())
            .finish_non_exhaustive()
    }
}
