//! In-memory store for sessions that must leave nothing behind.
//!
//! [`EphemeralStore`] keeps every collection in maps owned by the store
//! instance. Nothing is written to storage and GC requests are no-ops.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use feedstore_storage::CommitResult;
use feedstore_types::{
    ActionType, LocalAction, PayloadWithId, SemanticPropertiesWithId, Session, StreamPayload,
    StreamSharedState, StreamStructure,
};
use tracing::{debug, warn};

use crate::clock::{Clock, SystemClock};
use crate::edit::{
    ActionEdit, ContentChange, ContentEdit, SemanticPropertiesChange, SemanticPropertiesEdit,
    SessionEdit,
};
use crate::error::{StoreError, StoreResult};
use crate::helper::StoreHelper;
use crate::keys::HEAD_SESSION_TOKEN;
use crate::traits::{AccessibleContentSupplier, GcTask, Store};

#[derive(Debug)]
struct EphemeralState {
    payloads: HashMap<String, StreamPayload>,
    shared_states: HashMap<String, StreamSharedState>,
    semantic_properties: HashMap<String, Vec<u8>>,
    sessions: HashMap<Session, Vec<StreamStructure>>,
    dismiss_actions: Vec<LocalAction>,
}

impl EphemeralState {
    fn new(head: Session) -> Self {
        let mut sessions = HashMap::new();
        sessions.insert(head, Vec::new());
        Self {
            payloads: HashMap::new(),
            shared_states: HashMap::new(),
            semantic_properties: HashMap::new(),
            sessions,
            dismiss_actions: Vec::new(),
        }
    }
}

/// [`Store`] that lives entirely in memory.
///
/// Reads only fail if a writer panicked while holding the state lock.
pub struct EphemeralStore {
    state: RwLock<EphemeralState>,
    clock: Arc<dyn Clock>,
    helper: StoreHelper,
}

impl EphemeralStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        let helper = StoreHelper;
        Self {
            state: RwLock::new(EphemeralState::new(helper.head_session())),
            clock,
            helper,
        }
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, EphemeralState>> {
        self.state.read().map_err(|_| StoreError::LockPoisoned)
    }

    /// Apply `f` under the write lock; a poisoned lock fails the commit.
    fn write<F>(&self, f: F) -> CommitResult
    where
        F: FnOnce(&mut EphemeralState),
    {
        let mut state: RwLockWriteGuard<'_, EphemeralState> = match self.state.write() {
            Ok(state) => state,
            Err(_) => {
                warn!("ephemeral store state lock poisoned; commit rejected");
                return CommitResult::Failure;
            }
        };
        f(&mut state);
        CommitResult::Success
    }

    pub(crate) fn commit_content(&self, changes: Vec<ContentChange>) -> CommitResult {
        self.write(|state| {
            for change in changes {
                match change {
                    ContentChange::Upsert(PayloadWithId {
                        content_id,
                        payload: StreamPayload::SharedState(shared),
                    }) => {
                        state.shared_states.insert(content_id, shared);
                    }
                    ContentChange::Upsert(PayloadWithId {
                        content_id,
                        payload,
                    }) => {
                        state.payloads.insert(content_id, payload);
                    }
                    ContentChange::Delete(content_id) => {
                        state.payloads.remove(&content_id);
                    }
                    ContentChange::DeleteSharedState(content_id) => {
                        state.shared_states.remove(&content_id);
                    }
                }
            }
        })
    }

    pub(crate) fn commit_session(
        &self,
        session: &Session,
        structures: Vec<StreamStructure>,
    ) -> CommitResult {
        if structures.is_empty() {
            return CommitResult::Success;
        }
        self.write(|state| {
            state
                .sessions
                .entry(session.clone())
                .or_default()
                .extend(structures);
        })
    }

    pub(crate) fn commit_semantic_properties(
        &self,
        changes: Vec<SemanticPropertiesChange>,
    ) -> CommitResult {
        self.write(|state| {
            for change in changes {
                match change {
                    SemanticPropertiesChange::Upsert(SemanticPropertiesWithId {
                        content_id,
                        properties,
                    }) => {
                        state.semantic_properties.insert(content_id, properties);
                    }
                    SemanticPropertiesChange::Delete(content_id) => {
                        state.semantic_properties.remove(&content_id);
                    }
                }
            }
        })
    }

    pub(crate) fn commit_actions(
        &self,
        actions: BTreeMap<ActionType, Vec<LocalAction>>,
    ) -> CommitResult {
        self.write(|state| {
            for (action_type, batch) in actions {
                match action_type {
                    ActionType::Dismiss => state.dismiss_actions.extend(batch),
                }
            }
        })
    }
}

impl Default for EphemeralStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EphemeralStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EphemeralStore").finish_non_exhaustive()
    }
}

impl Store for EphemeralStore {
    fn get_payloads(&self, content_ids: &[String]) -> StoreResult<Vec<PayloadWithId>> {
        let state = self.read()?;
        Ok(content_ids
            .iter()
            .filter_map(|id| {
                state
                    .payloads
                    .get(id)
                    .map(|payload| PayloadWithId::new(id.clone(), payload.clone()))
            })
            .collect())
    }

    fn get_shared_states(&self) -> StoreResult<Vec<StreamSharedState>> {
        let state = self.read()?;
        let mut entries: Vec<(&String, &StreamSharedState)> = state.shared_states.iter().collect();
        entries.sort_by(|(a, _), (b, _)| a.cmp(b));
        Ok(entries.into_iter().map(|(_, s)| s.clone()).collect())
    }

    fn get_stream_structures(&self, session: &Session) -> StoreResult<Vec<StreamStructure>> {
        let state = self.read()?;
        Ok(state.sessions.get(session).cloned().unwrap_or_default())
    }

    fn get_all_sessions(&self) -> StoreResult<Vec<Session>> {
        let state = self.read()?;
        let mut sessions: Vec<Session> = state
            .sessions
            .keys()
            .filter(|session| session.token() != HEAD_SESSION_TOKEN)
            .cloned()
            .collect();
        sessions.sort_by(|a, b| a.token().cmp(b.token()));
        Ok(sessions)
    }

    fn get_semantic_properties(
        &self,
        content_ids: &[String],
    ) -> StoreResult<Vec<SemanticPropertiesWithId>> {
        let state = self.read()?;
        Ok(content_ids
            .iter()
            .filter_map(|id| {
                state
                    .semantic_properties
                    .get(id)
                    .map(|properties| SemanticPropertiesWithId::new(id.clone(), properties.clone()))
            })
            .collect())
    }

    fn get_all_dismiss_actions(&self) -> StoreResult<Vec<LocalAction>> {
        Ok(self.read()?.dismiss_actions.clone())
    }

    fn create_new_session(&self) -> StoreResult<Session> {
        let session = self.helper.new_session();
        let head = self.helper.head_session();
        let mut state = self.state.write().map_err(|_| StoreError::LockPoisoned)?;
        let structures = state.sessions.get(&head).cloned().unwrap_or_default();
        state.sessions.insert(session.clone(), structures);
        debug!(%session, "created ephemeral session");
        Ok(session)
    }

    fn get_head_session(&self) -> Session {
        self.helper.head_session()
    }

    fn remove_session(&self, session: &Session) -> CommitResult {
        assert!(
            session.token() != HEAD_SESSION_TOKEN,
            "the head session cannot be removed"
        );
        self.write(|state| {
            state.sessions.remove(session);
        })
    }

    fn clear_head(&self) -> CommitResult {
        let head = self.helper.head_session();
        self.write(|state| {
            state.sessions.insert(head, Vec::new());
        })
    }

    fn edit_content(&self) -> ContentEdit<'_> {
        ContentEdit::new(move |changes| self.commit_content(changes))
    }

    fn edit_session(&self, session: &Session) -> SessionEdit<'_> {
        let session = session.clone();
        SessionEdit::new(move |structures| self.commit_session(&session, structures))
    }

    fn edit_semantic_properties(&self) -> SemanticPropertiesEdit<'_> {
        SemanticPropertiesEdit::new(move |changes| self.commit_semantic_properties(changes))
    }

    fn edit_actions(&self) -> ActionEdit<'_> {
        ActionEdit::new(self.clock.as_ref(), move |actions| self.commit_actions(actions))
    }

    fn trigger_content_gc(
        &self,
        _reserved: HashSet<String>,
        _accessible: AccessibleContentSupplier,
    ) -> GcTask {
        Box::new(|| debug!("content GC skipped in ephemeral mode"))
    }

    fn trigger_action_gc(
        &self,
        _actions: Vec<LocalAction>,
        _valid_content_ids: HashSet<String>,
    ) -> GcTask {
        Box::new(|| debug!("action GC skipped in ephemeral mode"))
    }

    fn is_ephemeral_mode(&self) -> bool {
        true
    }

    fn clear_all(&self) -> bool {
        let head = self.helper.head_session();
        self.write(|state| *state = EphemeralState::new(head))
            .is_success()
    }
}
