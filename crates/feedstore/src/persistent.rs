//! Store backed by host-provided content and journal storage.
//!
//! Stored bytes carry no schema, so every decode is defensive: a record
//! that fails to decode is logged and skipped, never fatal to the read.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use feedstore_storage::{
    CommitResult, ContentMutation, ContentStorage, JournalMutation, JournalStorage,
};
use feedstore_types::{
    ActionType, LocalAction, PayloadWithId, Record, SemanticPropertiesWithId, Session,
    StreamPayload, StreamSharedState, StreamStructure,
};
use tracing::{debug, warn};

use crate::clock::{Clock, SystemClock};
use crate::edit::{
    ActionEdit, ContentChange, ContentEdit, SemanticPropertiesChange, SemanticPropertiesEdit,
    SessionEdit,
};
use crate::error::{StoreError, StoreResult};
use crate::gc::{ActionGc, ContentGc};
use crate::helper::StoreHelper;
use crate::keys::{
    action_journal, is_action_journal, semantic_properties_key, shared_state_key,
    DISMISS_ACTION_JOURNAL, HEAD_SESSION_TOKEN, SEMANTIC_PROPERTIES_PREFIX, SHARED_STATE_PREFIX,
};
use crate::traits::{AccessibleContentSupplier, GcTask, Store};

/// [`Store`] persisting through a [`ContentStorage`] and a [`JournalStorage`].
pub struct PersistentStore {
    content: Arc<dyn ContentStorage>,
    journal: Arc<dyn JournalStorage>,
    clock: Arc<dyn Clock>,
    helper: StoreHelper,
}

impl PersistentStore {
    pub fn new(content: Arc<dyn ContentStorage>, journal: Arc<dyn JournalStorage>) -> Self {
        Self::with_clock(content, journal, Arc::new(SystemClock))
    }

    pub fn with_clock(
        content: Arc<dyn ContentStorage>,
        journal: Arc<dyn JournalStorage>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            content,
            journal,
            clock,
            helper: StoreHelper,
        }
    }

    /// Remove displayed content while keeping user action history.
    ///
    /// Deletes every journal except action journals and every content entry
    /// except semantic properties, then recreates an empty head. Returns
    /// `false` if any step failed; earlier steps are not rolled back.
    pub fn clear_non_action_content(&self) -> bool {
        let keys = match self.content.get_all_keys() {
            Ok(keys) => keys,
            Err(e) => {
                warn!(error = %e, "clear_non_action_content could not list content");
                return false;
            }
        };
        let mut doomed: Vec<String> = keys
            .into_iter()
            .filter(|key| !key.starts_with(SEMANTIC_PROPERTIES_PREFIX))
            .collect();
        doomed.sort();
        let content_result = self.content.commit(
            doomed
                .into_iter()
                .fold(ContentMutation::new(), |m, key| m.delete(key)),
        );

        let journals = match self.journal.get_all_journals() {
            Ok(journals) => journals,
            Err(e) => {
                warn!(error = %e, "clear_non_action_content could not list journals");
                return false;
            }
        };
        let journal_result = journals
            .into_iter()
            .filter(|name| !is_action_journal(name))
            .map(|name| self.journal.commit(JournalMutation::new(name).delete()))
            .fold(CommitResult::Success, CommitResult::and);

        let head_result = self.recreate_head();
        let result = content_result.and(journal_result).and(head_result);
        if !result.is_success() {
            warn!(
                content = ?content_result,
                journals = ?journal_result,
                head = ?head_result,
                "clear_non_action_content partially failed"
            );
        }
        result.is_success()
    }

    fn recreate_head(&self) -> CommitResult {
        self.journal.commit(
            JournalMutation::new(HEAD_SESSION_TOKEN)
                .delete()
                .append(Vec::new()),
        )
    }

    pub(crate) fn commit_content(&self, changes: Vec<ContentChange>) -> CommitResult {
        let mut mutation = ContentMutation::new();
        for change in changes {
            mutation = match change {
                ContentChange::Upsert(PayloadWithId {
                    content_id,
                    payload,
                }) => {
                    let encoded = match payload.as_shared_state() {
                        Some(state) => state.to_bytes().map(|b| (shared_state_key(&content_id), b)),
                        None => payload.to_bytes().map(|b| (content_id.clone(), b)),
                    };
                    match encoded {
                        Ok((key, bytes)) => mutation.upsert(key, bytes),
                        Err(e) => {
                            warn!(
                                %content_id,
                                error = %e,
                                "could not encode payload; content commit aborted"
                            );
                            return CommitResult::Failure;
                        }
                    }
                }
                ContentChange::Delete(content_id) => mutation.delete(content_id),
                ContentChange::DeleteSharedState(content_id) => {
                    mutation.delete(shared_state_key(&content_id))
                }
            };
        }
        if mutation.is_empty() {
            return CommitResult::Success;
        }
        self.content.commit(mutation)
    }

    pub(crate) fn commit_session(
        &self,
        session: &Session,
        structures: Vec<StreamStructure>,
    ) -> CommitResult {
        if structures.is_empty() {
            return CommitResult::Success;
        }
        let mut mutation = JournalMutation::new(session.token());
        for structure in &structures {
            match structure.to_bytes() {
                Ok(bytes) => mutation = mutation.append(bytes),
                Err(e) => {
                    warn!(
                        %session,
                        error = %e,
                        "could not encode structure; session commit aborted"
                    );
                    return CommitResult::Failure;
                }
            }
        }
        self.journal.commit(mutation)
    }

    pub(crate) fn commit_semantic_properties(
        &self,
        changes: Vec<SemanticPropertiesChange>,
    ) -> CommitResult {
        if changes.is_empty() {
            return CommitResult::Success;
        }
        let mutation = changes
            .into_iter()
            .fold(ContentMutation::new(), |m, change| match change {
                SemanticPropertiesChange::Upsert(SemanticPropertiesWithId {
                    content_id,
                    properties,
                }) => m.upsert(semantic_properties_key(&content_id), properties),
                SemanticPropertiesChange::Delete(content_id) => {
                    m.delete(semantic_properties_key(&content_id))
                }
            });
        self.content.commit(mutation)
    }

    /// One journal commit per action type; earlier commits stand if a later
    /// one fails.
    pub(crate) fn commit_actions(
        &self,
        actions: BTreeMap<ActionType, Vec<LocalAction>>,
    ) -> CommitResult {
        let mut result = CommitResult::Success;
        for (action_type, batch) in actions {
            if batch.is_empty() {
                continue;
            }
            let journal = action_journal(action_type);
            let mut mutation = JournalMutation::new(journal);
            let mut encoded = true;
            for action in &batch {
                match action.to_bytes() {
                    Ok(bytes) => mutation = mutation.append(bytes),
                    Err(e) => {
                        warn!(journal, error = %e, "could not encode action; batch skipped");
                        encoded = false;
                        break;
                    }
                }
            }
            let batch_result = if encoded {
                self.journal.commit(mutation)
            } else {
                CommitResult::Failure
            };
            if !batch_result.is_success() {
                warn!(journal, actions = batch.len(), "action commit failed");
            }
            result = result.and(batch_result);
        }
        result
    }
}

impl Store for PersistentStore {
    fn get_payloads(&self, content_ids: &[String]) -> StoreResult<Vec<PayloadWithId>> {
        let stored = self.content.get(content_ids)?;
        let mut payloads = Vec::with_capacity(stored.len());
        for id in content_ids {
            let Some(bytes) = stored.get(id) else {
                continue;
            };
            match StreamPayload::from_bytes(bytes) {
                Ok(payload) => payloads.push(PayloadWithId::new(id.clone(), payload)),
                Err(e) => warn!(content_id = %id, error = %e, "skipping undecodable payload"),
            }
        }
        Ok(payloads)
    }

    fn get_shared_states(&self) -> StoreResult<Vec<StreamSharedState>> {
        let mut stored: Vec<(String, Vec<u8>)> =
            self.content.get_all(SHARED_STATE_PREFIX)?.into_iter().collect();
        stored.sort_by(|(a, _), (b, _)| a.cmp(b));
        Ok(stored
            .into_iter()
            .filter_map(|(key, bytes)| match StreamSharedState::from_bytes(&bytes) {
                Ok(state) => Some(state),
                Err(e) => {
                    warn!(%key, error = %e, "skipping undecodable shared state");
                    None
                }
            })
            .collect())
    }

    fn get_stream_structures(&self, session: &Session) -> StoreResult<Vec<StreamStructure>> {
        decode_journal(self.journal.as_ref(), session.token())
    }

    fn get_all_sessions(&self) -> StoreResult<Vec<Session>> {
        let mut names: Vec<String> = self
            .journal
            .get_all_journals()?
            .into_iter()
            .filter(|name| name != HEAD_SESSION_TOKEN && !is_action_journal(name))
            .collect();
        names.sort();
        Ok(names.into_iter().map(Session::new).collect())
    }

    fn get_semantic_properties(
        &self,
        content_ids: &[String],
    ) -> StoreResult<Vec<SemanticPropertiesWithId>> {
        let keys: Vec<String> = content_ids
            .iter()
            .map(|id| semantic_properties_key(id))
            .collect();
        let stored = self.content.get(&keys)?;
        Ok(content_ids
            .iter()
            .zip(keys.iter())
            .filter_map(|(id, key)| {
                stored
                    .get(key)
                    .map(|properties| SemanticPropertiesWithId::new(id.clone(), properties.clone()))
            })
            .collect())
    }

    fn get_all_dismiss_actions(&self) -> StoreResult<Vec<LocalAction>> {
        decode_journal(self.journal.as_ref(), DISMISS_ACTION_JOURNAL)
    }

    fn create_new_session(&self) -> StoreResult<Session> {
        let session = self.helper.new_session();
        let result = self
            .journal
            .commit(JournalMutation::new(HEAD_SESSION_TOKEN).copy(session.token()));
        if !result.is_success() {
            return Err(StoreError::CommitFailed(format!(
                "copying head into {session}"
            )));
        }
        debug!(%session, "created session");
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
        self.journal
            .commit(JournalMutation::new(session.token()).delete())
    }

    fn clear_head(&self) -> CommitResult {
        self.recreate_head()
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
        reserved: HashSet<String>,
        accessible: AccessibleContentSupplier,
    ) -> GcTask {
        let journal = self.journal.clone();
        let gc = ContentGc::new(
            self.content.clone(),
            accessible,
            reserved,
            Box::new(move || decode_journal(journal.as_ref(), DISMISS_ACTION_JOURNAL)),
        );
        Box::new(move || {
            gc.run();
        })
    }

    fn trigger_action_gc(
        &self,
        actions: Vec<LocalAction>,
        valid_content_ids: HashSet<String>,
    ) -> GcTask {
        let gc = ActionGc::new(
            self.journal.clone(),
            ActionType::Dismiss,
            actions,
            valid_content_ids,
        );
        Box::new(move || {
            gc.run();
        })
    }

    fn is_ephemeral_mode(&self) -> bool {
        false
    }

    fn clear_all(&self) -> bool {
        let content_result = self.content.commit(ContentMutation::new().delete_all());
        let journal_result = self.journal.delete_all();
        let head_result = self.recreate_head();
        let result = content_result.and(journal_result).and(head_result);
        if !result.is_success() {
            warn!(
                content = ?content_result,
                journals = ?journal_result,
                head = ?head_result,
                "clear_all partially failed"
            );
        }
        result.is_success()
    }
}

impl std::fmt::Debug for PersistentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistentStore").finish_non_exhaustive()
    }
}

/// Decode every record of `name`, skipping sentinels and undecodable bytes.
fn decode_journal<T: Record>(journal: &dyn JournalStorage, name: &str) -> StoreResult<Vec<T>> {
    let records = journal.read(name)?;
    Ok(records
        .iter()
        .filter(|bytes| !bytes.is_empty())
        .filter_map(|bytes| match T::from_bytes(bytes) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(journal = name, error = %e, "skipping undecodable journal record");
                None
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use feedstore_storage::{InMemoryContentStorage, InMemoryJournalStorage};
    use feedstore_types::StreamFeature;

    use super::*;
    use crate::clock::FixedClock;

    struct Fixture {
        content: Arc<InMemoryContentStorage>,
        journal: Arc<InMemoryJournalStorage>,
        clock: Arc<FixedClock>,
        store: PersistentStore,
    }

    fn fixture() -> Fixture {
        let content = Arc::new(InMemoryContentStorage::new());
        let journal = Arc::new(InMemoryJournalStorage::new());
        let clock = Arc::new(FixedClock::new(100));
        let store = PersistentStore::with_clock(content.clone(), journal.clone(), clock.clone());
        Fixture {
            content,
            journal,
            clock,
            store,
        }
    }

    fn feature(id: &str, data: &[u8]) -> StreamPayload {
        StreamPayload::Feature(StreamFeature::new(id, None, data.to_vec()))
    }

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    // -----------------------------------------------------------------------
    // Content
    // -----------------------------------------------------------------------

    #[test]
    fn upsert_is_last_write_wins() {
        let f = fixture();
        f.store.edit_content().add("c1", feature("c1", b"v1")).commit();
        f.store.edit_content().add("c1", feature("c1", b"v2")).commit();

        let payloads = f.store.get_payloads(&ids(&["c1"])).unwrap();
        assert_eq!(payloads.len(), 1);
        assert_eq!(payloads[0].payload, feature("c1", b"v2"));
    }

    #[test]
    fn missing_ids_are_omitted_and_order_follows_request() {
        let f = fixture();
        f.store
            .edit_content()
            .add("a", feature("a", b""))
            .add("b", feature("b", b""))
            .commit();

        let payloads = f.store.get_payloads(&ids(&["b", "zzz", "a"])).unwrap();
        let got: Vec<&str> = payloads.iter().map(|p| p.content_id.as_str()).collect();
        assert_eq!(got, vec!["b", "a"]);
    }

    #[test]
    fn corrupt_payload_is_skipped_not_fatal() {
        let f = fixture();
        f.store.edit_content().add("good", feature("good", b"x")).commit();
        f.content
            .commit(ContentMutation::new().upsert("bad", vec![0xff, 0xff]));

        let payloads = f.store.get_payloads(&ids(&["bad", "good"])).unwrap();
        assert_eq!(payloads.len(), 1);
        assert_eq!(payloads[0].content_id, "good");
    }

    #[test]
    fn read_failure_is_an_error() {
        let f = fixture();
        f.content.set_fail_reads(true);
        assert!(matches!(
            f.store.get_payloads(&ids(&["a"])).unwrap_err(),
            StoreError::Storage(_)
        ));
    }

    #[test]
    fn shared_states_live_under_their_prefix() {
        let f = fixture();
        let state = StreamSharedState::new("s1", b"render".to_vec());
        f.store
            .edit_content()
            .add("s1", StreamPayload::SharedState(state.clone()))
            .add("c1", feature("c1", b""))
            .commit();

        assert_eq!(f.content.keys(), vec!["c1", "ss::s1"]);
        assert_eq!(f.store.get_shared_states().unwrap(), vec![state]);
        assert!(f.store.get_payloads(&ids(&["s1"])).unwrap().is_empty());

        f.store.edit_content().delete_shared_state("s1").commit();
        assert!(f.store.get_shared_states().unwrap().is_empty());
    }

    #[test]
    fn content_delete_keeps_semantic_properties() {
        let f = fixture();
        f.store.edit_content().add("c1", feature("c1", b"")).commit();
        f.store.edit_semantic_properties().add("c1", b"meta".to_vec()).commit();
        f.store.edit_content().delete("c1").commit();

        assert!(f.store.get_payloads(&ids(&["c1"])).unwrap().is_empty());
        let props = f.store.get_semantic_properties(&ids(&["c1"])).unwrap();
        assert_eq!(props, vec![SemanticPropertiesWithId::new("c1", b"meta".to_vec())]);
    }

    #[test]
    fn semantic_properties_filtered_to_requested_ids() {
        let f = fixture();
        f.store
            .edit_semantic_properties()
            .add("a", vec![1])
            .add("b", vec![2])
            .commit();
        let props = f.store.get_semantic_properties(&ids(&["b", "c"])).unwrap();
        assert_eq!(props, vec![SemanticPropertiesWithId::new("b", vec![2])]);

        f.store.edit_semantic_properties().delete("b").commit();
        assert!(f.store.get_semantic_properties(&ids(&["b"])).unwrap().is_empty());
    }

    // -----------------------------------------------------------------------
    // Sessions
    // -----------------------------------------------------------------------

    #[test]
    fn new_session_clones_head_independently() {
        let f = fixture();
        let head = f.store.get_head_session();
        f.store
            .edit_session(&head)
            .add(StreamStructure::upsert("c1", None))
            .commit();

        let session = f.store.create_new_session().unwrap();
        assert_eq!(
            f.store.get_stream_structures(&session).unwrap(),
            f.store.get_stream_structures(&head).unwrap()
        );

        f.store
            .edit_session(&head)
            .add(StreamStructure::upsert("c2", None))
            .commit();
        assert_eq!(f.store.get_stream_structures(&session).unwrap().len(), 1);
        assert_eq!(f.store.get_stream_structures(&head).unwrap().len(), 2);
    }

    #[test]
    fn sessions_exclude_head_and_action_journals() {
        let f = fixture();
        f.store.clear_head();
        f.store.edit_actions().add(ActionType::Dismiss, "c1").commit();
        let session = f.store.create_new_session().unwrap();

        assert_eq!(f.store.get_all_sessions().unwrap(), vec![session]);
    }

    #[test]
    fn unknown_session_reads_empty() {
        let f = fixture();
        let structures = f
            .store
            .get_stream_structures(&Session::new("_session:unknown"))
            .unwrap();
        assert!(structures.is_empty());
    }

    #[test]
    fn sentinel_records_are_not_structures() {
        let f = fixture();
        let head = f.store.get_head_session();
        f.store
            .edit_session(&head)
            .add(StreamStructure::upsert("c1", None))
            .commit();
        assert!(f.store.clear_head().is_success());
        assert!(f.journal.contains(HEAD_SESSION_TOKEN));
        assert!(f.store.get_stream_structures(&head).unwrap().is_empty());
    }

    #[test]
    fn remove_session_deletes_journal() {
        let f = fixture();
        let session = f.store.create_new_session().unwrap();
        assert!(f.store.remove_session(&session).is_success());
        assert!(f.store.get_all_sessions().unwrap().is_empty());
    }

    #[test]
    #[should_panic(expected = "head session cannot be removed")]
    fn removing_head_panics() {
        let f = fixture();
        let head = f.store.get_head_session();
        f.store.remove_session(&head);
    }

    #[test]
    fn session_creation_failure_is_an_error() {
        let f = fixture();
        f.journal.set_fail_commits(true);
        assert!(matches!(
            f.store.create_new_session().unwrap_err(),
            StoreError::CommitFailed(_)
        ));
    }

    // -----------------------------------------------------------------------
    // Actions
    // -----------------------------------------------------------------------

    #[test]
    fn dismiss_actions_are_stamped_and_ordered() {
        let f = fixture();
        f.store.edit_actions().add(ActionType::Dismiss, "a").commit();
        f.clock.set(200);
        f.store.edit_actions().add(ActionType::Dismiss, "b").commit();

        assert_eq!(
            f.store.get_all_dismiss_actions().unwrap(),
            vec![LocalAction::dismiss("a", 100), LocalAction::dismiss("b", 200)]
        );
    }

    #[test]
    fn action_commit_failure_is_reported() {
        let f = fixture();
        f.journal.set_fail_commits(true);
        let result = f.store.edit_actions().add(ActionType::Dismiss, "a").commit();
        assert_eq!(result, CommitResult::Failure);
    }

    // -----------------------------------------------------------------------
    // GC
    // -----------------------------------------------------------------------

    #[test]
    fn content_gc_is_deferred_until_invoked() {
        let f = fixture();
        f.store.edit_content().add("c1", feature("c1", b"")).commit();

        let task = f
            .store
            .trigger_content_gc(HashSet::new(), Box::new(|| HashSet::new()));
        assert_eq!(f.content.len(), 1);
        task();
        assert!(f.content.is_empty());
    }

    #[test]
    fn action_gc_keeps_only_valid_actions() {
        let f = fixture();
        f.store
            .edit_actions()
            .add_at(ActionType::Dismiss, "a", 1)
            .add_at(ActionType::Dismiss, "b", 2)
            .commit();

        let actions = f.store.get_all_dismiss_actions().unwrap();
        let valid: HashSet<String> = ["a".to_string()].into_iter().collect();
        f.store.trigger_action_gc(actions, valid)();

        assert_eq!(
            f.store.get_all_dismiss_actions().unwrap(),
            vec![LocalAction::dismiss("a", 1)]
        );
    }

    #[test]
    fn gc_keeps_dismissed_semantic_properties_but_not_content() {
        let f = fixture();
        f.store.edit_content().add("c1", feature("c1", b"x")).commit();
        f.store.edit_semantic_properties().add("c1", b"blob".to_vec()).commit();
        f.store.edit_actions().add(ActionType::Dismiss, "c1").commit();

        f.store
            .trigger_content_gc(HashSet::new(), Box::new(|| HashSet::new()))();

        assert!(f.store.get_payloads(&ids(&["c1"])).unwrap().is_empty());
        assert_eq!(
            f.store.get_semantic_properties(&ids(&["c1"])).unwrap(),
            vec![SemanticPropertiesWithId::new("c1", b"blob".to_vec())]
        );
        assert_eq!(
            f.store.get_all_dismiss_actions().unwrap(),
            vec![LocalAction::dismiss("c1", 100)]
        );
    }

    // -----------------------------------------------------------------------
    // Clearing
    // -----------------------------------------------------------------------

    #[test]
    fn clear_all_recreates_empty_head() {
        let f = fixture();
        let head = f.store.get_head_session();
        f.store.edit_session(&head).add(StreamStructure::upsert("c1", None)).commit();
        f.store.create_new_session().unwrap();
        f.store.edit_content().add("c1", feature("c1", b"")).commit();

        assert!(f.store.clear_all());
        assert!(f.store.get_stream_structures(&head).unwrap().is_empty());
        assert!(f.store.get_all_sessions().unwrap().is_empty());
        assert!(f.content.is_empty());
        assert!(f.journal.contains(HEAD_SESSION_TOKEN));
    }

    #[test]
    fn clear_all_reports_partial_failure_without_rollback() {
        let f = fixture();
        f.store.edit_content().add("c1", feature("c1", b"")).commit();
        f.store.create_new_session().unwrap();
        f.journal.set_fail_commits(true);

        assert!(!f.store.clear_all());
        assert!(f.content.is_empty());
        assert_eq!(f.store.get_all_sessions().unwrap().len(), 1);
    }

    #[test]
    fn clear_non_action_content_keeps_actions_and_properties() {
        let f = fixture();
        let head = f.store.get_head_session();
        f.store.edit_session(&head).add(StreamStructure::upsert("c1", None)).commit();
        f.store.create_new_session().unwrap();
        f.store
            .edit_content()
            .add("c1", feature("c1", b""))
            .add("s1", StreamPayload::SharedState(StreamSharedState::new("s1", vec![])))
            .commit();
        f.store.edit_semantic_properties().add("c1", vec![7]).commit();
        f.store.edit_actions().add(ActionType::Dismiss, "c1").commit();

        assert!(f.store.clear_non_action_content());
        assert_eq!(f.content.keys(), vec!["sp::c1"]);
        assert!(f.store.get_all_sessions().unwrap().is_empty());
        assert!(f.store.get_stream_structures(&head).unwrap().is_empty());
        assert_eq!(f.store.get_all_dismiss_actions().unwrap().len(), 1);
    }

    // -----------------------------------------------------------------------
    // Backend agreement
    // -----------------------------------------------------------------------

    /// Journal storage that lists journals in reverse order.
    struct ReverseListing(InMemoryJournalStorage);

    impl JournalStorage for ReverseListing {
        fn read(&self, journal: &str) -> feedstore_storage::StorageResult<Vec<Vec<u8>>> {
            self.0.read(journal)
        }

        fn get_all_journals(&self) -> feedstore_storage::StorageResult<Vec<String>> {
            let mut names = self.0.get_all_journals()?;
            names.reverse();
            Ok(names)
        }

        fn commit(&self, mutation: JournalMutation) -> CommitResult {
            self.0.commit(mutation)
        }

        fn delete_all(&self) -> CommitResult {
            self.0.delete_all()
        }
    }

    #[test]
    fn sessions_are_sorted_whatever_the_host_order() {
        let store = PersistentStore::with_clock(
            Arc::new(InMemoryContentStorage::new()),
            Arc::new(ReverseListing(InMemoryJournalStorage::new())),
            Arc::new(FixedClock::new(0)),
        );
        let mut created: Vec<Session> = (0..3)
            .map(|_| store.create_new_session().unwrap())
            .collect();
        created.sort_by(|a, b| a.token().cmp(b.token()));

        assert_eq!(store.get_all_sessions().unwrap(), created);
    }

    #[test]
    fn repeated_ids_are_answered_per_occurrence() {
        let f = fixture();
        f.store.edit_content().add("a", feature("a", b"")).commit();
        f.store.edit_semantic_properties().add("a", vec![1]).commit();

        let request = ids(&["a", "b", "a"]);
        assert_eq!(f.store.get_payloads(&request).unwrap().len(), 2);
        assert_eq!(
            f.store.get_semantic_properties(&request).unwrap(),
            vec![
                SemanticPropertiesWithId::new("a", vec![1]),
                SemanticPropertiesWithId::new("a", vec![1]),
            ]
        );
    }

    #[test]
    fn corrupt_journal_records_are_skipped() {
        let f = fixture();
        let session = f.store.create_new_session().unwrap();
        f.store
            .edit_session(&session)
            .add(StreamStructure::upsert("c1", None))
            .commit();
        f.journal
            .commit(JournalMutation::new(session.token()).append(vec![0xff, 0xff]));
        f.store
            .edit_session(&session)
            .add(StreamStructure::upsert("c2", None))
            .commit();

        f.store.edit_actions().add(ActionType::Dismiss, "c1").commit();
        f.journal
            .commit(JournalMutation::new(DISMISS_ACTION_JOURNAL).append(vec![0xff]));

        let ids: Vec<String> = f
            .store
            .get_stream_structures(&session)
            .unwrap()
            .into_iter()
            .map(|s| s.content_id)
            .collect();
        assert_eq!(ids, vec!["c1", "c2"]);
        assert_eq!(
            f.store.get_all_dismiss_actions().unwrap(),
            vec![LocalAction::dismiss("c1", 100)]
        );
    }

    #[test]
    fn is_not_ephemeral() {
        assert!(!fixture().store.is_ephemeral_mode());
    }
}
