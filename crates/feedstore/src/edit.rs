//! Mutation builders handed out by the store's `edit_*` methods.
//!
//! Each builder only accumulates changes. Calling `commit` hands the batch
//! to the commit function the issuing store bound at construction and
//! returns that function's result. Builders are consumed by `commit`, so a
//! batch can be committed at most once.

use std::collections::BTreeMap;

use feedstore_storage::CommitResult;
use feedstore_types::{
    ActionType, LocalAction, PayloadWithId, SemanticPropertiesWithId, StreamPayload,
    StreamStructure,
};

use crate::clock::Clock;

type Committer<'a, T> = Box<dyn FnOnce(T) -> CommitResult + 'a>;

/// One staged change to content storage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ContentChange {
    Upsert(PayloadWithId),
    Delete(String),
    DeleteSharedState(String),
}

/// Batch of payload upserts and deletes.
#[must_use = "an edit does nothing until committed"]
pub struct ContentEdit<'a> {
    changes: Vec<ContentChange>,
    committer: Committer<'a, Vec<ContentChange>>,
}

impl<'a> ContentEdit<'a> {
    pub(crate) fn new(committer: impl FnOnce(Vec<ContentChange>) -> CommitResult + 'a) -> Self {
        Self {
            changes: Vec::new(),
            committer: Box::new(committer),
        }
    }

    /// Stage `payload` under `content_id`, replacing any previous value.
    ///
    /// Shared-state payloads are kept apart from ordinary payloads.
    pub fn add(mut self, content_id: impl Into<String>, payload: StreamPayload) -> Self {
        self.changes
            .push(ContentChange::Upsert(PayloadWithId::new(content_id, payload)));
        self
    }

    /// Stage removal of the payload stored under `content_id`.
    pub fn delete(mut self, content_id: impl Into<String>) -> Self {
        self.changes.push(ContentChange::Delete(content_id.into()));
        self
    }

    /// Stage removal of the shared state stored under `content_id`.
    pub fn delete_shared_state(mut self, content_id: impl Into<String>) -> Self {
        self.changes
            .push(ContentChange::DeleteSharedState(content_id.into()));
        self
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn commit(self) -> CommitResult {
        (self.committer)(self.changes)
    }
}

/// Batch of structural records appended to one session.
#[must_use = "an edit does nothing until committed"]
pub struct SessionEdit<'a> {
    structures: Vec<StreamStructure>,
    committer: Committer<'a, Vec<StreamStructure>>,
}

impl<'a> SessionEdit<'a> {
    pub(crate) fn new(committer: impl FnOnce(Vec<StreamStructure>) -> CommitResult + 'a) -> Self {
        Self {
            structures: Vec::new(),
            committer: Box::new(committer),
        }
    }

    pub fn add(mut self, structure: StreamStructure) -> Self {
        self.structures.push(structure);
        self
    }

    pub fn len(&self) -> usize {
        self.structures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.structures.is_empty()
    }

    pub fn commit(self) -> CommitResult {
        (self.committer)(self.structures)
    }
}

/// One staged change to semantic properties.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SemanticPropertiesChange {
    Upsert(SemanticPropertiesWithId),
    Delete(String),
}

/// Batch of semantic-properties upserts and deletes.
#[must_use = "an edit does nothing until committed"]
pub struct SemanticPropertiesEdit<'a> {
    changes: Vec<SemanticPropertiesChange>,
    committer: Committer<'a, Vec<SemanticPropertiesChange>>,
}

impl<'a> SemanticPropertiesEdit<'a> {
    pub(crate) fn new(
        committer: impl FnOnce(Vec<SemanticPropertiesChange>) -> CommitResult + 'a,
    ) -> Self {
        Self {
            changes: Vec::new(),
            committer: Box::new(committer),
        }
    }

    pub fn add(mut self, content_id: impl Into<String>, properties: Vec<u8>) -> Self {
        self.changes.push(SemanticPropertiesChange::Upsert(
            SemanticPropertiesWithId::new(content_id, properties),
        ));
        self
    }

    pub fn delete(mut self, content_id: impl Into<String>) -> Self {
        self.changes
            .push(SemanticPropertiesChange::Delete(content_id.into()));
        self
    }

    pub fn len(&self) -> usize {
        self.changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn commit(self) -> CommitResult {
        (self.committer)(self.changes)
    }
}

/// Batch of local actions, grouped by action type.
#[must_use = "an edit does nothing until committed"]
pub struct ActionEdit<'a> {
    clock: &'a dyn Clock,
    actions: BTreeMap<ActionType, Vec<LocalAction>>,
    committer: Committer<'a, BTreeMap<ActionType, Vec<LocalAction>>>,
}

impl<'a> ActionEdit<'a> {
    pub(crate) fn new(
        clock: &'a dyn Clock,
        committer: impl FnOnce(BTreeMap<ActionType, Vec<LocalAction>>) -> CommitResult + 'a,
    ) -> Self {
        Self {
            clock,
            actions: BTreeMap::new(),
            committer: Box::new(committer),
        }
    }

    /// Stage an action stamped with the store's current time.
    pub fn add(self, action_type: ActionType, content_id: impl Into<String>) -> Self {
        let now = self.clock.now_seconds();
        self.add_at(action_type, content_id, now)
    }

    /// Stage an action with an explicit timestamp.
    pub fn add_at(
        mut self,
        action_type: ActionType,
        content_id: impl Into<String>,
        timestamp_seconds: u64,
    ) -> Self {
        self.actions
            .entry(action_type)
            .or_default()
            .push(LocalAction::new(action_type, content_id, timestamp_seconds));
        self
    }

    pub fn len(&self) -> usize {
        self.actions.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn commit(self) -> CommitResult {
        (self.committer)(self.actions)
    }
}
