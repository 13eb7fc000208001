use std::collections::HashSet;
use std::sync::Arc;

use feedstore_storage::{CommitResult, JournalMutation, JournalStorage};
use feedstore_types::{ActionType, LocalAction, Record};
use tracing::{error, info, warn};

use crate::keys::action_journal;

/// Compacts one action journal to the actions whose content is still valid.
///
/// The journal is deleted and the surviving actions re-appended, in their
/// original order, within a single journal commit.
pub struct ActionGc {
    storage: Arc<dyn JournalStorage>,
    action_type: ActionType,
    actions: Vec<LocalAction>,
    valid_content_ids: HashSet<String>,
}

impl ActionGc {
    pub fn new(
        storage: Arc<dyn JournalStorage>,
        action_type: ActionType,
        actions: Vec<LocalAction>,
        valid_content_ids: HashSet<String>,
    ) -> Self {
        Self {
            storage,
            action_type,
            actions,
            valid_content_ids,
        }
    }

    /// Actions that survive the pass, in original order.
    pub fn surviving(&self) -> Vec<&LocalAction> {
        self.actions
            .iter()
            .filter(|action| {
                action.action_type == self.action_type
                    && self.valid_content_ids.contains(&action.content_id)
            })
            .collect()
    }

    /// Rewrite the journal on the calling thread.
    pub fn run(self) -> CommitResult {
        let journal = action_journal(self.action_type);
        let surviving = self.surviving();

        let mut mutation = JournalMutation::new(journal).delete();
        for action in &surviving {
            match action.to_bytes() {
                Ok(bytes) => mutation = mutation.append(bytes),
                Err(e) => {
                    // Never commit a rewrite that loses a valid action.
                    warn!(
                        journal,
                        content_id = %action.content_id,
                        error = %e,
                        "action GC could not encode action; skipping pass"
                    );
                    return CommitResult::Failure;
                }
            }
        }

        let kept = surviving.len();
        let result = self.storage.commit(mutation);
        if result.is_success() {
            info!(
                journal,
                kept,
                removed = self.actions.len() - kept,
                "action GC complete"
            );
        } else {
            error!(journal, "action GC rewrite failed");
        }
        result
    }
}
