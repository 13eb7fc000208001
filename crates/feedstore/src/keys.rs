//! Storage keys and journal names owned by the store.
//!
//! Content storage holds three kinds of entry side by side: ordinary
//! payloads under their bare content id, shared states under
//! [`SHARED_STATE_PREFIX`], and semantic properties under
//! [`SEMANTIC_PROPERTIES_PREFIX`]. Journal storage holds the head session,
//! cloned sessions, and one journal per action type.

use feedstore_types::ActionType;

pub const SHARED_STATE_PREFIX: &str = "ss::";
pub const SEMANTIC_PROPERTIES_PREFIX: &str = "sp::";
pub const SESSION_NAME_PREFIX: &str = "_session:";
pub const HEAD_SESSION_TOKEN: &str = "$HEAD";
pub const DISMISS_ACTION_JOURNAL: &str = "action-dismiss";

pub fn shared_state_key(content_id: &str) -> String {
    format!("{SHARED_STATE_PREFIX}{content_id}")
}

pub fn semantic_properties_key(content_id: &str) -> String {
    format!("{SEMANTIC_PROPERTIES_PREFIX}{content_id}")
}

/// Journal holding every action of `action_type`.
pub fn action_journal(action_type: ActionType) -> &'static str {
    match action_type {
        ActionType::Dismiss => DISMISS_ACTION_JOURNAL,
    }
}

/// Returns `true` if `journal` stores actions rather than a session.
pub fn is_action_journal(journal: &str) -> bool {
    journal == DISMISS_ACTION_JOURNAL
}
