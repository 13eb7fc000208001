use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of user action recorded against a piece of content.
///
/// Each action type is persisted to its own journal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ActionType {
    Dismiss,
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dismiss => f.write_str("dismiss"),
        }
    }
}

/// An immutable, timestamped action taken on a content id.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocalAction {
    pub action_type: ActionType,
    pub content_id: String,
    /// Seconds since the Unix epoch.
    pub timestamp_seconds: u64,
}

impl LocalAction {
    pub fn new(
        action_type: ActionType,
        content_id: impl Into<String>,
        timestamp_seconds: u64,
    ) -> Self {
        Self {
            action_type,
            content_id: content_id.into(),
            timestamp_seconds,
        }
    }

    pub fn dismiss(content_id: impl Into<String>, timestamp_seconds: u64) -> Self {
        Self::new(ActionType::Dismiss, content_id, timestamp_seconds)
    }
}
