use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of a session: an ordered, append-only list of structural records.
///
/// The token doubles as the name of the journal that holds the session's
/// records. One token is reserved for the head session.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Session {
    token: String,
}

impl Session {
    /// Create a session identity from its token.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    /// The session token.
    pub fn token(&self) -> &str {
        &self.token
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Session({})", self.token)
    }
}

impl fmt::Display for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.token)
    }
}

/// What a structural record does to the tree of content it describes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StructureOperation {
    /// Drop every node accumulated so far.
    ClearAll,
    /// Insert or move a node under its parent.
    Upsert,
    /// Remove a node.
    Remove,
    /// Declare that a content id must be available without placing it.
    RequiredContent,
}

/// One structural record appended to a session.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StreamStructure {
    pub operation: StructureOperation,
    pub content_id: String,
    pub parent_content_id: Option<String>,
}

impl StreamStructure {
    pub fn new(
        operation: StructureOperation,
        content_id: impl Into<String>,
        parent_content_id: Option<&str>,
    ) -> Self {
        Self {
            operation,
            content_id: content_id.into(),
            parent_content_id: parent_content_id.map(str::to_string),
        }
    }

    /// Shorthand for an [`StructureOperation::Upsert`] record.
    pub fn upsert(content_id: impl Into<String>, parent_content_id: Option<&str>) -> Self {
        Self::new(StructureOperation::Upsert, content_id, parent_content_id)
    }

    /// Shorthand for a [`StructureOperation::Remove`] record.
    pub fn remove(content_id: impl Into<String>, parent_content_id: Option<&str>) -> Self {
        Self::new(StructureOperation::Remove, content_id, parent_content_id)
    }
}
