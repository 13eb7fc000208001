use serde::{Deserialize, Serialize};

/// A renderable feature: a card, cluster, or any other displayed node.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamFeature {
    pub content_id: String,
    pub parent_id: Option<String>,
    pub data: Vec<u8>,
}

impl StreamFeature {
    pub fn new(content_id: impl Into<String>, parent_id: Option<&str>, data: Vec<u8>) -> Self {
        Self {
            content_id: content_id.into(),
            parent_id: parent_id.map(str::to_string),
            data,
        }
    }
}

/// Feed-wide rendering state shared by many features.
///
/// Stored under its own key prefix and never collected by content GC.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamSharedState {
    pub content_id: String,
    pub data: Vec<u8>,
}

impl StreamSharedState {
    pub fn new(content_id: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            content_id: content_id.into(),
            data,
        }
    }
}

/// A continuation marker used to page more content into a stream.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamToken {
    pub content_id: String,
    pub parent_id: Option<String>,
    pub next_page_token: Vec<u8>,
}

/// A content payload as the store sees it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StreamPayload {
    Feature(StreamFeature),
    SharedState(StreamSharedState),
    Token(StreamToken),
}

impl StreamPayload {
    /// The shared state carried by this payload, if any.
    pub fn as_shared_state(&self) -> Option<&StreamSharedState> {
        match self {
            Self::SharedState(state) => Some(state),
            _ => None,
        }
    }
}

/// A payload paired with the content id it is stored under.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayloadWithId {
    pub content_id: String,
    pub payload: StreamPayload,
}

impl PayloadWithId {
    pub fn new(content_id: impl Into<String>, payload: StreamPayload) -> Self {
        Self {
            content_id: content_id.into(),
            payload,
        }
    }
}

/// Opaque caller-defined metadata attached to a content id.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SemanticPropertiesWithId {
    pub content_id: String,
    pub properties: Vec<u8>,
}

impl SemanticPropertiesWithId {
    pub fn new(content_id: impl Into<String>, properties: Vec<u8>) -> Self {
        Self {
            content_id: content_id.into(),
            properties,
        }
    }
}
