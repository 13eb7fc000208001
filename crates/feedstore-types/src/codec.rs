//! Binary codec for persisted records.
//!
//! Records are encoded with bincode. A zero-length byte string is never a
//! valid record: journals use it as a sentinel, so decoding rejects it
//! before bincode sees it.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::action::LocalAction;
use crate::error::TypeError;
use crate::payload::{StreamPayload, StreamSharedState};
use crate::session::StreamStructure;

/// A value that can be stored as an opaque byte record.
pub trait Record: Serialize + DeserializeOwned + Sized {
    /// Encode this record into its stored byte form.
    fn to_bytes(&self) -> Result<Vec<u8>, TypeError> {
        bincode::serialize(self).map_err(|e| TypeError::Serialization(e.to_string()))
    }

    /// Decode a record from its stored byte form.
    fn from_bytes(bytes: &[u8]) -> Result<Self, TypeError> {
        if bytes.is_empty() {
            return Err(TypeError::EmptyRecord);
        }
        bincode::deserialize(bytes).map_err(|e| TypeError::Deserialization(e.to_string()))
    }
}

impl Record for StreamStructure {}
impl Record for StreamPayload {}
impl Record for StreamSharedState {}
impl Record for LocalAction {}
