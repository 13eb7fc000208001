use thiserror::Error;

/// Errors produced while encoding or decoding stored records.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("empty record")]
    EmptyRecord,

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("deserialization error: {0}")]
    Deserialization(String),
}
