//! Value types for the feed content and journal store.
//!
//! Everything the store persists crosses the storage boundary as opaque
//! bytes. This crate defines the records those bytes carry and the codec
//! used to move between the two.
//!
//! # Key Types
//!
//! - [`Session`] -- Identity of a structural journal (the head or a clone of it)
//! - [`StreamStructure`] -- One structural record appended to a session
//! - [`StreamPayload`] -- A content payload (feature, shared state, or token)
//! - [`SemanticPropertiesWithId`] -- Caller-defined metadata attached to a content id
//! - [`LocalAction`] -- A timestamped user action such as a dismiss
//! - [`Record`] -- Binary codec shared by every persisted record

pub mod action;
pub mod codec;
pub mod error;
pub mod payload;
pub mod session;

pub use action::{ActionType, LocalAction};
pub use codec::Record;
pub use error::TypeError;
pub use payload::{
    PayloadWithId, SemanticPropertiesWithId, StreamFeature, StreamPayload, StreamSharedState,
    StreamToken,
};
pub use session::{Session, StreamStructure, StructureOperation};
