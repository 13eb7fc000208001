//! Garbage collection for the persistent store.
//!
//! - [`ContentGc`] deletes content-storage keys that no caller-declared root
//!   set protects.
//! - [`ActionGc`] compacts an action journal down to actions whose content
//!   is still valid.
//!
//! Both are built by the store and handed back as a
//! [`GcTask`](crate::GcTask); nothing runs until the caller invokes it.

mod action;
mod content;

pub use action::ActionGc;
pub use content::{ActionSupplier, ContentGc, GcReport};
