//! In-memory stores hydrated from, and mirrored to, the persistence layer
//!
//! - [`ProjectStore`] owns the project list
//! - [`ConversationStore`] owns architecture logs and issue threads
//! - [`ContextBridge`] owns one architecture context snapshot per project
//!
//! Each store is the sole mutator of its data. A mutation and its
//! persistence mirror run under one lock, so no two mutations interleave.

mod context;
mod conversation;
mod project;

pub use context::ContextBridge;
pub use conversation::ConversationStore;
pub use project::ProjectStore;

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock a store's state, recovering it if a previous holder panicked.
pub(crate) fn lock<T>(state: &Mutex<T>) -> MutexGuard<'_, T> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}
