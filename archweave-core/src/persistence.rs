//! JSON document persistence
//!
//! The only component that touches raw storage. Each store keeps one JSON
//! document under a fixed key and mirrors it here after every mutation.
//!
//! Loading never fails: a missing row, an unreadable row, or a row that does
//! not parse as the expected type all come back as `None`, and the problem is
//! logged. A row that does not parse is deleted, so the next save starts from
//! a clean slot.

use crate::config::EmptyStorePolicy;
use crate::db::Database;
use crate::error::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

/// Fixed document keys.
pub mod keys {
    /// `Project[]`
    pub const PROJECTS: &str = "projects";
    /// `{projectId: ArchitectureContextSnapshot}`
    pub const ARCHITECTURE_CONTEXT: &str = "architectureContext";
    /// `{projectId: {architecture: Message[]}}`
    pub const PROJECT_CHATS: &str = "projectChats";
    /// `{projectId: IssueThread[]}`
    pub const ISSUE_THREADS: &str = "issueThreads";
}

/// Outcome of a [`PersistenceLayer::save`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Written,
    /// Empty document skipped under [`EmptyStorePolicy::Preserve`]
    SkippedEmpty,
}

/// Durable key → JSON document store.
pub struct PersistenceLayer {
    db: Arc<Database>,
    empty_policy: EmptyStorePolicy,
}

impl PersistenceLayer {
    pub fn new(db: Arc<Database>, empty_policy: EmptyStorePolicy) -> Self {
        Self { db, empty_policy }
    }

    /// Open (and migrate) the database at `path`.
    pub fn open(path: &Path, empty_policy: EmptyStorePolicy) -> Result<Self> {
        tracing::info!(path = %path.display(), "Opening state database");
        let db = Database::open(path)?;
        db.migrate()?;
        Ok(Self::new(Arc::new(db), empty_policy))
    }

    /// Non-durable layer backed by an in-memory database.
    pub fn in_memory() -> Result<Self> {
        let db = Database::open_in_memory()?;
        db.migrate()?;
        Ok(Self::new(Arc::new(db), EmptyStorePolicy::default()))
    }

    pub fn empty_policy(&self) -> EmptyStorePolicy {
        self.empty_policy
    }

    /// Underlying database handle.
    pub fn database(&self) -> &Arc<Database> {
        &self.db
    }

    /// Load and parse the document under `key`.
    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = match self.db.read_blob(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(key, error = %e, "Failed to read persisted state");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key, error = %e, "Discarding corrupted persisted state");
                if let Err(e) = self.db.delete_blob(key) {
                    tracing::warn!(key, error = %e, "Failed to remove corrupted state");
                }
                None
            }
        }
    }

    /// Keys that currently hold a document, sorted.
    pub fn stored_keys(&self) -> Vec<String> {
        self.db.blob_keys().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Failed to list persisted documents");
            Vec::new()
        })
    }

    /// Serialize and store `value` under `key`.
    ///
    /// An empty array or object is only written under
    /// [`EmptyStorePolicy::Overwrite`].
    pub fn save<T: Serialize>(&self, key: &str, value: &T) -> Result<SaveOutcome> {
        let json = serde_json::to_value(value)?;

        if self.empty_policy == EmptyStorePolicy::Preserve && is_empty_document(&json) {
            tracing::debug!(key, "Skipping save of empty document");
            return Ok(SaveOutcome::SkippedEmpty);
        }

        self.db.write_blob(key, &json.to_string())?;
        tracing::trace!(key, "Persisted document");
        Ok(SaveOutcome::Written)
    }
}

fn is_empty_document(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Array(items) => items.is_empty(),
        serde_json::Value::Object(fields) => fields.is_empty(),
        serde_json::Value::Null => true,
        _ => false,
    }
}
