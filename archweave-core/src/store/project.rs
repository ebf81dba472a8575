//! Project list

use std::sync::{Arc, Mutex};

use chrono::Utc;

use crate::error::{Error, Result};
use crate::persistence::{keys, PersistenceLayer};
use crate::types::{new_id, Project};

use super::{lock, ContextBridge, ConversationStore};

/// Owns the set of projects, in creation order.
///
/// Deleting a project cascades into the conversation store and the context
/// bridge so nothing keyed by the old id survives.
pub struct ProjectStore {
    persistence: Arc<PersistenceLayer>,
    conversations: Arc<ConversationStore>,
    context: Arc<ContextBridge>,
    projects: Mutex<Vec<Project>>,
}

impl ProjectStore {
    pub fn init(
        persistence: Arc<PersistenceLayer>,
        conversations: Arc<ConversationStore>,
        context: Arc<ContextBridge>,
    ) -> Self {
        let projects: Vec<Project> = persistence.load(keys::PROJECTS).unwrap_or_default();
        tracing::debug!(count = projects.len(), "Loaded projects");
        Self {
            persistence,
            conversations,
            context,
            projects: Mutex::new(projects),
        }
    }

    /// Create a project. Blank names are rejected without any mutation.
    pub fn create(&self, name: &str) -> Result<Project> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::Validation(
                "project name must not be empty".to_string(),
            ));
        }

        let project = Project {
            id: new_id(),
            name: name.to_string(),
            created_at: Utc::now(),
        };

        let mut projects = lock(&self.projects);
        projects.push(project.clone());
        self.mirror(&projects);
        tracing::info!(project_id = %project.id, name = %project.name, "Created project");
        Ok(project)
    }

    /// Delete a project and everything keyed by it. Unknown ids are a no-op.
    ///
    /// The project lock is held through the cascade, so a
    /// [`with_existing`](Self::with_existing) step never sees the project gone
    /// while its logs or snapshot are still present.
    pub fn delete(&self, id: &str) {
        let mut projects = lock(&self.projects);
        let before = projects.len();
        projects.retain(|p| p.id != id);
        if projects.len() == before {
            tracing::debug!(project_id = id, "Delete of unknown project ignored");
            return;
        }
        self.mirror(&projects);

        self.conversations.purge(id);
        self.context.purge(id);
        tracing::info!(project_id = id, "Deleted project");
    }

    /// Run `f` while project `id` is guaranteed to exist.
    ///
    /// Returns `None` without calling `f` if the project is unknown. A
    /// concurrent [`delete`](Self::delete) waits until `f` returns, so writes
    /// made by `f` are either completed before the cascade or never made.
    /// `f` must not call back into this store.
    pub fn with_existing<R>(&self, id: &str, f: impl FnOnce() -> R) -> Option<R> {
        let projects = lock(&self.projects);
        if !projects.iter().any(|p| p.id == id) {
            return None;
        }
        Some(f())
    }

    pub fn list(&self) -> Vec<Project> {
        lock(&self.projects).clone()
    }

    pub fn get(&self, id: &str) -> Option<Project> {
        lock(&self.projects).iter().find(|p| p.id == id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        lock(&self.projects).iter().any(|p| p.id == id)
    }

    fn mirror(&self, projects: &[Project]) {
        if let Err(e) = self.persistence.save(keys::PROJECTS, &projects) {
            tracing::warn!(error = %e, "Failed to persist projects");
        }
    }
}
