//! Explicit wiring of the persistence layer, stores, and composer
//!
//! Every component is constructed here and handed its collaborators. There
//! are no globals; tests build a [`Workspace`] around an in-memory database
//! and their own [`Generator`].

use std::sync::Arc;

use crate::composer::MessageComposer;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::generation::{Generator, HttpGenerator};
use crate::persistence::PersistenceLayer;
use crate::store::{ContextBridge, ConversationStore, ProjectStore};
use crate::types::{IssueThread, Project};

/// Hydrated application state.
pub struct Workspace {
    persistence: Arc<PersistenceLayer>,
    projects: Arc<ProjectStore>,
    conversations: Arc<ConversationStore>,
    context: Arc<ContextBridge>,
    composer: MessageComposer,
}

impl Workspace {
    /// Open the configured database and talk to the configured service.
    pub fn open(config: &Config) -> Result<Self> {
        let persistence = Arc::new(PersistenceLayer::open(
            &config.database_path(),
            config.storage.empty_store_policy,
        )?);
        let generator = Arc::new(HttpGenerator::new(config.generation.clone())?);
        Ok(Self::with_generator(persistence, config, generator))
    }

    /// Non-durable workspace with default settings.
    pub fn in_memory(generator: Arc<dyn Generator>) -> Result<Self> {
        let persistence = Arc::new(PersistenceLayer::in_memory()?);
        Ok(Self::with_generator(
            persistence,
            &Config::default(),
            generator,
        ))
    }

    /// Hydrate every store from `persistence` and wire them together.
    pub fn with_generator(
        persistence: Arc<PersistenceLayer>,
        config: &Config,
        generator: Arc<dyn Generator>,
    ) -> Self {
        let conversations = Arc::new(ConversationStore::init(
            persistence.clone(),
            config.conversation.title_max_chars,
        ));
        let context = Arc::new(ContextBridge::init(persistence.clone()));
        let projects = Arc::new(ProjectStore::init(
            persistence.clone(),
            conversations.clone(),
            context.clone(),
        ));
        let composer = MessageComposer::new(
            projects.clone(),
            conversations.clone(),
            context.clone(),
            generator,
            config.conversation.response_ordering,
        );

        Self {
            persistence,
            projects,
            conversations,
            context,
            composer,
        }
    }

    pub fn persistence(&self) -> &Arc<PersistenceLayer> {
        &self.persistence
    }

    pub fn projects(&self) -> &Arc<ProjectStore> {
        &self.projects
    }

    pub fn conversations(&self) -> &Arc<ConversationStore> {
        &self.conversations
    }

    pub fn context(&self) -> &Arc<ContextBridge> {
        &self.context
    }

    pub fn composer(&self) -> &MessageComposer {
        &self.composer
    }

    /// Look up a project by id, falling back to an exact name match.
    pub fn find_project(&self, id_or_name: &str) -> Result<Project> {
        if let Some(project) = self.projects.get(id_or_name) {
            return Ok(project);
        }
        self.projects
            .list()
            .into_iter()
            .find(|p| p.name == id_or_name)
            .ok_or_else(|| Error::ProjectNotFound(id_or_name.to_string()))
    }

    /// Look up a thread by id, falling back to its position in the thread list.
    pub fn find_thread(&self, project_id: &str, id_or_index: &str) -> Result<IssueThread> {
        let threads = self.conversations.issue_threads(project_id);
        if let Some(thread) = threads.iter().find(|t| t.id == id_or_index) {
            return Ok(thread.clone());
        }
        id_or_index
            .parse::<usize>()
            .ok()
            .and_then(|i| threads.get(i).cloned())
            .ok_or_else(|| Error::ThreadNotFound(id_or_index.to_string()))
    }
}
