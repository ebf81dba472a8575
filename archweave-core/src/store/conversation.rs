//! Architecture logs and issue threads
//!
//! Per project this store owns:
//! - one append-only architecture log
//! - an ordered, never-empty collection of issue threads
//!
//! "Active thread" is a caller concern. Operations that can remove the
//! caller's active thread return the resulting collection so the caller can
//! pick a new one.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use crate::persistence::{keys, PersistenceLayer};
use crate::types::{
    derive_thread_title, new_id, ChatStats, IssueThread, Message, ProjectChats, Role,
    DEFAULT_THREAD_TITLE,
};

use super::lock;

type ChatMap = BTreeMap<String, ProjectChats>;
type ThreadMap = BTreeMap<String, Vec<IssueThread>>;

/// Owns every project's conversation logs.
pub struct ConversationStore {
    persistence: Arc<PersistenceLayer>,
    title_max_chars: usize,
    chats: Mutex<ChatMap>,
    threads: Mutex<ThreadMap>,
}

impl ConversationStore {
    /// Hydrate both maps from persistence.
    pub fn init(persistence: Arc<PersistenceLayer>, title_max_chars: usize) -> Self {
        let chats: ChatMap = persistence.load(keys::PROJECT_CHATS).unwrap_or_default();
        let threads: ThreadMap = persistence.load(keys::ISSUE_THREADS).unwrap_or_default();
        tracing::debug!(
            chat_projects = chats.len(),
            thread_projects = threads.len(),
            "Loaded conversation state"
        );
        Self {
            persistence,
            title_max_chars,
            chats: Mutex::new(chats),
            threads: Mutex::new(threads),
        }
    }

    // ============================================
    // Architecture log
    // ============================================

    /// Architecture log in append order; empty for unknown projects.
    pub fn architecture_messages(&self, project_id: &str) -> Vec<Message> {
        lock(&self.chats)
            .get(project_id)
            .map(|c| c.architecture.clone())
            .unwrap_or_default()
    }

    /// Append to the architecture log and return the stored message.
    ///
    /// A message whose id already exists in the log is stored under a fresh id.
    pub fn append_architecture_message(&self, project_id: &str, mut message: Message) -> Message {
        let mut chats = lock(&self.chats);
        let log = &mut chats.entry(project_id.to_string()).or_default().architecture;
        ensure_unique_id(log, &mut message);
        log.push(message.clone());
        self.mirror_chats(&chats);
        message
    }

    /// Empty the architecture log of a project.
    pub fn clear_architecture(&self, project_id: &str) {
        let mut chats = lock(&self.chats);
        if let Some(project_chats) = chats.get_mut(project_id) {
            project_chats.architecture.clear();
            self.mirror_chats(&chats);
        }
    }

    // ============================================
    // Issue threads
    // ============================================

    /// Threads of a project, creating the default thread on first access.
    pub fn issue_threads(&self, project_id: &str) -> Vec<IssueThread> {
        let mut threads = lock(&self.threads);
        let (list, created) = materialize(&mut threads, project_id);
        let list = list.clone();
        if created {
            self.mirror_threads(&threads);
        }
        list
    }

    pub fn thread(&self, project_id: &str, thread_id: &str) -> Option<IssueThread> {
        lock(&self.threads)
            .get(project_id)?
            .iter()
            .find(|t| t.id == thread_id)
            .cloned()
    }

    /// Replace the whole collection. An empty replacement becomes one default thread.
    pub fn replace_issue_threads(
        &self,
        project_id: &str,
        threads: Vec<IssueThread>,
    ) -> Vec<IssueThread> {
        let threads = if threads.is_empty() {
            vec![IssueThread::new_default()]
        } else {
            threads
        };
        let mut all = lock(&self.threads);
        all.insert(project_id.to_string(), threads.clone());
        self.mirror_threads(&all);
        threads
    }

    /// Start a new empty thread at the front of the collection.
    pub fn create_thread(&self, project_id: &str) -> IssueThread {
        let thread = IssueThread::new_default();
        let mut all = lock(&self.threads);
        let (list, _) = materialize(&mut all, project_id);
        list.insert(0, thread.clone());
        self.mirror_threads(&all);
        tracing::debug!(project_id, thread_id = %thread.id, "Created issue thread");
        thread
    }

    /// Remove one thread and return what is left.
    ///
    /// Removing the last thread leaves a fresh default thread in its place.
    /// Unknown ids leave the collection unchanged.
    pub fn delete_thread(&self, project_id: &str, thread_id: &str) -> Vec<IssueThread> {
        let mut all = lock(&self.threads);
        let (list, created) = materialize(&mut all, project_id);
        let before = list.len();
        list.retain(|t| t.id != thread_id);
        let removed = list.len() != before;
        if list.is_empty() {
            list.push(IssueThread::new_default());
        }
        let result = list.clone();
        if removed || created {
            self.mirror_threads(&all);
        }
        result
    }

    /// Reset a project to a single default thread.
    pub fn delete_all_threads(&self, project_id: &str) -> Vec<IssueThread> {
        self.replace_issue_threads(project_id, Vec::new())
    }

    /// Rename a thread. Blank titles fall back to the default title.
    pub fn rename_thread(
        &self,
        project_id: &str,
        thread_id: &str,
        new_title: &str,
    ) -> Option<IssueThread> {
        let mut all = lock(&self.threads);
        let thread = all
            .get_mut(project_id)?
            .iter_mut()
            .find(|t| t.id == thread_id)?;

        let trimmed = new_title.trim();
        if trimmed.is_empty() {
            thread.title = DEFAULT_THREAD_TITLE.to_string();
            thread.renamed = false;
        } else {
            thread.title = trimmed.to_string();
            thread.renamed = true;
        }
        let renamed = thread.clone();
        self.mirror_threads(&all);
        Some(renamed)
    }

    /// Append to one thread; `None` if the thread does not exist.
    ///
    /// The first user message of a thread that was never renamed also sets
    /// its title.
    pub fn append_thread_message(
        &self,
        project_id: &str,
        thread_id: &str,
        mut message: Message,
    ) -> Option<Message> {
        let mut all = lock(&self.threads);
        let thread = all
            .get_mut(project_id)?
            .iter_mut()
            .find(|t| t.id == thread_id)?;

        if message.role == Role::User && thread.messages.is_empty() && !thread.renamed {
            thread.title = derive_thread_title(message.content.trim(), self.title_max_chars);
        }
        ensure_unique_id(&thread.messages, &mut message);
        thread.messages.push(message.clone());
        self.mirror_threads(&all);
        Some(message)
    }

    // ============================================
    // Project-wide
    // ============================================

    pub fn stats(&self, project_id: &str) -> ChatStats {
        let architecture_count = lock(&self.chats)
            .get(project_id)
            .map(|c| c.architecture.len())
            .unwrap_or(0);
        let threads = lock(&self.threads);
        let project_threads = threads.get(project_id).map(Vec::as_slice).unwrap_or(&[]);
        ChatStats {
            architecture_count,
            issue_message_count: project_threads.iter().map(|t| t.messages.len()).sum(),
            thread_count: project_threads.len(),
        }
    }

    /// Drop every log and thread of a deleted project.
    pub fn purge(&self, project_id: &str) {
        {
            let mut chats = lock(&self.chats);
            if chats.remove(project_id).is_some() {
                self.mirror_chats(&chats);
            }
        }
        let mut threads = lock(&self.threads);
        if threads.remove(project_id).is_some() {
            self.mirror_threads(&threads);
        }
    }

    fn mirror_chats(&self, chats: &ChatMap) {
        if let Err(e) = self.persistence.save(keys::PROJECT_CHATS, chats) {
            tracing::warn!(error = %e, "Failed to persist conversation logs");
        }
    }

    fn mirror_threads(&self, threads: &ThreadMap) {
        if let Err(e) = self.persistence.save(keys::ISSUE_THREADS, threads) {
            tracing::warn!(error = %e, "Failed to persist issue threads");
        }
    }
}

/// The project's thread list, inserting the default thread if it is missing
/// or empty. The flag reports whether anything was inserted.
fn materialize<'a>(threads: &'a mut ThreadMap, project_id: &str) -> (&'a mut Vec<IssueThread>, bool) {
    let list = threads.entry(project_id.to_string()).or_default();
    let created = list.is_empty();
    if created {
        list.push(IssueThread::new_default());
    }
    (list, created)
}

fn ensure_unique_id(log: &[Message], message: &mut Message) {
    if log.iter().any(|m| m.id == message.id) {
        let reissued = new_id();
        tracing::debug!(old_id = %message.id, new_id = %reissued, "Reissuing duplicate message id");
        message.id = reissued;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (Arc<PersistenceLayer>, ConversationStore) {
        let persistence = Arc::new(PersistenceLayer::in_memory().unwrap());
        let store = ConversationStore::init(persistence.clone(), 50);
        (persistence, store)
    }

    #[test]
    fn test_unknown_project_has_empty_log() {
        let (_, store) = store();
        assert!(store.architecture_messages("nope").is_empty());
    }

    #[test]
    fn test_append_preserves_order() {
        let (_, store) = store();
        for i in 0..5 {
            store.append_architecture_message("p1", Message::user(format!("m{}", i)));
        }
        let contents: Vec<_> = store
            .architecture_messages("p1")
            .into_iter()
            .map(|m| m.content)
            .collect();
        assert_eq!(contents, vec!["m0", "m1", "m2", "m3", "m4"]);
    }

    #[test]
    fn test_duplicate_ids_are_reissued() {
        let (_, store) = store();
        let message = Message::user("same");
        let first = store.append_architecture_message("p1", message.clone());
        let second = store.append_architecture_message("p1", message);
        assert_ne!(first.id, second.id);
    }

    #[test]
    fn test_default_thread_is_stable() {
        let (_, store) = store();
        let first = store.issue_threads("p1");
        let second = store.issue_threads("p1");
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].title, DEFAULT_THREAD_TITLE);
        assert_eq!(first[0].id, second[0].id);
    }

    #[test]
    fn test_delete_last_thread_creates_default() {
        let (_, store) = store();
        let only = store.issue_threads("p1").remove(0);
        store.append_thread_message("p1", &only.id, Message::user("hello"));

        let remaining = store.delete_thread("p1", &only.id);
        assert_eq!(remaining.len(), 1);
        assert_ne!(remaining[0].id, only.id);
        assert_eq!(remaining[0].title, DEFAULT_THREAD_TITLE);
        assert!(remaining[0].messages.is_empty());
    }

    #[test]
    fn test_delete_unknown_thread_is_noop() {
        let (_, store) = store();
        let before = store.issue_threads("p1");
        assert_eq!(store.delete_thread("p1", "missing"), before);
    }

    #[test]
    fn test_replace_with_nothing_keeps_one_thread() {
        let (_, store) = store();
        store.create_thread("p1");
        let threads = store.replace_issue_threads("p1", vec![]);
        assert_eq!(threads.len(), 1);
        assert_eq!(store.issue_threads("p1"), threads);
    }

    #[test]
    fn test_create_thread_goes_first() {
        let (_, store) = store();
        let original = store.issue_threads("p1");
        let created = store.create_thread("p1");
        let threads = store.issue_threads("p1");
        assert_eq!(threads.len(), 2);
        assert_eq!(threads[0].id, created.id);
        assert_eq!(threads[1].id, original[0].id);
    }

    #[test]
    fn test_rename_thread() {
        let (_, store) = store();
        let thread = store.issue_threads("p1").remove(0);

        let renamed = store.rename_thread("p1", &thread.id, "  Caching  ").unwrap();
        assert_eq!(renamed.title, "Caching");
        assert!(renamed.renamed);

        let blank = store.rename_thread("p1", &thread.id, "   ").unwrap();
        assert_eq!(blank.title, DEFAULT_THREAD_TITLE);

        assert!(store.rename_thread("p1", "missing", "x").is_none());
    }

    #[test]
    fn test_title_derived_from_first_user_message() {
        let (_, store) = store();
        let thread = store.issue_threads("p1").remove(0);
        store.append_thread_message("p1", &thread.id, Message::user("how to scale?"));
        store.append_thread_message("p1", &thread.id, Message::user("second question"));

        let thread = store.thread("p1", &thread.id).unwrap();
        assert_eq!(thread.title, "how to scale?");
        assert_eq!(thread.messages.len(), 2);
    }

    #[test]
    fn test_renamed_thread_keeps_title() {
        let (_, store) = store();
        let thread = store.issue_threads("p1").remove(0);
        store.rename_thread("p1", &thread.id, "Pinned");
        store.append_thread_message("p1", &thread.id, Message::user("how to scale?"));
        assert_eq!(store.thread("p1", &thread.id).unwrap().title, "Pinned");
    }

    #[test]
    fn test_append_to_missing_thread() {
        let (_, store) = store();
        assert!(store
            .append_thread_message("p1", "missing", Message::user("x"))
            .is_none());
    }

    #[test]
    fn test_stats() {
        let (_, store) = store();
        store.append_architecture_message("p1", Message::user("a"));
        store.append_architecture_message("p1", Message::assistant("b"));
        let thread = store.issue_threads("p1").remove(0);
        store.append_thread_message("p1", &thread.id, Message::user("q"));
        store.create_thread("p1");

        let stats = store.stats("p1");
        assert_eq!(stats.architecture_count, 2);
        assert_eq!(stats.issue_message_count, 1);
        assert_eq!(stats.thread_count, 2);
        assert_eq!(stats.total_messages(), 3);
    }

    #[test]
    fn test_purge_and_reload() {
        let (persistence, store) = store();
        store.append_architecture_message("p1", Message::user("a"));
        store.append_architecture_message("p2", Message::user("b"));
        store.issue_threads("p1");
        store.issue_threads("p2");
        store.purge("p1");

        let reloaded = ConversationStore::init(persistence, 50);
        assert!(reloaded.architecture_messages("p1").is_empty());
        assert_eq!(reloaded.architecture_messages("p2").len(), 1);
        assert_eq!(reloaded.stats("p1").thread_count, 0);
        assert_eq!(reloaded.stats("p2").thread_count, 1);
    }

    #[test]
    fn test_clear_architecture() {
        let (_, store) = store();
        store.append_architecture_message("p1", Message::user("a"));
        store.clear_architecture("p1");
        assert!(store.architecture_messages("p1").is_empty());
    }
}
