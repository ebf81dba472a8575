//! Message composition
//!
//! A send runs `user echo -> generation call -> apply`. The user message is
//! appended before any network activity. Whatever the generation service
//! does, the log then gains exactly one assistant message: the reply on
//! success, or a [`fallback`] document on failure.
//!
//! The echo and apply steps each run inside
//! [`ProjectStore::with_existing`], so a concurrent project delete either
//! finishes before a step or waits for it. No lock is held across the
//! awaited call, so concurrent sends on one log interleave at message
//! granularity. [`ResponseOrdering`] decides what happens when their replies
//! resolve out of order.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::config::ResponseOrdering;
use crate::error::Result;
use crate::fallback;
use crate::generation::{ArchitectureRequest, EnhanceRequest, Generator, IssueRequest};
use crate::store::{lock, ContextBridge, ConversationStore, ProjectStore};
use crate::types::{ArchitectureContextSnapshot, Message};

/// What a send did to its target log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// Blank prompt; nothing was appended or sent
    Skipped,
    /// Reply from the generation service was appended
    Applied { message: Message },
    /// Generation failed; the synthesized document was appended
    FallbackApplied { message: Message },
    /// Target is unknown, or was deleted while the call was in flight
    Dropped,
    /// A newer send on the same log is outstanding; reply discarded
    Superseded,
}

impl SendOutcome {
    /// The assistant message appended by this send, if any.
    pub fn message(&self) -> Option<&Message> {
        match self {
            SendOutcome::Applied { message } | SendOutcome::FallbackApplied { message } => {
                Some(message)
            }
            _ => None,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, SendOutcome::FallbackApplied { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum LogKey {
    Architecture(String),
    Issue(String, String),
}

/// Sends prompts to the generation service and applies the replies.
pub struct MessageComposer {
    projects: Arc<ProjectStore>,
    conversations: Arc<ConversationStore>,
    context: Arc<ContextBridge>,
    generator: Arc<dyn Generator>,
    ordering: ResponseOrdering,
    /// Latest ticket issued per log
    tickets: Mutex<HashMap<LogKey, u64>>,
}

impl MessageComposer {
    pub fn new(
        projects: Arc<ProjectStore>,
        conversations: Arc<ConversationStore>,
        context: Arc<ContextBridge>,
        generator: Arc<dyn Generator>,
        ordering: ResponseOrdering,
    ) -> Self {
        Self {
            projects,
            conversations,
            context,
            generator,
            ordering,
            tickets: Mutex::new(HashMap::new()),
        }
    }

    pub fn ordering(&self) -> ResponseOrdering {
        self.ordering
    }

    /// Send a prompt on the project's architecture log.
    ///
    /// After the assistant message lands, the project's context snapshot is
    /// replaced with the reply text and the full log. An unknown project
    /// yields [`SendOutcome::Dropped`] without touching any store.
    pub async fn send_architecture(&self, project_id: &str, prompt: &str) -> Result<SendOutcome> {
        if prompt.trim().is_empty() {
            return Ok(SendOutcome::Skipped);
        }

        let key = LogKey::Architecture(project_id.to_string());
        let echoed = self.projects.with_existing(project_id, || {
            self.conversations
                .append_architecture_message(project_id, Message::user(prompt));
            self.issue_ticket(&key)
        });
        let Some(ticket) = echoed else {
            tracing::debug!(project_id, "Architecture send to unknown project ignored");
            return Ok(self.drop_reply());
        };

        let request = ArchitectureRequest::new(prompt, project_id);
        let (text, is_fallback) = match self.generator.ask_architecture(&request).await {
            Ok(reply) => (reply.text, false),
            Err(e) => {
                tracing::warn!(project_id, error = %e, "Architecture generation failed, using fallback");
                (fallback::design_document(prompt), true)
            }
        };

        let applied = self.projects.with_existing(project_id, || {
            if !self.is_current(&key, ticket) {
                return None;
            }
            let message = self
                .conversations
                .append_architecture_message(project_id, Message::assistant(text.clone()));
            let log = self.conversations.architecture_messages(project_id);
            self.context.update(
                project_id,
                ArchitectureContextSnapshot::new(project_id, text, log),
            );
            Some(message)
        });

        match applied {
            Some(Some(message)) => Ok(finish(message, is_fallback)),
            Some(None) => {
                tracing::debug!(project_id, ticket, "Architecture reply superseded");
                Ok(SendOutcome::Superseded)
            }
            None => {
                tracing::debug!(project_id, "Project deleted mid-send, dropping reply");
                Ok(self.drop_reply())
            }
        }
    }

    /// Send a prompt on one issue thread.
    ///
    /// The request carries the project's context snapshot (or `null`) and
    /// the thread's messages from before this prompt. An unknown project or
    /// thread yields [`SendOutcome::Dropped`] without touching any store.
    pub async fn send_issue(
        &self,
        project_id: &str,
        thread_id: &str,
        prompt: &str,
    ) -> Result<SendOutcome> {
        if prompt.trim().is_empty() {
            return Ok(SendOutcome::Skipped);
        }

        let key = LogKey::Issue(project_id.to_string(), thread_id.to_string());
        let echoed = self.projects.with_existing(project_id, || {
            let history = self.conversations.thread(project_id, thread_id)?.history();
            self.conversations
                .append_thread_message(project_id, thread_id, Message::user(prompt))?;
            Some((history, self.issue_ticket(&key)))
        });
        let Some((history, ticket)) = echoed.flatten() else {
            tracing::debug!(project_id, thread_id, "Issue send to unknown target ignored");
            return Ok(self.drop_reply());
        };

        let context = self.context.get(project_id);
        let has_context = context.is_some();
        let request = IssueRequest {
            message: prompt.to_string(),
            project_id: project_id.to_string(),
            context,
            history,
        };

        let (text, is_fallback) = match self.generator.ask_issue(&request).await {
            Ok(reply) => (reply.text, false),
            Err(e) => {
                tracing::warn!(project_id, thread_id, error = %e, "Issue generation failed, using fallback");
                (fallback::synthesize(prompt, has_context), true)
            }
        };

        let applied = self.projects.with_existing(project_id, || {
            if !self.is_current(&key, ticket) {
                return Some(None);
            }
            self.conversations
                .append_thread_message(project_id, thread_id, Message::assistant(text))
                .map(Some)
        });

        match applied.flatten() {
            Some(Some(message)) => Ok(finish(message, is_fallback)),
            Some(None) => {
                tracing::debug!(project_id, thread_id, ticket, "Issue reply superseded");
                Ok(SendOutcome::Superseded)
            }
            None => {
                tracing::debug!(project_id, thread_id, "Thread deleted mid-send, dropping reply");
                Ok(self.drop_reply())
            }
        }
    }

    /// Rewrite a rough prompt into a fuller one.
    ///
    /// Blank prompts yield `None`. Failures yield a fixed enhancement template.
    pub async fn enhance_prompt(&self, prompt: &str) -> Option<String> {
        if prompt.trim().is_empty() {
            return None;
        }

        let request = EnhanceRequest {
            message: prompt.to_string(),
        };
        match self.generator.enhance_prompt(&request).await {
            Ok(reply) => Some(reply.text),
            Err(e) => {
                tracing::warn!(error = %e, "Prompt enhancement failed, using fallback");
                Some(fallback::enhance_fallback(prompt))
            }
        }
    }

    fn issue_ticket(&self, key: &LogKey) -> u64 {
        let mut tickets = lock(&self.tickets);
        let latest = tickets.entry(key.clone()).or_insert(0);
        *latest += 1;
        *latest
    }

    /// Resolve a send as dropped and forget tickets of logs that are gone.
    fn drop_reply(&self) -> SendOutcome {
        let keys: Vec<LogKey> = lock(&self.tickets).keys().cloned().collect();
        let stale: Vec<LogKey> = keys
            .into_iter()
            .filter(|key| match key {
                LogKey::Architecture(pid) => !self.projects.contains(pid),
                LogKey::Issue(pid, tid) => {
                    !self.projects.contains(pid) || self.conversations.thread(pid, tid).is_none()
                }
            })
            .collect();

        if !stale.is_empty() {
            let mut tickets = lock(&self.tickets);
            for key in &stale {
                tickets.remove(key);
            }
            tracing::debug!(count = stale.len(), "Pruned tickets of deleted logs");
        }
        SendOutcome::Dropped
    }

    /// Number of logs with an outstanding ticket.
    pub(crate) fn tracked_logs(&self) -> usize {
        lock(&self.tickets).len()
    }

    fn is_current(&self, key: &LogKey, ticket: u64) -> bool {
        match self.ordering {
            ResponseOrdering::ResolutionOrder => true,
            ResponseOrdering::LatestOnly => {
                lock(&self.tickets).get(key).copied().unwrap_or(0) == ticket
            }
        }
    }
}

fn finish(message: Message, is_fallback: bool) -> SendOutcome {
    if is_fallback {
        SendOutcome::FallbackApplied { message }
    } else {
        SendOutcome::Applied { message }
    }
}
