//! Core domain types for archweave
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Project** | Top-level unit grouping one architecture log and a set of issue threads |
//! | **Architecture Log** | The single ordered conversation that iterates on the design document |
//! | **Issue Thread** | One of many independent Q&A conversations used for follow-up questions |
//! | **Context Snapshot** | The latest architecture summary made available to issue threads |
//!
//! Entities reference their project by id only. Stores own the data; nothing
//! here holds a pointer back to its parent.
//!
//! Field names on the wire and in persisted JSON are camelCase so that state
//! written by earlier clients loads unchanged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Title given to freshly created issue threads.
pub const DEFAULT_THREAD_TITLE: &str = "New Chat";

/// Allocate a new opaque identifier.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

// ============================================
// Project
// ============================================

/// A design project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    /// Opaque unique token
    pub id: String,
    /// Display name (never blank)
    pub name: String,
    /// When the project was created
    pub created_at: DateTime<Utc>,
}

// ============================================
// Messages
// ============================================

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" | "User" => Ok(Role::User),
            "assistant" | "Assistant" => Ok(Role::Assistant),
            _ => Err(format!("unknown role: {}", s)),
        }
    }
}

/// A single conversation entry. Immutable once appended to a log.
///
/// `content` may embed fenced diagram fragments; see [`crate::content`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Unique within its owning log
    pub id: String,
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Build a message stamped with a fresh id and the current time.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// The `{role, content}` projection sent as issue-thread history.
    pub fn to_history_entry(&self) -> HistoryEntry {
        HistoryEntry {
            role: self.role,
            content: self.content.clone(),
        }
    }
}

/// Role and content of a prior message, as sent to the generation service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: Role,
    pub content: String,
}

// ============================================
// Architecture log
// ============================================

/// Per-project conversation logs, persisted as `{architecture: [...]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectChats {
    /// Architecture log in chronological order
    #[serde(default)]
    pub architecture: Vec<Message>,
}

// ============================================
// Issue threads
// ============================================

/// An independent follow-up conversation within a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueThread {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub messages: Vec<Message>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    /// Set once the title has been edited by hand; stops title auto-derivation
    #[serde(default)]
    pub renamed: bool,
}

impl IssueThread {
    /// A fresh, empty thread titled [`DEFAULT_THREAD_TITLE`].
    pub fn new_default() -> Self {
        Self {
            id: new_id(),
            title: DEFAULT_THREAD_TITLE.to_string(),
            messages: Vec::new(),
            created_at: Utc::now(),
            renamed: false,
        }
    }

    /// Prior messages as `{role, content}` history entries.
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.messages.iter().map(Message::to_history_entry).collect()
    }
}

/// Derive a thread title from the first user message.
///
/// Keeps the first `max_chars` characters and appends `...` when the
/// content was longer.
pub fn derive_thread_title(content: &str, max_chars: usize) -> String {
    let mut chars = content.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}

// ============================================
// Context snapshot
// ============================================

/// Latest architecture state handed to issue threads for grounding.
///
/// Persisted and sent on the wire as `{projectId, lastUpdate, summary, messages}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchitectureContextSnapshot {
    #[serde(rename = "projectId")]
    pub project_id: String,
    #[serde(rename = "lastUpdate")]
    pub last_update: DateTime<Utc>,
    /// Text of the assistant reply that closed the last architecture exchange
    #[serde(rename = "summary")]
    pub summary_text: String,
    /// Full architecture log as of that exchange
    #[serde(rename = "messages", default)]
    pub copied_messages: Vec<Message>,
}

impl ArchitectureContextSnapshot {
    pub fn new(
        project_id: impl Into<String>,
        summary_text: impl Into<String>,
        copied_messages: Vec<Message>,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            last_update: Utc::now(),
            summary_text: summary_text.into(),
            copied_messages,
        }
    }
}

// ============================================
// Stats
// ============================================

/// Message counts for a project.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChatStats {
    pub architecture_count: usize,
    pub issue_message_count: usize,
    pub thread_count: usize,
}

impl ChatStats {
    pub fn total_messages(&self) -> usize {
        self.architecture_count + self.issue_message_count
    }
}
