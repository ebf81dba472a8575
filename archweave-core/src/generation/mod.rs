//! Generation collaborator contract
//!
//! The remote service that turns a prompt (plus optional context and
//! history) into conversational content. Only its request/response shapes
//! matter here; [`HttpGenerator`] is the production adapter and tests plug in
//! their own [`Generator`].

mod http;

pub use http::HttpGenerator;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::{ArchitectureContextSnapshot, HistoryEntry};

/// `chatType` sent with every architecture ask.
pub const ARCHITECTURE_CHAT_TYPE: &str = "architecture";

/// Body of an architecture ask.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchitectureRequest {
    pub query: String,
    pub project_id: String,
    pub chat_type: String,
}

impl ArchitectureRequest {
    pub fn new(query: impl Into<String>, project_id: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            project_id: project_id.into(),
            chat_type: ARCHITECTURE_CHAT_TYPE.to_string(),
        }
    }
}

/// Body of an issue-thread ask.
///
/// `context` serializes as `null` when the project has no snapshot yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueRequest {
    pub message: String,
    pub project_id: String,
    pub context: Option<ArchitectureContextSnapshot>,
    /// Thread messages before this one, oldest first
    pub history: Vec<HistoryEntry>,
}

/// Body of a prompt-enhancement request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EnhanceRequest {
    pub message: String,
}

/// Text extracted from a successful reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationReply {
    pub text: String,
}

/// Reply body as sent by the service. Which field carries the text depends
/// on the endpoint and the service version.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawReply {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub response: Option<String>,
    #[serde(default)]
    pub enhanced_prompt: Option<String>,
}

impl RawReply {
    /// Text of a chat reply: `message`, else `response`.
    pub fn into_chat_reply(self) -> Result<GenerationReply> {
        self.message
            .or(self.response)
            .map(|text| GenerationReply { text })
            .ok_or_else(|| {
                Error::MalformedReply("reply has neither `message` nor `response`".to_string())
            })
    }

    /// Text of an enhancement reply: `enhancedPrompt`, else `message`.
    pub fn into_enhanced_reply(self) -> Result<GenerationReply> {
        self.enhanced_prompt
            .or(self.message)
            .map(|text| GenerationReply { text })
            .ok_or_else(|| {
                Error::MalformedReply("reply has neither `enhancedPrompt` nor `message`".to_string())
            })
    }
}

/// The external text-generation service.
///
/// Any error counts as a generation failure; callers substitute a fallback.
#[async_trait]
pub trait Generator: Send + Sync {
    async fn ask_architecture(&self, request: &ArchitectureRequest) -> Result<GenerationReply>;

    async fn ask_issue(&self, request: &IssueRequest) -> Result<GenerationReply>;

    async fn enhance_prompt(&self, request: &EnhanceRequest) -> Result<GenerationReply>;
}
