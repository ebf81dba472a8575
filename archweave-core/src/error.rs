//! Error types for archweave-core

use thiserror::Error;

/// Main error type for the archweave-core library
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Empty or whitespace-only input
    #[error("validation error: {0}")]
    Validation(String),

    /// Generation service failure (transport problem or non-2xx status)
    #[error("generation error{}: {message}", status_suffix(.status))]
    Generation {
        status: Option<u16>,
        message: String,
    },

    /// Generation service answered 2xx with a body that is not a usable reply
    #[error("malformed generation reply: {0}")]
    MalformedReply(String),

    /// Project not found
    #[error("project not found: {0}")]
    ProjectNotFound(String),

    /// Issue thread not found
    #[error("thread not found: {0}")]
    ThreadNotFound(String),
}

impl Error {
    /// Generation failure without an HTTP status
    pub fn generation(message: impl Into<String>) -> Self {
        Error::Generation {
            status: None,
            message: message.into(),
        }
    }
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" ({})", s)).unwrap_or_default()
}

/// Result type alias for archweave-core
pub type Result<T> = std::result::Result<T, Error>;
