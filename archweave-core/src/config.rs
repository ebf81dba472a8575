//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/archweave/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/archweave/` (~/.config/archweave/)
//! - Data: `$XDG_DATA_HOME/archweave/` (~/.local/share/archweave/)
//! - State/Logs: `$XDG_STATE_HOME/archweave/` (~/.local/state/archweave/)

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variable that overrides `generation.auth_token`
pub const AUTH_TOKEN_ENV: &str = "ARCHWEAVE_AUTH_TOKEN";

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_DATA_HOME or ~/.local/share
fn xdg_data_home() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/share"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default, Clone)]
pub struct Config {
    /// Generation service endpoint and transport settings
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Local storage settings
    #[serde(default)]
    pub storage: StorageConfig,

    /// Conversation behavior
    #[serde(default)]
    pub conversation: ConversationConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Generation service configuration
#[derive(Debug, Deserialize, Clone)]
pub struct GenerationConfig {
    /// Service base URL (e.g., `http://localhost:8000`)
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Path for architecture asks
    #[serde(default = "default_architecture_path")]
    pub architecture_path: String,

    /// Path for issue-thread asks
    #[serde(default = "default_issue_path")]
    pub issue_path: String,

    /// Path for prompt enhancement
    #[serde(default = "default_enhance_path")]
    pub enhance_path: String,

    /// Bearer token; requests go out unauthenticated when absent
    pub auth_token: Option<String>,

    /// HTTP request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Retry attempts for transient failures (5xx, transport errors)
    #[serde(default)]
    pub max_retries: usize,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            architecture_path: default_architecture_path(),
            issue_path: default_issue_path(),
            enhance_path: default_enhance_path(),
            auth_token: None,
            timeout_secs: default_timeout_secs(),
            max_retries: 0,
        }
    }
}

impl GenerationConfig {
    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        let base = self.base_url.trim();
        if base.is_empty() {
            return Err(Error::Config(
                "generation.base_url must not be empty".to_string(),
            ));
        }
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(Error::Config(format!(
                "generation.base_url must be an http(s) URL, got {:?}",
                base
            )));
        }
        if self.timeout_secs == 0 {
            return Err(Error::Config(
                "generation.timeout_secs must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Token to attach, preferring the environment over the config file.
    ///
    /// Blank values count as absent.
    pub fn resolved_token(&self) -> Option<String> {
        std::env::var(AUTH_TOKEN_ENV)
            .ok()
            .or_else(|| self.auth_token.clone())
            .filter(|t| !t.trim().is_empty())
    }
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_architecture_path() -> String {
    "/chat/ask/".to_string()
}

fn default_issue_path() -> String {
    "/issues/chat".to_string()
}

fn default_enhance_path() -> String {
    "/enhance".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

/// What to do when a store becomes empty.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum EmptyStorePolicy {
    /// Write the empty document, so deletions survive a reload
    #[default]
    Overwrite,
    /// Skip the write and keep whatever was persisted before
    Preserve,
}

/// Local storage configuration
#[derive(Debug, Deserialize, Clone, Default)]
pub struct StorageConfig {
    /// Override for the SQLite database location
    pub database_path: Option<PathBuf>,

    #[serde(default)]
    pub empty_store_policy: EmptyStorePolicy,
}

/// How replies to overlapping sends on one log are applied.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ResponseOrdering {
    /// Apply every reply as it resolves, even if that reorders them
    #[default]
    ResolutionOrder,
    /// Apply a reply only if its send is still the latest on that log
    LatestOnly,
}

/// Conversation behavior configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ConversationConfig {
    #[serde(default)]
    pub response_ordering: ResponseOrdering,

    /// Characters kept when deriving a thread title from its first message
    #[serde(default = "default_title_max_chars")]
    pub title_max_chars: usize,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            response_ordering: ResponseOrdering::default(),
            title_max_chars: default_title_max_chars(),
        }
    }
}

fn default_title_max_chars() -> usize {
    50
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Maximum number of log files to keep
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_files: default_max_log_files(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    5
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        config.generation.validate()?;
        Ok(config)
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/archweave/config.toml` (~/.config/archweave/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("archweave").join("config.toml")
    }

    /// Returns the data directory path (for the SQLite database)
    ///
    /// `$XDG_DATA_HOME/archweave/` (~/.local/share/archweave/)
    pub fn data_dir() -> PathBuf {
        xdg_data_home().join("archweave")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/archweave/` (~/.local/state/archweave/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("archweave")
    }

    /// Returns the default database file path
    ///
    /// `$XDG_DATA_HOME/archweave/state.db` (~/.local/share/archweave/state.db)
    pub fn default_database_path() -> PathBuf {
        Self::data_dir().join("state.db")
    }

    /// Database path after applying `storage.database_path`
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(Self::default_database_path)
    }

    /// Returns the log file path
    ///
    /// `$XDG_STATE_HOME/archweave/archweave.log` (~/.local/state/archweave/archweave.log)
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("archweave.log")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.generation.base_url, "http://localhost:8000");
        assert_eq!(config.generation.architecture_path, "/chat/ask/");
        assert_eq!(config.generation.issue_path, "/issues/chat");
        assert_eq!(config.generation.max_retries, 0);
        assert_eq!(config.storage.empty_store_policy, EmptyStorePolicy::Overwrite);
        assert_eq!(
            config.conversation.response_ordering,
            ResponseOrdering::ResolutionOrder
        );
        assert_eq!(config.conversation.title_max_chars, 50);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
[generation]
base_url = "https://arch.example.com"
auth_token = "tok_123"
timeout_secs = 10

[storage]
database_path = "/tmp/archweave-test.db"
empty_store_policy = "preserve"

[conversation]
response_ordering = "latest_only"
title_max_chars = 30

[logging]
level = "debug"
"#;
        let config: Config = toml::from_str(toml).unwrap();

        assert_eq!(config.generation.base_url, "https://arch.example.com");
        assert_eq!(config.generation.auth_token.as_deref(), Some("tok_123"));
        assert_eq!(config.generation.timeout_secs, 10);
        // Unset paths keep their defaults
        assert_eq!(config.generation.enhance_path, "/enhance");
        assert_eq!(
            config.database_path(),
            PathBuf::from("/tmp/archweave-test.db")
        );
        assert_eq!(config.storage.empty_store_policy, EmptyStorePolicy::Preserve);
        assert_eq!(
            config.conversation.response_ordering,
            ResponseOrdering::LatestOnly
        );
        assert_eq!(config.conversation.title_max_chars, 30);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_generation_config_validation() {
        assert!(GenerationConfig::default().validate().is_ok());

        let config = GenerationConfig {
            base_url: "  ".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = GenerationConfig {
            base_url: "ftp://example.com".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = GenerationConfig {
            timeout_secs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_rejects_bad_toml() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[generation\nbase_url = ").unwrap();
        assert!(matches!(Config::load_from(&path), Err(Error::Config(_))));
    }
}
