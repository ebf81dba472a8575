//! # archweave-core
//!
//! Session, context and thread state for a two-stage architecture design
//! assistant.
//!
//! This library provides:
//! - Domain types for projects, messages, issue threads and context snapshots
//! - A SQLite-backed document store for durable state
//! - Stores for projects, conversation logs and context snapshots
//! - A message composer that talks to the generation service and never stalls
//! - Configuration management and logging infrastructure
//!
//! ## Architecture
//!
//! Each project has two stages:
//! - **Architecture log:** one conversation that iterates on the design
//! - **Issue threads:** independent follow-up conversations, each grounded in
//!   the latest architecture exchange through a context snapshot
//!
//! ## Example
//!
//! ```rust,no_run
//! use archweave_core::{Config, Workspace};
//!
//! # async fn run() -> archweave_core::Result<()> {
//! let config = Config::load()?;
//! let ws = Workspace::open(&config)?;
//!
//! let project = ws.projects().create("Checkout")?;
//! ws.composer()
//!     .send_architecture(&project.id, "design a checkout service")
//!     .await?;
//! # Ok(())
//! # }
//! ```

// Re-export commonly used items at the crate root
pub use composer::{MessageComposer, SendOutcome};
pub use config::Config;
pub use error::{Error, Result};
pub use generation::{Generator, HttpGenerator};
pub use persistence::PersistenceLayer;
pub use store::{ContextBridge, ConversationStore, ProjectStore};
pub use types::*;
pub use workspace::Workspace;

// Public modules
pub mod composer;
pub mod config;
pub mod content;
pub mod db;
pub mod error;
pub mod fallback;
pub mod generation;
pub mod logging;
pub mod persistence;
pub mod store;
pub mod types;
pub mod workspace;
