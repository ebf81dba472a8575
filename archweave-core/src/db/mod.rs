//! Database layer for archweave
//!
//! This module provides the durable storage underneath the persistence layer:
//! - Schema migrations
//! - A key → JSON blob table, one row per persisted document

pub mod repo;
pub mod schema;

pub use repo::Database;
