//! wallaby store - SQLite persistence
//!
//! This crate provides:
//! - Environment settings for the `default` and `wallaby` aliases
//! - Connections scoped to an alias's schema search path
//! - Embedded, checksummed schema migrations
//! - A generic record repository guarded against writes to pipeline tables

pub mod db;
pub mod errors;
pub mod migrations;
pub mod repo;
pub mod settings;

// Re-export commonly used types
pub use db::{connect, open_in_memory, Database};
pub use errors::Result;
pub use migrations::apply_migrations;
pub use repo::{SqlRecord, SqliteRepo};
pub use settings::{DatabaseAlias, DatabaseSettings, Engine, Settings};
