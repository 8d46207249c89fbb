//! Migration framework
//!
//! Provides:
//! - Migration runner with checksums and per-schema skipping
//! - Idempotent application
//! - Embedded SQL migrations

mod checksums;
mod embedded;
mod runner;

pub use checksums::compute_checksum;
pub use embedded::{get_migrations, Migration};
pub use runner::{apply_migrations, applied_migrations, MigrationReport};
