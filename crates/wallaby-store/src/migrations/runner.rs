//! Migration runner
//!
//! Applies migrations with checksums, schema visibility checks, and idempotency

#![allow(clippy::result_large_err)]

use crate::db::Database;
use crate::errors::{checksum_mismatch, from_rusqlite, migration_error, Result};
use crate::migrations::checksums::compute_checksum;
use crate::migrations::embedded::{get_migrations, Migration};
use rusqlite::{Connection, OptionalExtension};
use std::time::Instant;
use wallaby_core::{log_op_end, log_op_error, log_op_start};

/// What one call to [`apply_migrations`] did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MigrationReport {
    /// Newly applied in this call
    pub applied: Vec<&'static str>,
    /// Schema not on the search path
    pub skipped: Vec<&'static str>,
}

/// Apply all pending migrations visible through this database's search path
///
/// # Errors
///
/// Fails with `ConstraintViolation` when an applied migration's recorded
/// checksum no longer matches the embedded SQL, and with `Persistence` when a
/// migration's SQL fails. A failed migration leaves no partial objects behind.
pub fn apply_migrations(db: &mut Database) -> Result<MigrationReport> {
    let alias = db.label().to_string();
    log_op_start!("apply_migrations", alias = &alias);
    let start = Instant::now();

    let report = apply_migrations_impl(db).map_err(|e| {
        log_op_error!(
            "apply_migrations",
            e.clone(),
            duration_ms = start.elapsed().as_millis() as u64,
            alias = &alias
        );
        e
    })?;

    log_op_end!(
        "apply_migrations",
        duration_ms = start.elapsed().as_millis() as u64,
        alias = &alias,
        applied = report.applied.len() as u64,
        skipped = report.skipped.len() as u64
    );
    Ok(report)
}

fn apply_migrations_impl(db: &mut Database) -> Result<MigrationReport> {
    create_schema_version_table(db.conn())?;

    let mut report = MigrationReport::default();
    for migration in get_migrations() {
        if !db.sees(migration.schema) {
            tracing::debug!(
                migration_id = migration.id,
                schema = migration.schema.as_str(),
                "schema not on search path, skipping migration"
            );
            report.skipped.push(migration.id);
            continue;
        }
        if apply_migration(db.conn_mut(), &migration)? {
            report.applied.push(migration.id);
        }
    }
    Ok(report)
}

/// Ids of every recorded migration, in application order
///
/// # Errors
///
/// Fails if `schema_version` cannot be read.
pub fn applied_migrations(db: &Database) -> Result<Vec<String>> {
    create_schema_version_table(db.conn())?;
    let mut stmt = db
        .conn()
        .prepare("SELECT migration_id FROM main.schema_version ORDER BY id")
        .map_err(from_rusqlite)?;
    let ids = stmt
        .query_map([], |row| row.get(0))
        .map_err(from_rusqlite)?
        .collect::<std::result::Result<Vec<String>, _>>()
        .map_err(from_rusqlite)?;
    Ok(ids)
}

/// Create the schema_version table if it doesn't exist
fn create_schema_version_table(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS main.schema_version (
            id INTEGER PRIMARY KEY,
            migration_id TEXT NOT NULL UNIQUE,
            applied_at INTEGER NOT NULL,
            checksum TEXT NOT NULL
        )",
        [],
    )
    .map_err(from_rusqlite)?;

    Ok(())
}

/// Apply a single migration unless already recorded
///
/// Returns whether the migration ran.
fn apply_migration(conn: &mut Connection, migration: &Migration) -> Result<bool> {
    let checksum = compute_checksum(migration.sql);

    let recorded: Option<String> = conn
        .query_row(
            "SELECT checksum FROM main.schema_version WHERE migration_id = ?1",
            [migration.id],
            |row| row.get(0),
        )
        .optional()
        .map_err(from_rusqlite)?;

    if let Some(recorded) = recorded {
        if recorded != checksum {
            return Err(checksum_mismatch(migration.id, &recorded, &checksum));
        }
        return Ok(false);
    }

    let tx = conn.transaction().map_err(from_rusqlite)?;

    tx.execute_batch(migration.sql)
        .map_err(|e| migration_error(migration.id, &e.to_string()))?;

    let now = chrono::Utc::now().timestamp();
    tx.execute(
        "INSERT INTO main.schema_version (migration_id, applied_at, checksum) VALUES (?1, ?2, ?3)",
        rusqlite::params![migration.id, now, checksum],
    )
    .map_err(from_rusqlite)?;

    tx.commit().map_err(from_rusqlite)?;

    tracing::info!(migration_id = migration.id, "migration applied");
    Ok(true)
}
