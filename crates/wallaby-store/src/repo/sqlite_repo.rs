//! SQLite repository implementation
//!
//! Generic reads and writes over any [`SqlRecord`]. Every write passes
//! through [`wallaby_core::guard::authorize`] before a statement is prepared,
//! so externally-managed tables are never touched.

#![allow(clippy::result_large_err)]

use crate::db::Database;
use crate::errors::{from_rusqlite, Result};
use crate::repo::codec::SqlRecord;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, OptionalExtension, Params};
use std::time::Instant;
use wallaby_core::errors::ModelError;
use wallaby_core::guard::{authorize, Mutation};
use wallaby_core::{log_op_end, log_op_error, log_op_start};

/// SQLite repository for every declared record type
pub struct SqliteRepo;

impl SqliteRepo {
    /// Get a record by identity
    pub fn get<R: SqlRecord>(db: &Database, id: i64) -> Result<Option<R>> {
        let table = R::TABLE;
        let sql = format!(
            "SELECT {} FROM {} WHERE \"{}\" = ?1",
            select_list::<R>(),
            db.qualify(table)?,
            table.primary_key()
        );
        let mut stmt = db.conn().prepare(&sql).map_err(from_rusqlite)?;
        let result = stmt
            .query_row([id], |row| R::from_row(row))
            .optional()
            .map_err(from_rusqlite)?;
        Ok(result)
    }

    /// Get a record by identity, failing with `NotFound` when absent
    pub fn fetch<R: SqlRecord>(db: &Database, id: i64) -> Result<R> {
        Self::get(db, id)?.ok_or_else(|| {
            ModelError::RecordNotFound {
                table: R::TABLE.name.to_string(),
                id,
            }
            .into()
        })
    }

    /// Every row, ordered by identity
    pub fn all<R: SqlRecord>(db: &Database) -> Result<Vec<R>> {
        Self::query_where(db, "1 = 1", [])
    }

    /// Rows whose `column` equals `value`; `Value::Null` matches NULL
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` when `column` is not declared on the table.
    pub fn filter<R: SqlRecord>(
        db: &Database,
        column: &str,
        value: impl Into<Value>,
    ) -> Result<Vec<R>> {
        let column = R::TABLE.require_column(column)?;
        match value.into() {
            Value::Null => Self::query_where(db, &format!("\"{}\" IS NULL", column.name), []),
            value => Self::query_where(db, &format!("\"{}\" = ?1", column.name), [value]),
        }
    }

    pub fn count<R: SqlRecord>(db: &Database) -> Result<i64> {
        let sql = format!("SELECT COUNT(*) FROM {}", db.qualify(R::TABLE)?);
        db.conn()
            .query_row(&sql, [], |row| row.get(0))
            .map_err(from_rusqlite)
    }

    /// Rows matching a raw `WHERE` clause over quoted column names
    pub(crate) fn query_where<R: SqlRecord, P: Params>(
        db: &Database,
        clause: &str,
        params: P,
    ) -> Result<Vec<R>> {
        let table = R::TABLE;
        let sql = format!(
            "SELECT {} FROM {} WHERE {} ORDER BY \"{}\"",
            select_list::<R>(),
            db.qualify(table)?,
            clause,
            table.primary_key()
        );
        let mut stmt = db.conn().prepare(&sql).map_err(from_rusqlite)?;
        let rows = stmt
            .query_map(params, |row| R::from_row(row))
            .map_err(from_rusqlite)?
            .collect::<std::result::Result<Vec<R>, _>>()
            .map_err(from_rusqlite)?;
        Ok(rows)
    }

    /// Insert a new record or update an existing one
    ///
    /// A record without an identity is inserted and receives the assigned id.
    /// On failure the record is left exactly as it was passed in, and no row
    /// is written.
    ///
    /// # Errors
    ///
    /// Returns `WriteNotPermitted` for externally-managed tables,
    /// `NotFound` when updating a row that no longer exists and
    /// `ConstraintViolation` when the engine rejects the row.
    pub fn save<R: SqlRecord>(db: &Database, record: &mut R) -> Result<()> {
        let table = R::TABLE.name;
        let mutation = if record.id().is_some() {
            Mutation::Update
        } else {
            Mutation::Insert
        };
        log_op_start!("repo_save", table = table, mutation = mutation.as_str());
        let start = Instant::now();

        Self::save_impl(db, record, mutation).map_err(|e| {
            log_op_error!(
                "repo_save",
                e.clone(),
                duration_ms = start.elapsed().as_millis() as u64,
                table = table
            );
            e
        })?;

        log_op_end!(
            "repo_save",
            duration_ms = start.elapsed().as_millis() as u64,
            table = table,
            row_id = record.id().unwrap_or_default()
        );
        Ok(())
    }

    fn save_impl<R: SqlRecord>(db: &Database, record: &mut R, mutation: Mutation) -> Result<()> {
        let table = R::TABLE;
        authorize(table, mutation)?;
        let qualified = db.qualify(table)?;

        let mut staged = record.clone();
        staged.before_save();
        within_savepoint(db, "repo_save", || Self::write(db, &qualified, &mut staged))?;
        *record = staged;
        Ok(())
    }

    /// INSERT or UPDATE `record`, assigning the new id on insert
    fn write<R: SqlRecord>(db: &Database, qualified: &str, record: &mut R) -> Result<()> {
        let table = R::TABLE;
        let columns: Vec<&str> = table.value_columns().map(|c| c.name).collect();
        let mut values = record.to_values();

        match record.id() {
            None => {
                let sql = format!(
                    "INSERT INTO {} ({}) VALUES ({})",
                    qualified,
                    quoted(&columns).join(", "),
                    placeholders(columns.len())
                );
                db.conn()
                    .execute(&sql, params_from_iter(values))
                    .map_err(from_rusqlite)?;
                record.assign_id(db.conn().last_insert_rowid())?;
            }
            Some(id) => {
                let assignments: Vec<String> = columns
                    .iter()
                    .enumerate()
                    .map(|(i, c)| format!("\"{}\" = ?{}", c, i + 1))
                    .collect();
                let sql = format!(
                    "UPDATE {} SET {} WHERE \"{}\" = ?{}",
                    qualified,
                    assignments.join(", "),
                    table.primary_key(),
                    columns.len() + 1
                );
                values.push(Value::Integer(id));
                let changed = db
                    .conn()
                    .execute(&sql, params_from_iter(values))
                    .map_err(from_rusqlite)?;
                if changed == 0 {
                    return Err(ModelError::RecordNotFound {
                        table: table.name.to_string(),
                        id,
                    }
                    .into());
                }
            }
        }
        Ok(())
    }

    /// Delete a persisted record
    ///
    /// # Errors
    ///
    /// Returns `WriteNotPermitted` for externally-managed tables and
    /// `InvalidInput` when the record was never saved.
    pub fn delete<R: SqlRecord>(db: &Database, record: &R) -> Result<()> {
        match record.id() {
            Some(id) => Self::delete_by_id::<R>(db, id),
            None => {
                authorize(R::TABLE, Mutation::Delete)?;
                Err(ModelError::MissingPrimaryKey {
                    table: R::TABLE.name.to_string(),
                }
                .into())
            }
        }
    }

    /// Delete a row by identity
    ///
    /// # Errors
    ///
    /// Returns `WriteNotPermitted` for externally-managed tables, `NotFound`
    /// when no row has this id and `ConstraintViolation` when dependents
    /// still reference the row.
    pub fn delete_by_id<R: SqlRecord>(db: &Database, id: i64) -> Result<()> {
        let table = R::TABLE.name;
        log_op_start!("repo_delete", table = table, row_id = id);
        let start = Instant::now();

        Self::delete_impl::<R>(db, id).map_err(|e| {
            log_op_error!(
                "repo_delete",
                e.clone(),
                duration_ms = start.elapsed().as_millis() as u64,
                table = table
            );
            e
        })?;

        log_op_end!(
            "repo_delete",
            duration_ms = start.elapsed().as_millis() as u64,
            table = table,
            row_id = id
        );
        Ok(())
    }

    fn delete_impl<R: SqlRecord>(db: &Database, id: i64) -> Result<()> {
        let table = R::TABLE;
        authorize(table, Mutation::Delete)?;
        let sql = format!(
            "DELETE FROM {} WHERE \"{}\" = ?1",
            db.qualify(table)?,
            table.primary_key()
        );
        let changed = db.conn().execute(&sql, [id]).map_err(from_rusqlite)?;
        if changed == 0 {
            return Err(ModelError::RecordNotFound {
                table: table.name.to_string(),
                id,
            }
            .into());
        }
        Ok(())
    }
}

/// Run `body` inside a named savepoint, undoing its writes when it fails.
/// Nests inside any transaction the caller already holds.
fn within_savepoint<T>(
    db: &Database,
    name: &str,
    body: impl FnOnce() -> Result<T>,
) -> Result<T> {
    let conn = db.conn();
    conn.execute_batch(&format!("SAVEPOINT {}", name))
        .map_err(from_rusqlite)?;
    match body() {
        Ok(value) => {
            conn.execute_batch(&format!("RELEASE {}", name))
                .map_err(from_rusqlite)?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback) =
                conn.execute_batch(&format!("ROLLBACK TO {name}; RELEASE {name}", name = name))
            {
                tracing::warn!(savepoint = name, error = %rollback, "savepoint rollback failed");
            }
            Err(err)
        }
    }
}

fn select_list<R: SqlRecord>() -> String {
    let names: Vec<&str> = R::TABLE.column_names().collect();
    quoted(&names).join(", ")
}

fn quoted(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| format!("\"{}\"", n)).collect()
}

fn placeholders(n: usize) -> String {
    (1..=n)
        .map(|i| format!("?{}", i))
        .collect::<Vec<_>>()
        .join(", ")
}
