//! Database connection management
//!
//! A [`Database`] is one SQLite connection plus the schema search path of the
//! alias it was opened for. The `public` schema is the `main` database; every
//! other schema on the path is attached under its own name, so
//! `wallaby.run` resolves the same way it would on a server with
//! `search_path=wallaby`.

#![allow(clippy::result_large_err)]

use crate::errors::{from_rusqlite, io_error, Result};
use crate::settings::{DatabaseSettings, Engine};
use rusqlite::Connection;
use std::path::Path;
use std::time::Instant;
use wallaby_core::errors::ModelError;
use wallaby_core::schema::{render_search_path, Schema, TableDef};
use wallaby_core::{log_op_end, log_op_error, log_op_start};

const IN_MEMORY: &str = ":memory:";

/// An open connection scoped to a schema search path
#[derive(Debug)]
pub struct Database {
    conn: Connection,
    search_path: Vec<Schema>,
    label: String,
}

/// Open the database described by one alias's settings
///
/// # Errors
///
/// Returns `UnsupportedEngine` for server engines, `Io` when the database
/// directory cannot be created and `Persistence` when SQLite refuses to open
/// or attach a file.
pub fn connect(settings: &DatabaseSettings) -> Result<Database> {
    log_op_start!("db_connect", alias = settings.alias.as_str());
    let start = Instant::now();

    let db = connect_impl(settings).map_err(|e| {
        log_op_error!(
            "db_connect",
            e.clone(),
            duration_ms = start.elapsed().as_millis() as u64,
            alias = settings.alias.as_str()
        );
        e
    })?;

    log_op_end!(
        "db_connect",
        duration_ms = start.elapsed().as_millis() as u64,
        alias = settings.alias.as_str(),
        search_path = %render_search_path(&db.search_path)
    );
    Ok(db)
}

fn connect_impl(settings: &DatabaseSettings) -> Result<Database> {
    if settings.engine != Engine::Sqlite {
        return Err(ModelError::UnsupportedEngine {
            engine: settings.engine.to_string(),
        }
        .into());
    }

    let main_location = settings.schema_location(Schema::Public);
    if main_location != IN_MEMORY {
        if let Some(parent) = Path::new(&main_location).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| io_error("db_connect", e))?;
            }
        }
    }

    let conn = if main_location == IN_MEMORY {
        Connection::open_in_memory()
    } else {
        Connection::open(&main_location)
    }
    .map_err(from_rusqlite)?;

    let mut db = Database {
        conn,
        search_path: settings.search_path.clone(),
        label: settings.alias.as_str().to_string(),
    };
    for schema in settings.search_path.clone() {
        if schema != Schema::Public {
            db.attach(schema, &settings.schema_location(schema))?;
        }
    }
    configure(&db)?;
    Ok(db)
}

/// Open a private in-memory database with the given search path (for testing)
///
/// # Errors
///
/// Fails only if SQLite cannot allocate the databases.
pub fn open_in_memory(search_path: &[Schema]) -> Result<Database> {
    let conn = Connection::open_in_memory().map_err(from_rusqlite)?;
    let mut db = Database {
        conn,
        search_path: search_path.to_vec(),
        label: IN_MEMORY.to_string(),
    };
    for schema in search_path {
        if *schema != Schema::Public {
            db.attach(*schema, IN_MEMORY)?;
        }
    }
    configure(&db)?;
    Ok(db)
}

/// Configure a connection's pragmas
///
/// Foreign keys are always enforced. File databases switch to WAL; memory
/// databases ignore the request and stay in `memory` mode.
pub fn configure(db: &Database) -> Result<()> {
    db.conn
        .execute("PRAGMA foreign_keys = ON", [])
        .map_err(from_rusqlite)?;

    for name in db.physical_names() {
        let pragma = format!("PRAGMA \"{}\".journal_mode = WAL", name);
        let _mode: String = db
            .conn
            .query_row(&pragma, [], |row| row.get(0))
            .map_err(from_rusqlite)?;
    }

    Ok(())
}

/// SQLite database name backing a schema
pub fn physical_name(schema: Schema) -> &'static str {
    match schema {
        Schema::Public => "main",
        other => other.as_str(),
    }
}

impl Database {
    fn attach(&mut self, schema: Schema, location: &str) -> Result<()> {
        self.conn
            .execute(
                &format!("ATTACH DATABASE ?1 AS \"{}\"", physical_name(schema)),
                [location],
            )
            .map_err(from_rusqlite)?;
        Ok(())
    }

    fn physical_names(&self) -> Vec<&'static str> {
        let mut names = vec!["main"];
        names.extend(
            self.search_path
                .iter()
                .filter(|s| **s != Schema::Public)
                .map(|s| physical_name(*s)),
        );
        names
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    pub fn conn_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }

    pub fn search_path(&self) -> &[Schema] {
        &self.search_path
    }

    /// Alias name, or `:memory:` for test databases
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Whether tables in `schema` resolve through this connection
    pub fn sees(&self, schema: Schema) -> bool {
        self.search_path.contains(&schema)
    }

    /// Fully qualified, quoted name of a table (`"wallaby"."run"`)
    ///
    /// # Errors
    ///
    /// Returns `SchemaNotVisible` when the table's schema is not on this
    /// connection's search path.
    pub fn qualify(&self, table: &TableDef) -> Result<String> {
        if !self.sees(table.schema) {
            return Err(ModelError::SchemaNotVisible {
                table: table.name.to_string(),
                schema: table.schema.to_string(),
                search_path: render_search_path(&self.search_path),
            }
            .into());
        }
        Ok(format!(
            "\"{}\".\"{}\"",
            physical_name(table.schema),
            table.name
        ))
    }
}
