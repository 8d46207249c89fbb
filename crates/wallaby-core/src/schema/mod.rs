//! Declarative table descriptors
//!
//! Every record type points at a `TableDef` describing its physical table:
//! column names and types, nullability, length caps, foreign keys with their
//! delete policy, and composite uniqueness groups. The storage layer reads
//! these descriptors to build statements and tests compare them against the
//! migrated schema.

mod column;
mod table;

pub use column::{Column, ColumnType, OnDelete, Reference, MEASUREMENT};
pub use table::TableDef;

use crate::errors::{ModelError, Result};
use std::fmt;
use std::str::FromStr;

/// Logical schema (namespace) a table belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Schema {
    /// General schema holding application-owned tables
    Public,
    /// Schema populated by the upstream pipeline
    Wallaby,
}

impl Schema {
    pub fn as_str(&self) -> &'static str {
        match self {
            Schema::Public => "public",
            Schema::Wallaby => "wallaby",
        }
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Schema {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "public" => Ok(Schema::Public),
            "wallaby" => Ok(Schema::Wallaby),
            other => Err(ModelError::InvalidSetting {
                key: "search_path".to_string(),
                reason: format!("unknown schema '{}'", other),
            }),
        }
    }
}

/// Who owns the rows of a table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Management {
    /// Rows are created, changed and removed by this application
    Application,
    /// Rows are written by an external process; read-only here
    External,
}

/// Render a search path the way PostgreSQL spells it (`public,wallaby`)
pub fn render_search_path(search_path: &[Schema]) -> String {
    search_path
        .iter()
        .map(Schema::as_str)
        .collect::<Vec<_>>()
        .join(",")
}
