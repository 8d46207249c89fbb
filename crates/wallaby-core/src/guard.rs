//! Read-only guard for externally-managed tables
//!
//! Every write path in the storage layer passes through [`authorize`] before
//! it prepares a statement. Tables declared `Management::External` are
//! rejected unconditionally, for insert, update and delete alike.

use crate::errors::{ModelError, Result};
use crate::model::Record;
use crate::schema::{Management, TableDef};
use std::fmt;

/// Kind of write being attempted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mutation {
    Insert,
    Update,
    Delete,
}

impl Mutation {
    pub const ALL: [Mutation; 3] = [Mutation::Insert, Mutation::Update, Mutation::Delete];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mutation::Insert => "insert",
            Mutation::Update => "update",
            Mutation::Delete => "delete",
        }
    }
}

impl fmt::Display for Mutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decide whether `mutation` may be applied to `table`
///
/// # Errors
///
/// Returns `ModelError::WriteNotPermitted` for externally-managed tables.
pub fn authorize(table: &TableDef, mutation: Mutation) -> Result<()> {
    match table.management {
        Management::Application => Ok(()),
        Management::External => {
            tracing::warn!(
                component = module_path!(),
                table = table.name,
                mutation = mutation.as_str(),
                "write rejected on read-only table"
            );
            Err(ModelError::WriteNotPermitted {
                table: table.name.to_string(),
                mutation,
            })
        }
    }
}

/// Typed shorthand for [`authorize`] on a record's table
///
/// # Errors
///
/// Same as [`authorize`].
pub fn authorize_record<R: Record>(mutation: Mutation) -> Result<()> {
    authorize(R::TABLE, mutation)
}
