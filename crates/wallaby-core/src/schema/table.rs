use super::{Column, Management, Schema};
use crate::errors::{ModelError, Result};

/// Physical table declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableDef {
    /// Model name used in string conversions (`Shop`, `Run`, ...)
    pub model: &'static str,
    /// Physical table name; must match the deployed schema exactly
    pub name: &'static str,
    pub schema: Schema,
    pub management: Management,
    /// Columns in storage order, identity first
    pub columns: &'static [Column],
    pub unique_together: &'static [&'static [&'static str]],
}

impl TableDef {
    /// Look up a declared column
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Look up a declared column, failing with `UnknownColumn`
    pub fn require_column(&self, name: &str) -> Result<&Column> {
        self.column(name).ok_or_else(|| ModelError::UnknownColumn {
            table: self.name.to_string(),
            column: name.to_string(),
        })
    }

    /// The surrogate identity column
    pub fn primary_key(&self) -> &'static str {
        self.columns
            .iter()
            .find(|c| c.primary_key)
            .map(|c| c.name)
            .unwrap_or("id")
    }

    /// Names of every column in storage order
    pub fn column_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.columns.iter().map(|c| c.name)
    }

    /// Columns written on insert/update (everything but the identity)
    pub fn value_columns(&self) -> impl Iterator<Item = &'static Column> + '_ {
        self.columns.iter().filter(|c| !c.primary_key)
    }

    pub fn is_read_only(&self) -> bool {
        self.management == Management::External
    }
}
