//! Opaque structured payloads (`parameters`, `sanity_thresholds`)
//!
//! The pipeline imposes no schema on these columns, so the only check made
//! here is that the text is well-formed JSON.

use crate::errors::{ModelError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A well-formed JSON document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StructuredDocument(serde_json::Value);

impl StructuredDocument {
    /// Parse and validate document text
    ///
    /// # Errors
    ///
    /// Returns `ModelError::InvalidDocument` when `text` is not well-formed JSON.
    pub fn parse(text: &str) -> Result<Self> {
        serde_json::from_str(text)
            .map(Self)
            .map_err(|e| ModelError::InvalidDocument {
                reason: e.to_string(),
            })
    }

    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }

    pub fn into_value(self) -> serde_json::Value {
        self.0
    }

    /// Canonical encoding used at the storage boundary: no whitespace and
    /// object keys sorted at every depth, so equal documents encode equally
    pub fn to_json_string(&self) -> String {
        sorted(&self.0).to_string()
    }

    /// Look up a top-level key of an object document
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key)
    }
}

fn sorted(value: &serde_json::Value) -> serde_json::Value {
    use serde_json::Value;
    match value {
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(key, v)| (key.clone(), sorted(v)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.iter().map(sorted).collect()),
        other => other.clone(),
    }
}

impl Default for StructuredDocument {
    fn default() -> Self {
        Self(serde_json::Value::Object(serde_json::Map::new()))
    }
}

impl From<serde_json::Value> for StructuredDocument {
    fn from(value: serde_json::Value) -> Self {
        Self(value)
    }
}

impl fmt::Display for StructuredDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
