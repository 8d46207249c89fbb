use crate::guard::Mutation;
use thiserror::Error;

/// Result type alias using ModelError
pub type Result<T> = std::result::Result<T, ModelError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Each kind maps to a stable error code that callers and tests can match on
/// without parsing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExErrorKind {
    // Structural/Validation
    InvalidInput,
    NotFound,
    ConstraintViolation,
    InvalidDocument,

    // Access
    /// Mutation attempted against an externally-managed table
    WriteNotPermitted,
    /// Table lives in a schema the connection's search path does not include
    SchemaNotVisible,

    // Configuration
    MissingSetting,
    InvalidSetting,
    UnsupportedEngine,

    // Integration/IO
    Io,
    Serialization,
    Persistence,

    // Internal
    Internal,
}

impl ExErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            ExErrorKind::InvalidInput => "ERR_INVALID_INPUT",
            ExErrorKind::NotFound => "ERR_NOT_FOUND",
            ExErrorKind::ConstraintViolation => "ERR_CONSTRAINT_VIOLATION",
            ExErrorKind::InvalidDocument => "ERR_INVALID_DOCUMENT",
            ExErrorKind::WriteNotPermitted => "ERR_WRITE_NOT_PERMITTED",
            ExErrorKind::SchemaNotVisible => "ERR_SCHEMA_NOT_VISIBLE",
            ExErrorKind::MissingSetting => "ERR_MISSING_SETTING",
            ExErrorKind::InvalidSetting => "ERR_INVALID_SETTING",
            ExErrorKind::UnsupportedEngine => "ERR_UNSUPPORTED_ENGINE",
            ExErrorKind::Io => "ERR_IO",
            ExErrorKind::Serialization => "ERR_SERIALIZATION",
            ExErrorKind::Persistence => "ERR_PERSISTENCE",
            ExErrorKind::Internal => "ERR_INTERNAL",
        }
    }
}

/// Canonical structured error type
///
/// Carries a classification kind plus the operation, table and row the
/// failure relates to.
#[derive(Debug, Clone)]
pub struct ExError {
    kind: ExErrorKind,
    op: Option<String>,
    table: Option<String>,
    entity_id: Option<String>,
    message: String,
}

impl ExError {
    /// Create a new error with the specified kind
    pub fn new(kind: ExErrorKind) -> Self {
        Self {
            kind,
            op: None,
            table: None,
            entity_id: None,
            message: String::new(),
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add table context
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    /// Add row identifier context
    pub fn with_entity_id(mut self, id: impl Into<String>) -> Self {
        self.entity_id = Some(id.into());
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Get the error kind
    pub fn kind(&self) -> ExErrorKind {
        self.kind
    }

    /// Get the stable error code
    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Get the operation context, if any
    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    /// Get the table context, if any
    pub fn table(&self) -> Option<&str> {
        self.table.as_deref()
    }

    /// Get the row identifier context, if any
    pub fn entity_id(&self) -> Option<&str> {
        self.entity_id.as_deref()
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for ExError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(table) = &self.table {
            write!(f, " (table: {})", table)?;
        }
        if let Some(entity_id) = &self.entity_id {
            write!(f, " (entity_id: {})", entity_id)?;
        }
        Ok(())
    }
}

impl std::error::Error for ExError {}

// ========== End Error Facility ==========

/// Domain errors raised by the model layer
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    /// Mutation attempted against an externally-managed table
    #[error("This table is read only. ({mutation} on {table})")]
    WriteNotPermitted { table: String, mutation: Mutation },

    /// Required setting absent from the environment
    #[error("Required setting {key} is not set")]
    MissingSetting { key: String },

    /// Setting present but unusable
    #[error("Invalid value for {key}: {reason}")]
    InvalidSetting { key: String, reason: String },

    /// Engine recognised by settings but not compiled into this build
    #[error("Database engine '{engine}' is not supported by this build")]
    UnsupportedEngine { engine: String },

    /// Table requested through an alias whose search path excludes its schema
    #[error("Table {table} lives in schema '{schema}' which is not on search path [{search_path}]")]
    SchemaNotVisible {
        table: String,
        schema: String,
        search_path: String,
    },

    /// Structured payload is not well-formed
    #[error("Invalid structured document: {reason}")]
    InvalidDocument { reason: String },

    /// Column name not declared on the table
    #[error("Unknown column {column} on table {table}")]
    UnknownColumn { table: String, column: String },

    /// No row with the given identity
    #[error("No row with id {id} in table {table}")]
    RecordNotFound { table: String, id: i64 },

    /// Operation needs a persisted record but the identity is unset
    #[error("Record in table {table} has no primary key")]
    MissingPrimaryKey { table: String },
}

impl From<ModelError> for ExError {
    fn from(err: ModelError) -> Self {
        let message = err.to_string();
        match err {
            ModelError::WriteNotPermitted { table, mutation } => {
                ExError::new(ExErrorKind::WriteNotPermitted)
                    .with_op(mutation.as_str())
                    .with_table(table)
                    .with_message(message)
            }
            ModelError::MissingSetting { key } => ExError::new(ExErrorKind::MissingSetting)
                .with_entity_id(key)
                .with_message(message),
            ModelError::InvalidSetting { key, .. } => ExError::new(ExErrorKind::InvalidSetting)
                .with_entity_id(key)
                .with_message(message),
            ModelError::UnsupportedEngine { .. } => {
                ExError::new(ExErrorKind::UnsupportedEngine).with_message(message)
            }
            ModelError::SchemaNotVisible { table, .. } => {
                ExError::new(ExErrorKind::SchemaNotVisible)
                    .with_table(table)
                    .with_message(message)
            }
            ModelError::InvalidDocument { .. } => {
                ExError::new(ExErrorKind::InvalidDocument).with_message(message)
            }
            ModelError::UnknownColumn { table, .. } => ExError::new(ExErrorKind::InvalidInput)
                .with_table(table)
                .with_message(message),
            ModelError::RecordNotFound { table, id } => ExError::new(ExErrorKind::NotFound)
                .with_table(table)
                .with_entity_id(id.to_string())
                .with_message(message),
            ModelError::MissingPrimaryKey { table } => ExError::new(ExErrorKind::InvalidInput)
                .with_table(table)
                .with_message(message),
        }
    }
}

impl From<serde_json::Error> for ModelError {
    fn from(err: serde_json::Error) -> Self {
        ModelError::InvalidDocument {
            reason: err.to_string(),
        }
    }
}
