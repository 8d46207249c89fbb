//! wallaby core - declarative model layer
//!
//! This crate provides:
//! - Table descriptors for the bookstore and pipeline schemas
//! - Record types with their string conversions
//! - The read-only guard for externally-managed tables
//! - The error facility and structured logging facility

pub mod errors;
pub mod guard;
pub mod logging_facility;
pub mod model;
pub mod schema;

// Re-export commonly used types
pub use errors::{ExError, ExErrorKind, ModelError, Result};
pub use guard::{authorize, Mutation};
pub use model::{
    Book, Detection, Instance, Inventory, Record, Run, Sale, Shop, Sources, Store,
    StructuredDocument,
};
pub use schema::{Management, Schema, TableDef};
