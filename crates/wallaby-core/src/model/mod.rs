//! Record types for the bookstore and pipeline schemas

pub mod bookstore;
pub mod document;
pub mod pipeline;

pub use bookstore::{Book, Inventory, Sale, Shop, Store};
pub use document::StructuredDocument;
pub use pipeline::{Detection, Instance, Run, Sources};

use crate::schema::TableDef;

/// A row type backed by a declared table
pub trait Record: Sized {
    /// Table this record is stored in
    const TABLE: &'static TableDef;

    /// Surrogate identity; `None` until the row exists in storage
    fn id(&self) -> Option<i64>;
}

/// Every declared table, bookstore first, in dependency order
pub const ALL_TABLES: &[&TableDef] = &[
    Shop::TABLE,
    Store::TABLE,
    Book::TABLE,
    Sale::TABLE,
    Inventory::TABLE,
    Run::TABLE,
    Instance::TABLE,
    Detection::TABLE,
    Sources::TABLE,
];

/// Default string form for records without a natural label
pub(crate) fn object_label(table: &TableDef, id: Option<i64>) -> String {
    match id {
        Some(id) => format!("{} object ({})", table.model, id),
        None => format!("{} object (None)", table.model),
    }
}
