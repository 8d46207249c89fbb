//! Bookstore sample schema (application-managed)

use super::{object_label, Record};
use crate::schema::{Column, ColumnType, Management, OnDelete, Schema, TableDef};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const SHOPS: TableDef = TableDef {
    model: "Shop",
    name: "shops",
    schema: Schema::Public,
    management: Management::Application,
    columns: &[
        Column::identity("id", ColumnType::Integer),
        Column::new("name", ColumnType::Text).max_length(100),
        Column::new("address", ColumnType::Text),
        Column::new("state", ColumnType::Text).max_length(10),
        Column::new("contact_email", ColumnType::Text).max_length(254),
        Column::new("contact_number", ColumnType::Text).max_length(20),
    ],
    unique_together: &[],
};

pub const STORES: TableDef = TableDef {
    model: "Store",
    name: "stores_store",
    schema: Schema::Public,
    management: Management::Application,
    columns: &[
        Column::identity("id", ColumnType::Integer),
        Column::new("name", ColumnType::Text).max_length(100),
        Column::new("address", ColumnType::Text),
    ],
    unique_together: &[],
};

pub const BOOKS: TableDef = TableDef {
    model: "Book",
    name: "books",
    schema: Schema::Public,
    management: Management::Application,
    columns: &[
        Column::identity("id", ColumnType::Integer),
        Column::new("title", ColumnType::Text).max_length(100),
        Column::new("author", ColumnType::Text).max_length(200),
        Column::new("price", ColumnType::Float),
        Column::foreign_key("shop_id", ColumnType::Integer, "shops", OnDelete::SetNull).nullable(),
    ],
    unique_together: &[],
};

pub const SALES: TableDef = TableDef {
    model: "Sale",
    name: "sales_sale",
    schema: Schema::Public,
    management: Management::Application,
    columns: &[
        Column::identity("id", ColumnType::Integer),
        Column::foreign_key("book_id", ColumnType::Integer, "books", OnDelete::NoAction),
        Column::foreign_key(
            "store_id",
            ColumnType::Integer,
            "stores_store",
            OnDelete::NoAction,
        ),
        Column::new("sold_at", ColumnType::Timestamp).auto_now(),
    ],
    unique_together: &[],
};

pub const INVENTORY: TableDef = TableDef {
    model: "Inventory",
    name: "inventory_inventory",
    schema: Schema::Public,
    management: Management::Application,
    columns: &[
        Column::identity("id", ColumnType::Integer),
        Column::foreign_key("book_id", ColumnType::Integer, "books", OnDelete::NoAction),
        Column::foreign_key(
            "store_id",
            ColumnType::Integer,
            "stores_store",
            OnDelete::NoAction,
        ),
        Column::new("quantity", ColumnType::Integer),
    ],
    unique_together: &[],
};

/// A retail shop with contact details
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shop {
    pub id: Option<i32>,
    pub name: String,
    pub address: String,
    /// Short state code
    pub state: String,
    pub contact_email: String,
    pub contact_number: String,
}

impl Shop {
    pub fn new(
        name: impl Into<String>,
        address: impl Into<String>,
        state: impl Into<String>,
        contact_email: impl Into<String>,
        contact_number: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            name: name.into(),
            address: address.into(),
            state: state.into(),
            contact_email: contact_email.into(),
            contact_number: contact_number.into(),
        }
    }
}

impl Record for Shop {
    const TABLE: &'static TableDef = &SHOPS;

    fn id(&self) -> Option<i64> {
        self.id.map(i64::from)
    }
}

impl fmt::Display for Shop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&object_label(Self::TABLE, self.id()))
    }
}

/// A store location that sells and stocks books
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Store {
    pub id: Option<i32>,
    pub name: String,
    pub address: String,
}

impl Store {
    pub fn new(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            address: address.into(),
        }
    }
}

impl Record for Store {
    const TABLE: &'static TableDef = &STORES;

    fn id(&self) -> Option<i64> {
        self.id.map(i64::from)
    }
}

impl fmt::Display for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&object_label(Self::TABLE, self.id()))
    }
}

/// A book, optionally listed by a shop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
    pub id: Option<i32>,
    pub title: String,
    pub author: String,
    pub price: f64,
    /// Cleared by the storage layer when the shop is deleted
    pub shop_id: Option<i32>,
}

impl Book {
    pub fn new(title: impl Into<String>, author: impl Into<String>, price: f64) -> Self {
        Self {
            id: None,
            title: title.into(),
            author: author.into(),
            price,
            shop_id: None,
        }
    }

    pub fn in_shop(mut self, shop_id: i32) -> Self {
        self.shop_id = Some(shop_id);
        self
    }
}

impl Record for Book {
    const TABLE: &'static TableDef = &BOOKS;

    fn id(&self) -> Option<i64> {
        self.id.map(i64::from)
    }
}

impl fmt::Display for Book {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&object_label(Self::TABLE, self.id()))
    }
}

/// A single book sold at a store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sale {
    pub id: Option<i32>,
    pub book_id: i32,
    pub store_id: i32,
    /// Refreshed on every save
    pub sold_at: DateTime<Utc>,
}

impl Sale {
    pub fn new(book_id: i32, store_id: i32) -> Self {
        Self {
            id: None,
            book_id,
            store_id,
            sold_at: Utc::now(),
        }
    }

    /// Stamp `sold_at`; called by the storage layer before each save
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.sold_at = now;
    }
}

impl Record for Sale {
    const TABLE: &'static TableDef = &SALES;

    fn id(&self) -> Option<i64> {
        self.id.map(i64::from)
    }
}

impl fmt::Display for Sale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&object_label(Self::TABLE, self.id()))
    }
}

/// Stock level of a book at a store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inventory {
    pub id: Option<i32>,
    pub book_id: i32,
    pub store_id: i32,
    pub quantity: i32,
}

impl Inventory {
    pub fn new(book_id: i32, store_id: i32, quantity: i32) -> Self {
        Self {
            id: None,
            book_id,
            store_id,
            quantity,
        }
    }
}

impl Record for Inventory {
    const TABLE: &'static TableDef = &INVENTORY;

    fn id(&self) -> Option<i64> {
        self.id.map(i64::from)
    }
}

impl fmt::Display for Inventory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&object_label(Self::TABLE, self.id()))
    }
}
