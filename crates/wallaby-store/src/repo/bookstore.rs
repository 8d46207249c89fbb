//! Relation queries over the bookstore schema

#![allow(clippy::result_large_err)]

use crate::db::Database;
use crate::errors::{from_rusqlite, Result};
use crate::repo::SqliteRepo;
use wallaby_core::model::{Book, Inventory, Record, Sale};

/// Books listed by a shop
pub fn books_in_shop(db: &Database, shop_id: i32) -> Result<Vec<Book>> {
    SqliteRepo::filter(db, "shop_id", shop_id)
}

pub fn sales_for_book(db: &Database, book_id: i32) -> Result<Vec<Sale>> {
    SqliteRepo::filter(db, "book_id", book_id)
}

pub fn inventory_for_store(db: &Database, store_id: i32) -> Result<Vec<Inventory>> {
    SqliteRepo::filter(db, "store_id", store_id)
}

/// Total quantity of a book held at a store; zero when never stocked
pub fn stock_level(db: &Database, book_id: i32, store_id: i32) -> Result<i64> {
    let sql = format!(
        "SELECT COALESCE(SUM(\"quantity\"), 0) FROM {} WHERE \"book_id\" = ?1 AND \"store_id\" = ?2",
        db.qualify(Inventory::TABLE)?
    );
    db.conn()
        .query_row(&sql, [book_id, store_id], |row| row.get(0))
        .map_err(from_rusqlite)
}
