//! Repository layer for reading and writing records in SQLite
//!
//! Generic CRUD lives on [`SqliteRepo`]; `bookstore` and `pipeline` hold the
//! relation queries for each schema.

pub mod bookstore;
pub mod codec;
pub mod pipeline;
pub mod sqlite_repo;

pub use codec::SqlRecord;
pub use sqlite_repo::SqliteRepo;
