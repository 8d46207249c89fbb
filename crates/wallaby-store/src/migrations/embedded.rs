//! Embedded SQL migrations
//!
//! Migrations are embedded at compile time using include_str!

use wallaby_core::schema::Schema;

/// Migration metadata
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    pub id: &'static str,
    /// Schema the migration creates objects in
    pub schema: Schema,
    pub sql: &'static str,
}

/// Get all embedded migrations in order
pub fn get_migrations() -> Vec<Migration> {
    vec![
        Migration {
            id: "001_bookstore",
            schema: Schema::Public,
            sql: include_str!("../../migrations/001_bookstore.sql"),
        },
        Migration {
            id: "002_pipeline",
            schema: Schema::Wallaby,
            sql: include_str!("../../migrations/002_pipeline.sql"),
        },
    ]
}
