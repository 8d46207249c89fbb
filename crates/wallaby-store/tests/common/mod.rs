// Shared fixtures for store integration tests
#![allow(dead_code)]

use bigdecimal::BigDecimal;
use chrono::{TimeZone, Utc};
use rusqlite::params_from_iter;
use std::str::FromStr;
use wallaby_core::model::{Detection, Instance, Run, Sources, StructuredDocument};
use wallaby_store::db::{open_in_memory, Database};
use wallaby_store::migrations::apply_migrations;
use wallaby_store::settings::DatabaseAlias;
use wallaby_store::SqlRecord;

/// In-memory database for the `default` alias with every migration applied
pub fn setup_db() -> Database {
    setup_alias(DatabaseAlias::Default)
}

pub fn setup_alias(alias: DatabaseAlias) -> Database {
    let mut db = open_in_memory(&alias.search_path()).expect("open in-memory database");
    apply_migrations(&mut db).expect("apply migrations");
    db
}

pub fn dec(s: &str) -> BigDecimal {
    BigDecimal::from_str(s).expect("decimal literal")
}

/// Write a row the way the upstream pipeline would, bypassing the repository
pub fn insert_upstream<R: SqlRecord>(db: &Database, record: &mut R) {
    let table = R::TABLE;
    let columns: Vec<String> = table
        .value_columns()
        .map(|c| format!("\"{}\"", c.name))
        .collect();
    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{}", i)).collect();
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        db.qualify(table).expect("table visible"),
        columns.join(", "),
        placeholders.join(", ")
    );
    db.conn()
        .execute(&sql, params_from_iter(record.to_values()))
        .expect("upstream insert");
    record
        .assign_id(db.conn().last_insert_rowid())
        .expect("assign id");
}

/// Try the same raw insert, returning the engine's verdict
pub fn try_insert_upstream<R: SqlRecord>(db: &Database, record: &R) -> rusqlite::Result<usize> {
    let table = R::TABLE;
    let columns: Vec<String> = table
        .value_columns()
        .map(|c| format!("\"{}\"", c.name))
        .collect();
    let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{}", i)).collect();
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        db.qualify(table).expect("table visible"),
        columns.join(", "),
        placeholders.join(", ")
    );
    db.conn().execute(&sql, params_from_iter(record.to_values()))
}

pub fn thresholds() -> StructuredDocument {
    StructuredDocument::from(serde_json::json!({"snr": 5.0}))
}

pub fn upstream_run(db: &Database, name: &str) -> Run {
    let mut run = Run::new(name, thresholds());
    insert_upstream(db, &mut run);
    run
}

pub fn upstream_instance(db: &Database, run: &Run, filename: &str, boundary: &str) -> Instance {
    let run_date = Utc.with_ymd_and_hms(2021, 3, 4, 5, 6, 7).unwrap();
    let mut instance = Instance::new(
        run.id.expect("run persisted"),
        filename,
        boundary,
        run_date,
        StructuredDocument::from(serde_json::json!({"pipeline": {"threads": 8}})),
    );
    insert_upstream(db, &mut instance);
    instance
}

/// A detection with every uniqueness column populated
pub fn full_detection(instance: &Instance, name: &str) -> Detection {
    let mut detection = Detection::new(
        instance.id.expect("instance persisted"),
        instance.run_id,
        dec("10.5"),
        dec("20.25"),
        dec("300.125"),
    );
    detection.name = Some(name.to_string());
    detection.x_min = Some(1);
    detection.x_max = Some(20);
    detection.y_min = Some(2);
    detection.y_max = Some(40);
    detection.z_min = Some(3);
    detection.z_max = Some(600);
    detection.n_pix = Some(128);
    detection.f_min = Some(dec("-0.001"));
    detection.f_max = Some(dec("0.05"));
    detection.f_sum = Some(dec("1.75"));
    detection
}

pub fn upstream_detection(db: &Database, instance: &Instance, name: &str) -> Detection {
    let mut detection = full_detection(instance, name);
    insert_upstream(db, &mut detection);
    detection
}

pub fn upstream_source(db: &Database, detection: &Detection) -> Sources {
    let mut source = Sources::new(detection.id.expect("detection persisted"));
    insert_upstream(db, &mut source);
    source
}

/// Row count read straight from storage
pub fn row_count<R: SqlRecord>(db: &Database) -> i64 {
    let sql = format!(
        "SELECT COUNT(*) FROM {}",
        db.qualify(R::TABLE).expect("table visible")
    );
    db.conn()
        .query_row(&sql, [], |row| row.get(0))
        .expect("count rows")
}
