// Integration tests for the migration framework
//
// Idempotency, checksum tampering, per-alias skipping and file-backed aliases.

mod common;

use common::*;
use std::collections::HashMap;
use wallaby_core::errors::ExErrorKind;
use wallaby_core::model::{Run, Store};
use wallaby_core::schema::Schema;
use wallaby_store::db::{connect, open_in_memory};
use wallaby_store::migrations::{apply_migrations, applied_migrations};
use wallaby_store::settings::{DatabaseAlias, Settings};
use wallaby_store::SqliteRepo;

fn table_names(db: &wallaby_store::Database, schema: &str) -> Vec<String> {
    let sql = format!(
        "SELECT name FROM \"{}\".sqlite_master WHERE type = 'table' ORDER BY name",
        schema
    );
    let mut stmt = db.conn().prepare(&sql).unwrap();
    stmt.query_map([], |row| row.get(0))
        .unwrap()
        .collect::<Result<Vec<String>, _>>()
        .unwrap()
}

fn file_settings(dir: &std::path::Path) -> Settings {
    let vars: HashMap<&str, String> = [
        ("WALLABY_DATABASE_ENGINE", "django.db.backends.sqlite3".to_string()),
        (
            "WALLABY_DATABASE_NAME",
            dir.join("wallaby.db").to_string_lossy().into_owned(),
        ),
        ("WALLABY_DATABASE_USER", "admin".to_string()),
        ("WALLABY_DATABASE_PASSWORD", "admin".to_string()),
    ]
    .into_iter()
    .collect();
    Settings::from_lookup(|k| vars.get(k).cloned()).unwrap()
}

#[test]
fn test_apply_migrations_on_empty_db() {
    // Given: an empty database for the default alias
    let mut db = open_in_memory(&DatabaseAlias::Default.search_path()).unwrap();

    // When: migrations are applied
    let report = apply_migrations(&mut db).unwrap();

    // Then: both schemas are populated
    assert_eq!(report.applied, vec!["001_bookstore", "002_pipeline"]);
    let public = table_names(&db, "main");
    for expected in [
        "books",
        "inventory_inventory",
        "sales_sale",
        "schema_version",
        "shops",
        "stores_store",
    ] {
        assert!(public.contains(&expected.to_string()), "missing {}", expected);
    }
    let wallaby = table_names(&db, "wallaby");
    for expected in ["detection", "instance", "run", "sources"] {
        assert!(wallaby.contains(&expected.to_string()), "missing {}", expected);
    }
}

#[test]
fn test_migrations_idempotent() {
    let mut db = setup_db();
    let again = apply_migrations(&mut db).unwrap();
    assert!(again.applied.is_empty());
    assert_eq!(
        applied_migrations(&db).unwrap(),
        vec!["001_bookstore".to_string(), "002_pipeline".to_string()]
    );
}

#[test]
fn test_checksum_tampering_detected() {
    // Given: migrations recorded with their checksums
    let mut db = setup_db();

    // When: a recorded checksum no longer matches the embedded SQL
    db.conn()
        .execute(
            "UPDATE schema_version SET checksum = 'deadbeef' WHERE migration_id = '002_pipeline'",
            [],
        )
        .unwrap();

    // Then: re-applying fails loudly
    let err = apply_migrations(&mut db).unwrap_err();
    assert_eq!(err.kind(), ExErrorKind::ConstraintViolation);
    assert_eq!(err.op(), Some("migration_checksum"));
    assert_eq!(err.entity_id(), Some("002_pipeline"));
}

#[test]
fn test_wallaby_alias_skips_public_schema() {
    let mut db = open_in_memory(&DatabaseAlias::Wallaby.search_path()).unwrap();
    let report = apply_migrations(&mut db).unwrap();

    assert_eq!(report.applied, vec!["002_pipeline"]);
    assert_eq!(report.skipped, vec!["001_bookstore"]);
    assert!(!table_names(&db, "main").contains(&"books".to_string()));
}

#[test]
fn test_public_only_path_skips_pipeline() {
    let mut db = open_in_memory(&[Schema::Public]).unwrap();
    let report = apply_migrations(&mut db).unwrap();
    assert_eq!(report.skipped, vec!["002_pipeline"]);
}

#[test]
fn test_file_backed_aliases_share_storage() {
    let dir = tempfile::tempdir().unwrap();
    let settings = file_settings(dir.path());

    // Given: the default alias migrated and holding a store and a run
    {
        let mut db = connect(settings.database(DatabaseAlias::Default)).unwrap();
        apply_migrations(&mut db).unwrap();
        let mut store = Store::new("Central", "1 Murray St");
        SqliteRepo::save(&db, &mut store).unwrap();
        upstream_run(&db, "file-run");

        let mode: String = db
            .conn()
            .query_row("PRAGMA wallaby.journal_mode", [], |row| row.get(0))
            .unwrap();
        assert_eq!(mode.to_lowercase(), "wal");
    }
    assert!(dir.path().join("wallaby.db").exists());
    assert!(dir.path().join("wallaby_wallaby.db").exists());

    // When: the wallaby alias connects to the same files
    let mut db = connect(settings.database(DatabaseAlias::Wallaby)).unwrap();
    let report = apply_migrations(&mut db).unwrap();

    // Then: nothing is re-applied, pipeline rows are visible, bookstore is not
    assert!(report.applied.is_empty());
    assert_eq!(pipeline_names(&db), vec!["file-run".to_string()]);
    assert_eq!(
        SqliteRepo::count::<Store>(&db).unwrap_err().kind(),
        ExErrorKind::SchemaNotVisible
    );
}

fn pipeline_names(db: &wallaby_store::Database) -> Vec<String> {
    SqliteRepo::all::<Run>(db)
        .unwrap()
        .into_iter()
        .map(|r| r.name)
        .collect()
}
