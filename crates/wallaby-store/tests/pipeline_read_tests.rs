// Integration tests for reading pipeline rows and storage-level uniqueness
//
// Rows are written with raw SQL to stand in for the upstream pipeline.

mod common;

use common::*;
use wallaby_core::model::{Detection, Instance, Run, StructuredDocument};
use wallaby_store::repo::pipeline;
use wallaby_store::settings::DatabaseAlias;
use wallaby_store::SqliteRepo;

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

#[test]
fn test_duplicate_instance_rejected() {
    // Given: run "test-run" with thresholds {"snr": 5.0} and one instance
    let db = setup_db();
    let run = upstream_run(&db, "test-run");
    let instance = upstream_instance(&db, &run, "cube1.fits", "0-100");

    // When: a second instance repeats (run, filename, boundary)
    let mut duplicate = instance.clone();
    duplicate.id = None;
    duplicate.parameters = StructuredDocument::default();
    let err = try_insert_upstream(&db, &duplicate).unwrap_err();

    // Then: storage rejects it
    assert!(is_constraint_violation(&err), "{:?}", err);
    assert_eq!(row_count::<Instance>(&db), 1);

    // And: a different boundary is accepted
    duplicate.boundary = "100-200".to_string();
    assert_eq!(try_insert_upstream(&db, &duplicate).unwrap(), 1);
}

#[test]
fn test_duplicate_run_rejected() {
    let db = setup_db();
    upstream_run(&db, "test-run");

    let err = try_insert_upstream(&db, &Run::new("test-run", thresholds())).unwrap_err();
    assert!(is_constraint_violation(&err));

    // Same name with other thresholds is a distinct run
    let other = Run::new(
        "test-run",
        StructuredDocument::parse(r#"{"snr": 3.0}"#).unwrap(),
    );
    assert_eq!(try_insert_upstream(&db, &other).unwrap(), 1);
    assert_eq!(pipeline::runs_named(&db, "test-run").unwrap().len(), 2);
}

#[test]
fn test_duplicate_detection_rejected() {
    let db = setup_db();
    let run = upstream_run(&db, "test-run");
    let instance = upstream_instance(&db, &run, "cube1.fits", "0-100");
    upstream_detection(&db, &instance, "WALLABY J100342-270137");

    // Identical key tuple; non-key columns differ
    let mut duplicate = full_detection(&instance, "WALLABY J100342-270137");
    duplicate.flag = 2;
    duplicate.ra = Some(dec("150.925"));
    let err = try_insert_upstream(&db, &duplicate).unwrap_err();
    assert!(is_constraint_violation(&err));

    // A shifted centroid is a different detection
    duplicate.x = dec("10.500000000001");
    assert_eq!(try_insert_upstream(&db, &duplicate).unwrap(), 1);
}

#[test]
fn test_equal_decimals_in_other_notation_still_collide() {
    let db = setup_db();
    let run = upstream_run(&db, "test-run");
    let instance = upstream_instance(&db, &run, "cube1.fits", "0-100");
    upstream_detection(&db, &instance, "J1");

    let mut duplicate = full_detection(&instance, "J1");
    duplicate.x = dec("10.500");
    duplicate.f_sum = Some(dec("1.7500"));
    assert!(try_insert_upstream(&db, &duplicate).is_err());
}

#[test]
fn test_detection_differing_past_twelfth_place_collides() {
    // Given: detection J1 at x = 10.5
    let db = setup_db();
    let run = upstream_run(&db, "test-run");
    let instance = upstream_instance(&db, &run, "cube1.fits", "0-100");
    upstream_detection(&db, &instance, "J1");

    // When: the same detection arrives with x shifted in the 13th place
    let mut duplicate = full_detection(&instance, "J1");
    duplicate.x = dec("10.5000000000001");
    let err = try_insert_upstream(&db, &duplicate).unwrap_err();

    // Then: both hold x = 10.5 at storage scale, so the key collides
    assert!(is_constraint_violation(&err), "{:?}", err);
    assert_eq!(row_count::<Detection>(&db), 1);
}

#[test]
fn test_measurements_read_back_at_storage_scale() {
    let db = setup_db();
    let run = upstream_run(&db, "test-run");
    let instance = upstream_instance(&db, &run, "cube1.fits", "0-100");

    let mut detection = Detection::new(
        instance.id.unwrap(),
        run.id.unwrap(),
        dec("1.0000000000004"),
        dec("2.0000000000015"),
        dec("3"),
    );
    insert_upstream(&db, &mut detection);

    let stored: Detection = SqliteRepo::fetch(&db, detection.id.unwrap()).unwrap();
    assert_eq!(stored.x, dec("1"));
    assert_eq!(stored.y, dec("2.000000000002"));
}

#[test]
fn test_storage_rejects_non_canonical_decimal_text() {
    let db = setup_db();
    let run = upstream_run(&db, "test-run");
    let instance = upstream_instance(&db, &run, "cube1.fits", "0-100");
    let detection = upstream_detection(&db, &instance, "J1");

    for text in ["1.0000000000004", "10.50", "10.", "1e3", "abc"] {
        let err = db
            .conn()
            .execute(
                "UPDATE wallaby.detection SET x = ?1 WHERE id = ?2",
                rusqlite::params![text, detection.id.unwrap()],
            )
            .unwrap_err();
        assert!(is_constraint_violation(&err), "{} accepted", text);
    }
    for text in ["-0.000000000001", "1000", "0"] {
        db.conn()
            .execute(
                "UPDATE wallaby.detection SET f_sum = ?1 WHERE id = ?2",
                rusqlite::params![text, detection.id.unwrap()],
            )
            .unwrap();
    }
}

fn insert_raw_run(
    db: &wallaby_store::Database,
    name: &str,
    thresholds: &str,
) -> rusqlite::Result<usize> {
    db.conn().execute(
        "INSERT INTO wallaby.run (name, sanity_thresholds) VALUES (?1, ?2)",
        [name, thresholds],
    )
}

#[test]
fn test_run_thresholds_compare_as_documents() {
    // Given: run "r" written upstream with spaced JSON
    let db = setup_db();
    insert_raw_run(&db, "r", r#"{"snr": 5.0}"#).unwrap();

    // When/Then: the same document in another layout is a duplicate
    let err = insert_raw_run(&db, "r", r#"{"snr":5.0}"#).unwrap_err();
    assert!(is_constraint_violation(&err), "{:?}", err);
    let err = insert_raw_run(&db, "r", r#"{"snr":5}"#).unwrap_err();
    assert!(is_constraint_violation(&err), "{:?}", err);

    // And: key order does not make a document distinct
    insert_raw_run(&db, "k", r#"{"b":1,"a":{"y":[1,2],"x":null}}"#).unwrap();
    let err = insert_raw_run(&db, "k", r#"{"a":{"x":null,"y":[1,2]},"b":1}"#).unwrap_err();
    assert!(is_constraint_violation(&err), "{:?}", err);

    // And: a different value or array order still makes a new run
    insert_raw_run(&db, "k", r#"{"a":{"x":null,"y":[2,1]},"b":1}"#).unwrap();
    insert_raw_run(&db, "r", r#"{"snr":5.5}"#).unwrap();
    assert_eq!(row_count::<Run>(&db), 4);
}

#[test]
fn test_renaming_a_run_onto_an_equal_document_is_rejected() {
    let db = setup_db();
    insert_raw_run(&db, "a", r#"{"snr": 5.0}"#).unwrap();
    insert_raw_run(&db, "b", r#"{"snr":5.0}"#).unwrap();

    let err = db
        .conn()
        .execute("UPDATE wallaby.run SET name = 'a' WHERE name = 'b'", [])
        .unwrap_err();
    assert!(is_constraint_violation(&err), "{:?}", err);

    // Rewriting a row's own document is not a collision with itself
    db.conn()
        .execute(
            "UPDATE wallaby.run SET sanity_thresholds = '{\"snr\":5.0}' WHERE name = 'a'",
            [],
        )
        .unwrap();
}

#[test]
fn test_instance_requires_existing_run() {
    let db = setup_db();
    let orphan = Instance::new(
        77,
        "cube9.fits",
        "0-1",
        chrono::Utc::now(),
        StructuredDocument::default(),
    );
    let err = try_insert_upstream(&db, &orphan).unwrap_err();
    assert!(is_constraint_violation(&err));
}

#[test]
fn test_run_with_dependents_cannot_be_removed_upstream() {
    let db = setup_db();
    let run = upstream_run(&db, "test-run");
    upstream_instance(&db, &run, "cube1.fits", "0-100");

    let err = db
        .conn()
        .execute("DELETE FROM wallaby.run WHERE id = ?1", [run.id.unwrap()])
        .unwrap_err();
    assert!(is_constraint_violation(&err));
}

#[test]
fn test_high_precision_decimals_round_trip() {
    let db = setup_db();
    let run = upstream_run(&db, "test-run");
    let instance = upstream_instance(&db, &run, "cube1.fits", "0-100");

    let mut detection = Detection::new(
        instance.id.unwrap(),
        run.id.unwrap(),
        dec("123456789012345678901234567890.123456789012"),
        dec("-0.000000000001"),
        dec("1420405751.768000000000"),
    );
    detection.freq = Some(dec("1420405751.786"));
    detection.v_app = Some(dec("98765.432109876543"));
    insert_upstream(&db, &mut detection);

    let stored: Detection = SqliteRepo::fetch(&db, detection.id.unwrap()).unwrap();
    assert_eq!(stored, detection);
    assert_eq!(stored.x, dec("123456789012345678901234567890.123456789012"));
    assert_eq!(stored.f_min, None);
}

#[test]
fn test_documents_and_blobs_round_trip() {
    let db = setup_db();
    let run = upstream_run(&db, "test-run");
    let mut instance = Instance::new(
        run.id.unwrap(),
        "cube2.fits",
        "100-200",
        chrono::Utc::now(),
        StructuredDocument::parse(r#"{"steps": {"doScaleNoise": true}, "flag": [1, 2]}"#)
            .unwrap(),
    );
    instance.log = Some(b"SoFiA 2.3.1\n".to_vec());
    instance.stderr = Some(Vec::new());
    instance.version = Some("2.3.1".to_string());
    instance.return_code = Some(0);
    insert_upstream(&db, &mut instance);

    let stored = pipeline::find_instance(&db, run.id.unwrap(), "cube2.fits", "100-200")
        .unwrap()
        .unwrap();
    assert_eq!(stored.parameters, instance.parameters);
    assert_eq!(stored.log, instance.log);
    assert_eq!(stored.stderr, Some(Vec::new()));
    assert_eq!(
        stored.run_date.timestamp_millis(),
        instance.run_date.timestamp_millis()
    );
    assert!(stored.succeeded());
    assert_eq!(stored.to_string(), instance.id.unwrap().to_string());
}

#[test]
fn test_malformed_document_rejected_by_storage() {
    let db = setup_db();
    upstream_run(&db, "bad");
    let err = db
        .conn()
        .execute(
            "INSERT INTO wallaby.run (name, sanity_thresholds) VALUES ('bad', '{snr: 5')",
            [],
        )
        .unwrap_err();
    assert!(is_constraint_violation(&err));
}

#[test]
fn test_provenance_queries() {
    let db = setup_alias(DatabaseAlias::Wallaby);
    let run = upstream_run(&db, "test-run");
    let first = upstream_instance(&db, &run, "cube1.fits", "0-100");
    let second = upstream_instance(&db, &run, "cube1.fits", "100-200");
    let a = upstream_detection(&db, &first, "J1");
    let b = upstream_detection(&db, &second, "J2");
    let source = upstream_source(&db, &b);

    assert_eq!(
        pipeline::instances_for_run(&db, run.id.unwrap()).unwrap(),
        vec![first.clone(), second.clone()]
    );
    assert_eq!(
        pipeline::detections_for_instance(&db, first.id.unwrap()).unwrap(),
        vec![a.clone()]
    );
    assert_eq!(
        pipeline::detections_for_run(&db, run.id.unwrap()).unwrap(),
        vec![a, b.clone()]
    );
    assert_eq!(
        pipeline::sources_for_detection(&db, b.id.unwrap()).unwrap(),
        vec![source]
    );
    assert!(pipeline::find_instance(&db, run.id.unwrap(), "cube1.fits", "9-9")
        .unwrap()
        .is_none());

    let fetched: Run = SqliteRepo::fetch(&db, run.id.unwrap()).unwrap();
    assert_eq!(fetched.to_string(), "test-run");
    assert_eq!(b.to_string(), "J2");
}
