//! Relation queries over the pipeline schema
//!
//! Read-only by construction: nothing here issues a write.

#![allow(clippy::result_large_err)]

use crate::db::Database;
use crate::errors::Result;
use crate::repo::SqliteRepo;
use rusqlite::params;
use wallaby_core::model::{Detection, Instance, Run, Sources};

/// Runs sharing a name (distinct sanity thresholds)
pub fn runs_named(db: &Database, name: &str) -> Result<Vec<Run>> {
    SqliteRepo::filter(db, "name", name.to_string())
}

pub fn instances_for_run(db: &Database, run_id: i64) -> Result<Vec<Instance>> {
    SqliteRepo::filter(db, "run_id", run_id)
}

/// The instance identified by its natural key
pub fn find_instance(
    db: &Database,
    run_id: i64,
    filename: &str,
    boundary: &str,
) -> Result<Option<Instance>> {
    let mut found = SqliteRepo::query_where::<Instance, _>(
        db,
        "\"run_id\" = ?1 AND \"filename\" = ?2 AND \"boundary\" = ?3",
        params![run_id, filename, boundary],
    )?;
    Ok(found.pop())
}

pub fn detections_for_instance(db: &Database, instance_id: i64) -> Result<Vec<Detection>> {
    SqliteRepo::filter(db, "instance_id", instance_id)
}

pub fn detections_for_run(db: &Database, run_id: i64) -> Result<Vec<Detection>> {
    SqliteRepo::filter(db, "run_id", run_id)
}

pub fn sources_for_detection(db: &Database, detection_id: i64) -> Result<Vec<Sources>> {
    SqliteRepo::filter(db, "detection_id", detection_id)
}
