//! Pipeline schema (externally managed)
//!
//! Rows in these tables are produced by the upstream source-finding pipeline.
//! This application only reads them; see [`crate::guard`].

use super::{object_label, Record, StructuredDocument};
use crate::schema::{Column, ColumnType, Management, OnDelete, Schema, TableDef};
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const RUN: TableDef = TableDef {
    model: "Run",
    name: "run",
    schema: Schema::Wallaby,
    management: Management::External,
    columns: &[
        Column::identity("id", ColumnType::BigInteger),
        Column::new("name", ColumnType::Text),
        Column::new("sanity_thresholds", ColumnType::Json),
    ],
    unique_together: &[&["name", "sanity_thresholds"]],
};

pub const INSTANCE: TableDef = TableDef {
    model: "Instance",
    name: "instance",
    schema: Schema::Wallaby,
    management: Management::External,
    columns: &[
        Column::identity("id", ColumnType::BigInteger),
        Column::foreign_key("run_id", ColumnType::BigInteger, "run", OnDelete::NoAction),
        Column::new("filename", ColumnType::Text),
        Column::new("boundary", ColumnType::Text),
        Column::new("run_date", ColumnType::Timestamp),
        Column::new("flag_log", ColumnType::Binary).nullable(),
        Column::new("reliability_plot", ColumnType::Binary).nullable(),
        Column::new("log", ColumnType::Binary).nullable(),
        Column::new("parameters", ColumnType::Json),
        Column::new("version", ColumnType::Text).max_length(512).nullable(),
        Column::new("return_code", ColumnType::Integer).nullable(),
        Column::new("stdout", ColumnType::Binary).nullable(),
        Column::new("stderr", ColumnType::Binary).nullable(),
    ],
    unique_together: &[&["run_id", "filename", "boundary"]],
};

pub const DETECTION: TableDef = TableDef {
    model: "Detection",
    name: "detection",
    schema: Schema::Wallaby,
    management: Management::External,
    columns: &[
        Column::identity("id", ColumnType::BigInteger),
        Column::foreign_key(
            "instance_id",
            ColumnType::BigInteger,
            "instance",
            OnDelete::NoAction,
        ),
        Column::foreign_key("run_id", ColumnType::BigInteger, "run", OnDelete::NoAction),
        Column::new("name", ColumnType::Text).nullable(),
        Column::measurement("x"),
        Column::measurement("y"),
        Column::measurement("z"),
        Column::new("x_min", ColumnType::Integer).nullable(),
        Column::new("x_max", ColumnType::Integer).nullable(),
        Column::new("y_min", ColumnType::Integer).nullable(),
        Column::new("y_max", ColumnType::Integer).nullable(),
        Column::new("z_min", ColumnType::Integer).nullable(),
        Column::new("z_max", ColumnType::Integer).nullable(),
        Column::new("n_pix", ColumnType::Integer).nullable(),
        Column::measurement("f_min").nullable(),
        Column::measurement("f_max").nullable(),
        Column::measurement("f_sum").nullable(),
        Column::measurement("rel").nullable(),
        Column::measurement("rms").nullable(),
        Column::measurement("w20").nullable(),
        Column::measurement("w50").nullable(),
        Column::measurement("ell_maj").nullable(),
        Column::measurement("ell_min").nullable(),
        Column::measurement("ell_pa").nullable(),
        Column::measurement("ell3s_maj").nullable(),
        Column::measurement("ell3s_min").nullable(),
        Column::measurement("ell3s_pa").nullable(),
        Column::measurement("kin_pa").nullable(),
        Column::measurement("err_x").nullable(),
        Column::measurement("err_y").nullable(),
        Column::measurement("err_z").nullable(),
        Column::measurement("err_f_sum").nullable(),
        Column::measurement("ra").nullable(),
        Column::measurement("dec").nullable(),
        Column::measurement("freq").nullable(),
        Column::new("flag", ColumnType::Integer),
        Column::measurement("l").nullable(),
        Column::measurement("b").nullable(),
        Column::measurement("v_rad").nullable(),
        Column::measurement("v_opt").nullable(),
        Column::measurement("v_app").nullable(),
        Column::new("unresolved", ColumnType::Boolean),
    ],
    unique_together: &[&[
        "name",
        "x",
        "y",
        "z",
        "x_min",
        "x_max",
        "y_min",
        "y_max",
        "z_min",
        "z_max",
        "n_pix",
        "f_min",
        "f_max",
        "f_sum",
        "instance_id",
        "run_id",
    ]],
};

pub const SOURCES: TableDef = TableDef {
    model: "Sources",
    name: "sources",
    schema: Schema::Wallaby,
    management: Management::External,
    columns: &[
        Column::identity("id", ColumnType::BigInteger),
        Column::foreign_key(
            "detection_id",
            ColumnType::BigInteger,
            "detection",
            OnDelete::NoAction,
        ),
    ],
    unique_together: &[],
};

/// One execution of the pipeline with its sanity thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Run {
    pub id: Option<i64>,
    pub name: String,
    pub sanity_thresholds: StructuredDocument,
}

impl Run {
    pub fn new(name: impl Into<String>, sanity_thresholds: StructuredDocument) -> Self {
        Self {
            id: None,
            name: name.into(),
            sanity_thresholds,
        }
    }
}

impl Record for Run {
    const TABLE: &'static TableDef = &RUN;

    fn id(&self) -> Option<i64> {
        self.id
    }
}

impl fmt::Display for Run {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// The pipeline applied to one region (`boundary`) of one input cube
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    pub id: Option<i64>,
    pub run_id: i64,
    pub filename: String,
    pub boundary: String,
    pub run_date: DateTime<Utc>,
    pub flag_log: Option<Vec<u8>>,
    pub reliability_plot: Option<Vec<u8>>,
    pub log: Option<Vec<u8>>,
    pub parameters: StructuredDocument,
    /// At most 512 characters
    pub version: Option<String>,
    pub return_code: Option<i32>,
    pub stdout: Option<Vec<u8>>,
    pub stderr: Option<Vec<u8>>,
}

impl Instance {
    pub fn new(
        run_id: i64,
        filename: impl Into<String>,
        boundary: impl Into<String>,
        run_date: DateTime<Utc>,
        parameters: StructuredDocument,
    ) -> Self {
        Self {
            id: None,
            run_id,
            filename: filename.into(),
            boundary: boundary.into(),
            run_date,
            flag_log: None,
            reliability_plot: None,
            log: None,
            parameters,
            version: None,
            return_code: None,
            stdout: None,
            stderr: None,
        }
    }

    /// Whether the pipeline process exited cleanly
    pub fn succeeded(&self) -> bool {
        self.return_code == Some(0)
    }
}

impl Record for Instance {
    const TABLE: &'static TableDef = &INSTANCE;

    fn id(&self) -> Option<i64> {
        self.id
    }
}

impl fmt::Display for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id {
            Some(id) => write!(f, "{}", id),
            None => f.write_str("None"),
        }
    }
}

/// A candidate source found by one instance of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub id: Option<i64>,
    pub instance_id: i64,
    pub run_id: i64,
    pub name: Option<String>,
    pub x: BigDecimal,
    pub y: BigDecimal,
    pub z: BigDecimal,
    pub x_min: Option<i32>,
    pub x_max: Option<i32>,
    pub y_min: Option<i32>,
    pub y_max: Option<i32>,
    pub z_min: Option<i32>,
    pub z_max: Option<i32>,
    pub n_pix: Option<i32>,
    pub f_min: Option<BigDecimal>,
    pub f_max: Option<BigDecimal>,
    pub f_sum: Option<BigDecimal>,
    pub rel: Option<BigDecimal>,
    pub rms: Option<BigDecimal>,
    pub w20: Option<BigDecimal>,
    pub w50: Option<BigDecimal>,
    pub ell_maj: Option<BigDecimal>,
    pub ell_min: Option<BigDecimal>,
    pub ell_pa: Option<BigDecimal>,
    pub ell3s_maj: Option<BigDecimal>,
    pub ell3s_min: Option<BigDecimal>,
    pub ell3s_pa: Option<BigDecimal>,
    pub kin_pa: Option<BigDecimal>,
    pub err_x: Option<BigDecimal>,
    pub err_y: Option<BigDecimal>,
    pub err_z: Option<BigDecimal>,
    pub err_f_sum: Option<BigDecimal>,
    pub ra: Option<BigDecimal>,
    pub dec: Option<BigDecimal>,
    pub freq: Option<BigDecimal>,
    pub flag: i32,
    pub l: Option<BigDecimal>,
    pub b: Option<BigDecimal>,
    pub v_rad: Option<BigDecimal>,
    pub v_opt: Option<BigDecimal>,
    pub v_app: Option<BigDecimal>,
    pub unresolved: bool,
}

impl Detection {
    /// A detection at `(x, y, z)` with every optional measurement unset
    pub fn new(instance_id: i64, run_id: i64, x: BigDecimal, y: BigDecimal, z: BigDecimal) -> Self {
        Self {
            id: None,
            instance_id,
            run_id,
            name: None,
            x,
            y,
            z,
            x_min: None,
            x_max: None,
            y_min: None,
            y_max: None,
            z_min: None,
            z_max: None,
            n_pix: None,
            f_min: None,
            f_max: None,
            f_sum: None,
            rel: None,
            rms: None,
            w20: None,
            w50: None,
            ell_maj: None,
            ell_min: None,
            ell_pa: None,
            ell3s_maj: None,
            ell3s_min: None,
            ell3s_pa: None,
            kin_pa: None,
            err_x: None,
            err_y: None,
            err_z: None,
            err_f_sum: None,
            ra: None,
            dec: None,
            freq: None,
            flag: 0,
            l: None,
            b: None,
            v_rad: None,
            v_opt: None,
            v_app: None,
            unresolved: false,
        }
    }

    /// Bounding box as `(x_min, x_max, y_min, y_max, z_min, z_max)` when fully known
    pub fn bounding_box(&self) -> Option<(i32, i32, i32, i32, i32, i32)> {
        Some((
            self.x_min?,
            self.x_max?,
            self.y_min?,
            self.y_max?,
            self.z_min?,
            self.z_max?,
        ))
    }
}

impl Record for Detection {
    const TABLE: &'static TableDef = &DETECTION;

    fn id(&self) -> Option<i64> {
        self.id
    }
}

impl fmt::Display for Detection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name.as_deref().unwrap_or(""))
    }
}

/// A detection promoted to the source catalogue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sources {
    pub id: Option<i64>,
    pub detection_id: i64,
}

impl Sources {
    pub fn new(detection_id: i64) -> Self {
        Self {
            id: None,
            detection_id,
        }
    }
}

impl Record for Sources {
    const TABLE: &'static TableDef = &SOURCES;

    fn id(&self) -> Option<i64> {
        self.id
    }
}

impl fmt::Display for Sources {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&object_label(Self::TABLE, self.id))
    }
}
