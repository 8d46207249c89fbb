//! Row codecs for every record type
//!
//! Storage encodings:
//! - decimals: rounded half-to-even to the column's scale, then written as
//!   plain decimal text without trailing zeros
//! - structured documents: compact JSON text
//! - timestamps: Unix epoch milliseconds
//! - booleans: 0/1

#![allow(clippy::result_large_err)]

use crate::errors::Result;
use bigdecimal::{BigDecimal, RoundingMode};
use chrono::{DateTime, Utc};
use rusqlite::types::{Type, Value};
use rusqlite::Row;
use std::str::FromStr;
use wallaby_core::errors::{ExError, ExErrorKind};
use wallaby_core::model::{
    Book, Detection, Instance, Inventory, Record, Run, Sale, Shop, Sources, Store,
    StructuredDocument,
};
use wallaby_core::schema::{ColumnType, MEASUREMENT};

/// A record that can be read from and written to a SQLite row
///
/// `Clone` lets the repository stage writes on a copy.
pub trait SqlRecord: Record + Clone {
    /// Decode a row selected with every column of `Self::TABLE`
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;

    /// Values for `Self::TABLE.value_columns()`, in that order
    fn to_values(&self) -> Vec<Value>;

    /// Record the identity assigned by an insert
    fn assign_id(&mut self, id: i64) -> Result<()>;

    /// Hook run after authorization and before the write is issued; applied
    /// to the staged copy, so it only reaches the caller once the row is stored
    fn before_save(&mut self) {}
}

/// SQLite declared type for a column type
pub fn sqlite_type(ty: ColumnType) -> &'static str {
    match ty {
        ColumnType::Integer | ColumnType::BigInteger | ColumnType::Boolean => "INTEGER",
        ColumnType::Timestamp => "INTEGER",
        ColumnType::Float => "REAL",
        ColumnType::Decimal { .. } | ColumnType::Text | ColumnType::Json => "TEXT",
        ColumnType::Binary => "BLOB",
    }
}

/// Current time at storage precision
pub fn now_millis() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now)
}

fn narrow_id(table: &str, id: i64) -> Result<i32> {
    i32::try_from(id).map_err(|_| {
        ExError::new(ExErrorKind::Internal)
            .with_op("assign_id")
            .with_table(table)
            .with_entity_id(id.to_string())
            .with_message("assigned identity exceeds the 32-bit id range")
    })
}

fn conversion_failure<E>(row: &Row<'_>, column: &str, ty: Type, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    let index = row.as_ref().column_index(column).unwrap_or_default();
    rusqlite::Error::FromSqlConversionFailure(index, ty, Box::new(err))
}

// ---- encoders ----

/// The value a decimal column of type `ty` actually holds
///
/// Equal values always quantize to the same digits, so the stored text is a
/// sound key for UNIQUE groups.
pub fn quantize(value: &BigDecimal, ty: ColumnType) -> BigDecimal {
    match ty.decimal_places() {
        Some(places) => value
            .with_scale_round(i64::from(places), RoundingMode::HalfEven)
            .normalized(),
        None => value.normalized(),
    }
}

fn measurement(value: &BigDecimal) -> Value {
    Value::Text(quantize(value, MEASUREMENT).to_plain_string())
}

fn opt_measurement(value: &Option<BigDecimal>) -> Value {
    value.as_ref().map(measurement).unwrap_or(Value::Null)
}

fn document(value: &StructuredDocument) -> Value {
    Value::Text(value.to_json_string())
}

fn timestamp(value: &DateTime<Utc>) -> Value {
    Value::Integer(value.timestamp_millis())
}

// ---- decoders ----

fn parse_decimal(row: &Row<'_>, column: &str, text: &str) -> rusqlite::Result<BigDecimal> {
    BigDecimal::from_str(text).map_err(|e| conversion_failure(row, column, Type::Text, e))
}

fn get_decimal(row: &Row<'_>, column: &str) -> rusqlite::Result<BigDecimal> {
    let text: String = row.get(column)?;
    parse_decimal(row, column, &text)
}

fn get_opt_decimal(row: &Row<'_>, column: &str) -> rusqlite::Result<Option<BigDecimal>> {
    let text: Option<String> = row.get(column)?;
    text.map(|t| parse_decimal(row, column, &t)).transpose()
}

fn get_document(row: &Row<'_>, column: &str) -> rusqlite::Result<StructuredDocument> {
    let text: String = row.get(column)?;
    StructuredDocument::parse(&text).map_err(|e| conversion_failure(row, column, Type::Text, e))
}

fn get_timestamp(row: &Row<'_>, column: &str) -> rusqlite::Result<DateTime<Utc>> {
    let millis: i64 = row.get(column)?;
    DateTime::from_timestamp_millis(millis).ok_or_else(|| {
        rusqlite::Error::IntegralValueOutOfRange(
            row.as_ref().column_index(column).unwrap_or_default(),
            millis,
        )
    })
}

// ---- bookstore ----

impl SqlRecord for Shop {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            address: row.get("address")?,
            state: row.get("state")?,
            contact_email: row.get("contact_email")?,
            contact_number: row.get("contact_number")?,
        })
    }

    fn to_values(&self) -> Vec<Value> {
        vec![
            self.name.clone().into(),
            self.address.clone().into(),
            self.state.clone().into(),
            self.contact_email.clone().into(),
            self.contact_number.clone().into(),
        ]
    }

    fn assign_id(&mut self, id: i64) -> Result<()> {
        self.id = Some(narrow_id(Self::TABLE.name, id)?);
        Ok(())
    }
}

impl SqlRecord for Store {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            address: row.get("address")?,
        })
    }

    fn to_values(&self) -> Vec<Value> {
        vec![self.name.clone().into(), self.address.clone().into()]
    }

    fn assign_id(&mut self, id: i64) -> Result<()> {
        self.id = Some(narrow_id(Self::TABLE.name, id)?);
        Ok(())
    }
}

impl SqlRecord for Book {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            title: row.get("title")?,
            author: row.get("author")?,
            price: row.get("price")?,
            shop_id: row.get("shop_id")?,
        })
    }

    fn to_values(&self) -> Vec<Value> {
        vec![
            self.title.clone().into(),
            self.author.clone().into(),
            self.price.into(),
            self.shop_id.into(),
        ]
    }

    fn assign_id(&mut self, id: i64) -> Result<()> {
        self.id = Some(narrow_id(Self::TABLE.name, id)?);
        Ok(())
    }
}

impl SqlRecord for Sale {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            book_id: row.get("book_id")?,
            store_id: row.get("store_id")?,
            sold_at: get_timestamp(row, "sold_at")?,
        })
    }

    fn to_values(&self) -> Vec<Value> {
        vec![
            self.book_id.into(),
            self.store_id.into(),
            timestamp(&self.sold_at),
        ]
    }

    fn assign_id(&mut self, id: i64) -> Result<()> {
        self.id = Some(narrow_id(Self::TABLE.name, id)?);
        Ok(())
    }

    fn before_save(&mut self) {
        self.touch(now_millis());
    }
}

impl SqlRecord for Inventory {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            book_id: row.get("book_id")?,
            store_id: row.get("store_id")?,
            quantity: row.get("quantity")?,
        })
    }

    fn to_values(&self) -> Vec<Value> {
        vec![
            self.book_id.into(),
            self.store_id.into(),
            self.quantity.into(),
        ]
    }

    fn assign_id(&mut self, id: i64) -> Result<()> {
        self.id = Some(narrow_id(Self::TABLE.name, id)?);
        Ok(())
    }
}

// ---- pipeline ----

impl SqlRecord for Run {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            sanity_thresholds: get_document(row, "sanity_thresholds")?,
        })
    }

    fn to_values(&self) -> Vec<Value> {
        vec![self.name.clone().into(), document(&self.sanity_thresholds)]
    }

    fn assign_id(&mut self, id: i64) -> Result<()> {
        self.id = Some(id);
        Ok(())
    }
}

impl SqlRecord for Instance {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            run_id: row.get("run_id")?,
            filename: row.get("filename")?,
            boundary: row.get("boundary")?,
            run_date: get_timestamp(row, "run_date")?,
            flag_log: row.get("flag_log")?,
            reliability_plot: row.get("reliability_plot")?,
            log: row.get("log")?,
            parameters: get_document(row, "parameters")?,
            version: row.get("version")?,
            return_code: row.get("return_code")?,
            stdout: row.get("stdout")?,
            stderr: row.get("stderr")?,
        })
    }

    fn to_values(&self) -> Vec<Value> {
        vec![
            self.run_id.into(),
            self.filename.clone().into(),
            self.boundary.clone().into(),
            timestamp(&self.run_date),
            self.flag_log.clone().into(),
            self.reliability_plot.clone().into(),
            self.log.clone().into(),
            document(&self.parameters),
            self.version.clone().into(),
            self.return_code.into(),
            self.stdout.clone().into(),
            self.stderr.clone().into(),
        ]
    }

    fn assign_id(&mut self, id: i64) -> Result<()> {
        self.id = Some(id);
        Ok(())
    }
}

impl SqlRecord for Detection {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            instance_id: row.get("instance_id")?,
            run_id: row.get("run_id")?,
            name: row.get("name")?,
            x: get_decimal(row, "x")?,
            y: get_decimal(row, "y")?,
            z: get_decimal(row, "z")?,
            x_min: row.get("x_min")?,
            x_max: row.get("x_max")?,
            y_min: row.get("y_min")?,
            y_max: row.get("y_max")?,
            z_min: row.get("z_min")?,
            z_max: row.get("z_max")?,
            n_pix: row.get("n_pix")?,
            f_min: get_opt_decimal(row, "f_min")?,
            f_max: get_opt_decimal(row, "f_max")?,
            f_sum: get_opt_decimal(row, "f_sum")?,
            rel: get_opt_decimal(row, "rel")?,
            rms: get_opt_decimal(row, "rms")?,
            w20: get_opt_decimal(row, "w20")?,
            w50: get_opt_decimal(row, "w50")?,
            ell_maj: get_opt_decimal(row, "ell_maj")?,
            ell_min: get_opt_decimal(row, "ell_min")?,
            ell_pa: get_opt_decimal(row, "ell_pa")?,
            ell3s_maj: get_opt_decimal(row, "ell3s_maj")?,
            ell3s_min: get_opt_decimal(row, "ell3s_min")?,
            ell3s_pa: get_opt_decimal(row, "ell3s_pa")?,
            kin_pa: get_opt_decimal(row, "kin_pa")?,
            err_x: get_opt_decimal(row, "err_x")?,
            err_y: get_opt_decimal(row, "err_y")?,
            err_z: get_opt_decimal(row, "err_z")?,
            err_f_sum: get_opt_decimal(row, "err_f_sum")?,
            ra: get_opt_decimal(row, "ra")?,
            dec: get_opt_decimal(row, "dec")?,
            freq: get_opt_decimal(row, "freq")?,
            flag: row.get("flag")?,
            l: get_opt_decimal(row, "l")?,
            b: get_opt_decimal(row, "b")?,
            v_rad: get_opt_decimal(row, "v_rad")?,
            v_opt: get_opt_decimal(row, "v_opt")?,
            v_app: get_opt_decimal(row, "v_app")?,
            unresolved: row.get("unresolved")?,
        })
    }

    fn to_values(&self) -> Vec<Value> {
        vec![
            self.instance_id.into(),
            self.run_id.into(),
            self.name.clone().into(),
            measurement(&self.x),
            measurement(&self.y),
            measurement(&self.z),
            self.x_min.into(),
            self.x_max.into(),
            self.y_min.into(),
            self.y_max.into(),
            self.z_min.into(),
            self.z_max.into(),
            self.n_pix.into(),
            opt_measurement(&self.f_min),
            opt_measurement(&self.f_max),
            opt_measurement(&self.f_sum),
            opt_measurement(&self.rel),
            opt_measurement(&self.rms),
            opt_measurement(&self.w20),
            opt_measurement(&self.w50),
            opt_measurement(&self.ell_maj),
            opt_measurement(&self.ell_min),
            opt_measurement(&self.ell_pa),
            opt_measurement(&self.ell3s_maj),
            opt_measurement(&self.ell3s_min),
            opt_measurement(&self.ell3s_pa),
            opt_measurement(&self.kin_pa),
            opt_measurement(&self.err_x),
            opt_measurement(&self.err_y),
            opt_measurement(&self.err_z),
            opt_measurement(&self.err_f_sum),
            opt_measurement(&self.ra),
            opt_measurement(&self.dec),
            opt_measurement(&self.freq),
            self.flag.into(),
            opt_measurement(&self.l),
            opt_measurement(&self.b),
            opt_measurement(&self.v_rad),
            opt_measurement(&self.v_opt),
            opt_measurement(&self.v_app),
            self.unresolved.into(),
        ]
    }

    fn assign_id(&mut self, id: i64) -> Result<()> {
        self.id = Some(id);
        Ok(())
    }
}

impl SqlRecord for Sources {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            detection_id: row.get("detection_id")?,
        })
    }

    fn to_values(&self) -> Vec<Value> {
        vec![self.detection_id.into()]
    }

    fn assign_id(&mut self, id: i64) -> Result<()> {
        self.id = Some(id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wallaby_core::model::ALL_TABLES;

    fn value_count<R: SqlRecord>(record: &R) -> (usize, usize) {
        (record.to_values().len(), R::TABLE.value_columns().count())
    }

    #[test]
    fn test_value_arity_matches_declared_columns() {
        let doc = StructuredDocument::default();
        let (a, b) = value_count(&Shop::new("n", "a", "WA", "e", "1"));
        assert_eq!(a, b);
        let (a, b) = value_count(&Store::new("n", "a"));
        assert_eq!(a, b);
        let (a, b) = value_count(&Book::new("t", "a", 1.0));
        assert_eq!(a, b);
        let (a, b) = value_count(&Sale::new(1, 1));
        assert_eq!(a, b);
        let (a, b) = value_count(&Inventory::new(1, 1, 1));
        assert_eq!(a, b);
        let (a, b) = value_count(&Run::new("r", doc.clone()));
        assert_eq!(a, b);
        let (a, b) = value_count(&Instance::new(1, "f", "b", Utc::now(), doc));
        assert_eq!(a, b);
        let zero = BigDecimal::from(0);
        let (a, b) = value_count(&Detection::new(1, 1, zero.clone(), zero.clone(), zero));
        assert_eq!(a, b);
        let (a, b) = value_count(&Sources::new(1));
        assert_eq!(a, b);
    }

    #[test]
    fn test_every_column_type_has_sqlite_type() {
        for table in ALL_TABLES {
            for column in table.columns {
                assert!(!sqlite_type(column.ty).is_empty());
            }
        }
    }

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    fn text(value: Value) -> String {
        match value {
            Value::Text(t) => t,
            other => panic!("expected text, got {:?}", other),
        }
    }

    #[test]
    fn test_measurement_encoding_is_canonical() {
        assert_eq!(measurement(&dec("1.50")), measurement(&dec("1.5")));
        assert_eq!(text(measurement(&dec("1E+3"))), "1000");
        assert_eq!(text(measurement(&dec("-0.000"))), "0");
    }

    #[test]
    fn test_measurement_rounds_past_twelve_places() {
        // Given: values carrying a 13th fractional digit
        // Then: they round half-to-even onto the twelfth
        assert_eq!(text(measurement(&dec("10.5000000000001"))), "10.5");
        assert_eq!(text(measurement(&dec("1.0000000000004"))), "1");
        assert_eq!(text(measurement(&dec("0.0000000000005"))), "0");
        assert_eq!(text(measurement(&dec("0.0000000000015"))), "0.000000000002");
        assert_eq!(
            text(measurement(&dec("-2.1234567890125"))),
            "-2.123456789012"
        );
    }

    #[test]
    fn test_quantize_without_scale_only_normalizes() {
        assert_eq!(
            quantize(&dec("3.14159265358979323846"), ColumnType::Text),
            dec("3.14159265358979323846")
        );
    }

    #[test]
    fn test_detection_decimals_are_all_measurements() {
        let decimals: Vec<_> = Detection::TABLE
            .columns
            .iter()
            .filter(|c| c.ty.decimal_places().is_some())
            .collect();
        assert_eq!(decimals.len(), 29);
        assert!(decimals.iter().all(|c| c.ty == MEASUREMENT));
    }

    #[test]
    fn test_now_millis_has_no_sub_millisecond_part() {
        let now = now_millis();
        assert_eq!(now.timestamp_subsec_nanos() % 1_000_000, 0);
    }

    #[test]
    fn test_narrow_id_rejects_overflow() {
        assert_eq!(narrow_id("books", 7).unwrap(), 7);
        let err = narrow_id("books", i64::from(i32::MAX) + 1).unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::Internal);
    }
}
