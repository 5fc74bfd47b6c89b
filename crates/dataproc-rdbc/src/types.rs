//! Value types for dataproc-rdbc
//!
//! The value model shared by CSV datasets, bulk writes and query results:
//! - Primitive types (bool, integers, floats, decimal)
//! - Date/time types
//! - Text, binary and UUID values
//!
//! Query results leave this module as [`Record`]s: ordered JSON objects
//! keyed by column name.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A query result row rendered for JSON output, in column order
pub type Record = serde_json::Map<String, serde_json::Value>;

/// SQL value type that can hold any database value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// SQL NULL
    Null,
    /// Boolean value (BIT)
    Bool(bool),
    /// 16-bit signed integer (TINYINT, SMALLINT)
    Int16(i16),
    /// 32-bit signed integer (INT)
    Int32(i32),
    /// 64-bit signed integer (BIGINT)
    Int64(i64),
    /// 32-bit floating point (REAL)
    Float32(f32),
    /// 64-bit floating point (FLOAT)
    Float64(f64),
    /// Arbitrary precision decimal (NUMERIC, DECIMAL, MONEY)
    Decimal(Decimal),
    /// Text string (VARCHAR, NVARCHAR, CHAR)
    String(String),
    /// Binary data (VARBINARY)
    Bytes(Vec<u8>),
    /// Date without time (DATE)
    Date(NaiveDate),
    /// Time without date (TIME)
    Time(NaiveTime),
    /// Timestamp without timezone (DATETIME2)
    DateTime(NaiveDateTime),
    /// Timestamp with timezone (DATETIMEOFFSET)
    DateTimeTz(DateTime<Utc>),
    /// UNIQUEIDENTIFIER
    Uuid(Uuid),
}

impl Value {
    /// Text rendering of the value, `None` for NULL
    pub fn to_text(&self) -> Option<String> {
        match self {
            Self::Null => None,
            Self::Bool(b) => Some(if *b { "True" } else { "False" }.to_string()),
            Self::Int16(n) => Some(n.to_string()),
            Self::Int32(n) => Some(n.to_string()),
            Self::Int64(n) => Some(n.to_string()),
            Self::Float32(n) => Some(n.to_string()),
            Self::Float64(n) => Some(n.to_string()),
            Self::Decimal(d) => Some(d.to_string()),
            Self::String(s) => Some(s.clone()),
            Self::Bytes(b) => Some(String::from_utf8_lossy(b).into_owned()),
            Self::Date(d) => Some(d.format("%Y-%m-%d").to_string()),
            Self::Time(t) => Some(t.format("%H:%M:%S%.f").to_string()),
            Self::DateTime(dt) => Some(dt.format("%Y-%m-%dT%H:%M:%S%.f").to_string()),
            Self::DateTimeTz(dt) => Some(dt.to_rfc3339()),
            Self::Uuid(u) => Some(u.to_string()),
        }
    }

    /// Convert to a JSON value for query output
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;

        match self {
            Self::Null => Json::Null,
            Self::Bool(b) => Json::Bool(*b),
            Self::Int16(n) => Json::from(*n),
            Self::Int32(n) => Json::from(*n),
            Self::Int64(n) => Json::from(*n),
            Self::Float32(n) => float_to_json(f64::from(*n)),
            Self::Float64(n) => float_to_json(*n),
            Self::Decimal(d) => d.to_f64().map_or(Json::Null, float_to_json),
            other => other.to_text().map_or(Json::Null, Json::String),
        }
    }
}

/// Non-finite floats have no JSON representation and map to `null`
fn float_to_json(n: f64) -> serde_json::Value {
    serde_json::Number::from_f64(n).map_or(serde_json::Value::Null, serde_json::Value::Number)
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float64(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_owned())
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Self::Date(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => Self::Null,
        }
    }
}

/// Database row as ordered column values
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Vec<String>,
    values: Vec<Value>,
}

impl Row {
    /// Create a new row
    pub fn new(columns: Vec<String>, values: Vec<Value>) -> Self {
        debug_assert_eq!(columns.len(), values.len());
        Self { columns, values }
    }

    /// Convert to a JSON record keyed by column name, in column order.
    ///
    /// Duplicate column names keep the last value, as a mapping would.
    pub fn into_record(self) -> Record {
        self.columns
            .into_iter()
            .zip(self.values.iter().map(Value::to_json))
            .collect()
    }
}
