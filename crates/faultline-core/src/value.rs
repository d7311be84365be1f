//! Canonical text for source column values.
//!
//! Connectors decode driver-native values into [`ColumnValue`] and call
//! [`ColumnValue::into_text`]. The encoder only ever sees the resulting
//! strings, so every type-specific formatting decision lives here.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";
const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M:%S%.f";

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValue {
    Null,
    Bool(bool),
    Int(i64),
    Real(f32),
    Double(f64),
    /// Exact decimal; the text keeps the source scale (`1.50` stays `1.50`).
    Numeric(Decimal),
    Text(String),
    Timestamp(NaiveDateTime),
    TimestampTz(DateTime<Utc>),
    Date(NaiveDate),
    Time(NaiveTime),
    Uuid(uuid::Uuid),
    Json(serde_json::Value),
}

impl ColumnValue {
    pub fn into_text(self) -> String {
        match self {
            ColumnValue::Null => String::new(),
            ColumnValue::Bool(b) => b.to_string(),
            ColumnValue::Int(n) => n.to_string(),
            ColumnValue::Real(x) => x.to_string(),
            ColumnValue::Double(x) => x.to_string(),
            ColumnValue::Numeric(d) => d.to_string(),
            ColumnValue::Text(s) => s,
            ColumnValue::Timestamp(ts) => ts.format(TIMESTAMP_FORMAT).to_string(),
            ColumnValue::TimestampTz(ts) => ts.naive_utc().format(TIMESTAMP_FORMAT).to_string(),
            ColumnValue::Date(d) => d.format(DATE_FORMAT).to_string(),
            ColumnValue::Time(t) => t.format(TIME_FORMAT).to_string(),
            ColumnValue::Uuid(u) => u.hyphenated().to_string(),
            ColumnValue::Json(v) => v.to_string(),
        }
    }
}
