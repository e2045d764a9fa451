//! SQLite value conversion.
//!
//! Turns rusqlite's storage-class values into sync-core `Value`s, and
//! canonicalizes source-specific timestamp encodings into absolute UTC
//! instants before a batch leaves the reader.

use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::types::{Value as SqliteValue, ValueRef};
use sync_core::{ColumnType, TimestampEncoding, Value};

/// Seconds between the Unix epoch and 2001-01-01T00:00:00Z, the Core Data
/// (NSDate) reference date used by Apple's knowledgeC.db.
pub const CORE_DATA_EPOCH_OFFSET_SECS: i64 = 978_307_200;

/// Offset-carrying text layouts seen in SQLite exports, tried after RFC 3339.
const ZONED_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
];

/// Naive layouts, read as UTC.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
];

/// Map a storage-class value to a sync-core value without any coercion.
pub fn from_sqlite(value: SqliteValue) -> Value {
    match value {
        SqliteValue::Null => Value::Null,
        SqliteValue::Integer(i) => Value::Int(i),
        SqliteValue::Real(f) => Value::Float(f),
        SqliteValue::Text(s) => Value::Text(s),
        SqliteValue::Blob(b) => Value::Bytes(b),
    }
}

/// Copy a borrowed cell out of a row.
///
/// SQLite does not enforce that TEXT is valid UTF-8; invalid sequences are
/// replaced with U+FFFD instead of failing the whole read.
pub fn owned_value(value: ValueRef<'_>) -> SqliteValue {
    match value {
        ValueRef::Text(bytes) => SqliteValue::Text(String::from_utf8_lossy(bytes).into_owned()),
        other => other.into(),
    }
}

/// Convert `value` into a value of `column_type`.
///
/// `encoding` is required for `Timestamp` columns. Errors carry a short
/// human-readable reason.
pub fn convert_value(
    value: SqliteValue,
    column_type: ColumnType,
    encoding: Option<TimestampEncoding>,
) -> Result<Value, String> {
    let value = from_sqlite(value);
    if value.is_null() {
        return Ok(Value::Null);
    }

    if column_type == ColumnType::Timestamp {
        let encoding = encoding.ok_or("timestamp column has no encoding")?;
        return decode_timestamp(&value, encoding).map(Value::Timestamp);
    }

    let shown = format!("{value:?}");
    value
        .coerce(column_type)
        .ok_or_else(|| format!("cannot represent {shown} as {column_type}"))
}

/// Decode a timestamp stored with `encoding`.
pub fn decode_timestamp(
    value: &Value,
    encoding: TimestampEncoding,
) -> Result<DateTime<Utc>, String> {
    match encoding {
        TimestampEncoding::CoreData => {
            let micros = to_micros(numeric(value)?, 1_000_000.0)?;
            from_micros(micros + CORE_DATA_EPOCH_OFFSET_SECS * 1_000_000)
        }
        TimestampEncoding::UnixSeconds => from_micros(to_micros(numeric(value)?, 1_000_000.0)?),
        TimestampEncoding::UnixMillis => from_micros(to_micros(numeric(value)?, 1_000.0)?),
        TimestampEncoding::Iso8601 => match value {
            Value::Text(s) => parse_text_timestamp(s),
            other => Err(format!("expected timestamp text, got {other:?}")),
        },
    }
}

/// Parse an ISO 8601 style timestamp. Naive values are read as UTC.
pub fn parse_text_timestamp(s: &str) -> Result<DateTime<Utc>, String> {
    let s = s.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Ok(ts.with_timezone(&Utc));
    }
    for format in ZONED_FORMATS {
        if let Ok(ts) = DateTime::parse_from_str(s, format) {
            return Ok(ts.with_timezone(&Utc));
        }
    }
    for format in NAIVE_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(s, format) {
            return Ok(ts.and_utc());
        }
    }
    Err(format!("unrecognized timestamp text '{s}'"))
}

fn numeric(value: &Value) -> Result<f64, String> {
    match value {
        Value::Int(i) => Ok(*i as f64),
        Value::Float(f) => Ok(*f),
        Value::Text(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| format!("expected a numeric timestamp, got '{s}'")),
        other => Err(format!("expected a numeric timestamp, got {other:?}")),
    }
}

fn to_micros(amount: f64, micros_per_unit: f64) -> Result<i64, String> {
    let micros = (amount * micros_per_unit).round();
    if !micros.is_finite() || micros.abs() >= i64::MAX as f64 {
        return Err(format!("timestamp {amount} is out of range"));
    }
    Ok(micros as i64)
}

fn from_micros(micros: i64) -> Result<DateTime<Utc>, String> {
    let secs = micros.div_euclid(1_000_000);
    let nanos = (micros.rem_euclid(1_000_000) * 1_000) as u32;
    DateTime::from_timestamp(secs, nanos)
        .ok_or_else(|| format!("timestamp {micros}us is out of range"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_core_data_reference_date() {
        let ts = decode_timestamp(&Value::Int(0), TimestampEncoding::CoreData).unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2001, 1, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_core_data_fractional_seconds() {
        let ts = decode_timestamp(&Value::Float(694_224_000.5), TimestampEncoding::CoreData)
            .unwrap();
        assert_eq!(ts.to_rfc3339(), "2023-01-01T00:00:00.500+00:00");
    }

    #[test]
    fn test_core_data_numeric_text() {
        // knowledgeC exports read with all-varchar settings hand dates over as text
        let ts =
            decode_timestamp(&Value::from("725846400"), TimestampEncoding::CoreData).unwrap();
        assert_eq!(ts, Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_unix_encodings() {
        let secs = decode_timestamp(&Value::Int(1_700_000_000), TimestampEncoding::UnixSeconds)
            .unwrap();
        assert_eq!(secs, Utc.with_ymd_and_hms(2023, 11, 14, 22, 13, 20).unwrap());

        let millis =
            decode_timestamp(&Value::Int(1_700_000_000_123), TimestampEncoding::UnixMillis)
                .unwrap();
        assert_eq!(millis.timestamp_millis(), 1_700_000_000_123);
    }

    #[test]
    fn test_iso8601_variants() {
        let expected = Utc.with_ymd_and_hms(2023, 11, 14, 22, 13, 20).unwrap();
        for text in [
            "2023-11-14T22:13:20Z",
            "2023-11-14 22:13:20+00:00",
            "2023-11-15 00:13:20.000000+02:00",
            "2023-11-14 22:13:20",
            "2023-11-14T22:13:20.000",
        ] {
            assert_eq!(parse_text_timestamp(text).unwrap(), expected, "{text}");
        }
    }

    #[test]
    fn test_iso8601_rejects_garbage_and_numbers() {
        assert!(parse_text_timestamp("yesterday").is_err());
        assert!(decode_timestamp(&Value::Int(5), TimestampEncoding::Iso8601).is_err());
    }

    #[test]
    fn test_convert_value_coerces_to_column_type() {
        assert_eq!(
            convert_value(SqliteValue::Text("12".into()), ColumnType::Int, None).unwrap(),
            Value::Int(12)
        );
        assert_eq!(
            convert_value(SqliteValue::Integer(2), ColumnType::Float, None).unwrap(),
            Value::Float(2.0)
        );
        assert!(convert_value(SqliteValue::Text("x".into()), ColumnType::Int, None).is_err());
    }

    #[test]
    fn test_convert_value_null_passes_through() {
        assert_eq!(
            convert_value(
                SqliteValue::Null,
                ColumnType::Timestamp,
                Some(TimestampEncoding::CoreData)
            )
            .unwrap(),
            Value::Null
        );
    }

    #[test]
    fn test_timestamp_column_needs_encoding() {
        let err =
            convert_value(SqliteValue::Integer(1), ColumnType::Timestamp, None).unwrap_err();
        assert!(err.contains("no encoding"));
    }

    #[test]
    fn test_owned_value_replaces_invalid_utf8() {
        assert_eq!(
            owned_value(ValueRef::Text(&[0xFF, b'a'])),
            SqliteValue::Text("\u{FFFD}a".into())
        );
        assert_eq!(owned_value(ValueRef::Integer(7)), SqliteValue::Integer(7));
        assert_eq!(owned_value(ValueRef::Null), SqliteValue::Null);
    }
}
