//! Column type resolution from SQLite declared types.
//!
//! SQLite only records a declared type per column and applies "type
//! affinity" rules to it. Declarations with a clear affinity map straight to
//! a `ColumnType`. NUMERIC affinity (DECIMAL, NUMERIC, DATE, ...) stores
//! whole numbers as integers, so its numbers always resolve to `Float`.
//! Columns without a declared type are resolved from the storage classes
//! actually present in the batch.

use rusqlite::types::Value as SqliteValue;
use sync_core::ColumnType;

/// Type decision for one column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Affinity {
    /// The declaration fixes the type.
    Fixed(ColumnType),
    /// NUMERIC affinity: `Float` unless the column holds text or blobs.
    Numeric,
    /// No declared type: decide from the values read.
    Infer,
}

/// Apply SQLite's affinity rules (section 3.1 of the datatype docs) to a
/// declared column type.
pub fn affinity_of(declared: Option<&str>) -> Affinity {
    let declared = declared.unwrap_or("").trim().to_ascii_uppercase();

    if declared.is_empty() {
        Affinity::Infer
    } else if declared.contains("BOOL") {
        Affinity::Fixed(ColumnType::Bool)
    } else if declared.contains("INT") {
        Affinity::Fixed(ColumnType::Int)
    } else if declared.contains("CHAR") || declared.contains("CLOB") || declared.contains("TEXT")
    {
        Affinity::Fixed(ColumnType::Text)
    } else if declared.contains("BLOB") {
        Affinity::Fixed(ColumnType::Bytes)
    } else if declared.contains("REAL") || declared.contains("FLOA") || declared.contains("DOUB")
    {
        Affinity::Fixed(ColumnType::Float)
    } else {
        Affinity::Numeric
    }
}

/// Pick the narrowest type that holds every non-null value of a column.
///
/// Integers widen to floats, anything mixed with text becomes text, and a
/// column of nothing but nulls is text.
pub fn infer_from_values<'a, I>(values: I) -> ColumnType
where
    I: IntoIterator<Item = &'a SqliteValue>,
{
    widest(values).unwrap_or(ColumnType::Text)
}

/// Type of a NUMERIC-affinity column.
///
/// Numbers and all-null columns are `Float` whatever mix of integers and
/// reals the batch holds; text or blobs fall back to [`infer_from_values`].
pub fn infer_numeric<'a, I>(values: I) -> ColumnType
where
    I: IntoIterator<Item = &'a SqliteValue>,
{
    match widest(values) {
        None | Some(ColumnType::Int) | Some(ColumnType::Float) => ColumnType::Float,
        Some(other) => other,
    }
}

fn widest<'a, I>(values: I) -> Option<ColumnType>
where
    I: IntoIterator<Item = &'a SqliteValue>,
{
    let mut seen: Option<ColumnType> = None;
    for value in values {
        let this = match value {
            SqliteValue::Null => continue,
            SqliteValue::Integer(_) => ColumnType::Int,
            SqliteValue::Real(_) => ColumnType::Float,
            SqliteValue::Text(_) => ColumnType::Text,
            SqliteValue::Blob(_) => ColumnType::Bytes,
        };
        seen = Some(match (seen, this) {
            (None, t) => t,
            (Some(a), b) if a == b => a,
            (Some(ColumnType::Int), ColumnType::Float)
            | (Some(ColumnType::Float), ColumnType::Int) => ColumnType::Float,
            _ => ColumnType::Text,
        });
    }
    seen
}
