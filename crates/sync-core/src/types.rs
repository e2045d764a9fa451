//! Semantic column types.
//!
//! Sources map their native storage classes to a `ColumnType` when a batch is
//! read; destinations derive their DDL and bind types from it.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Semantic type of a column.
///
/// The set is intentionally small: it covers what append-only SQLite
/// exports actually contain once timestamps have been canonicalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    /// Boolean value
    Bool,

    /// 64-bit signed integer
    Int,

    /// 64-bit IEEE 754 floating point
    Float,

    /// UTF-8 text
    Text,

    /// Raw bytes
    Bytes,

    /// Absolute point in time (UTC)
    Timestamp,
}

impl ColumnType {
    /// Stable lowercase name, used in logs and error messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Bool => "bool",
            ColumnType::Int => "int",
            ColumnType::Float => "float",
            ColumnType::Text => "text",
            ColumnType::Bytes => "bytes",
            ColumnType::Timestamp => "timestamp",
        }
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
