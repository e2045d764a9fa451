//! Value representation for rows moving through a sync cycle.

use crate::types::ColumnType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single cell value.
///
/// Sources produce `Value`s already canonicalized (timestamps are absolute
/// UTC instants), so sinks never special-case source encodings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Null value
    Null,

    /// Boolean value
    Bool(bool),

    /// 64-bit signed integer
    Int(i64),

    /// 64-bit floating point
    Float(f64),

    /// Text value
    Text(String),

    /// Binary data
    Bytes(Vec<u8>),

    /// Absolute timestamp
    Timestamp(DateTime<Utc>),
}

impl Value {
    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// The column type this value naturally belongs to, `None` for null.
    pub fn column_type(&self) -> Option<ColumnType> {
        match self {
            Self::Null => None,
            Self::Bool(_) => Some(ColumnType::Bool),
            Self::Int(_) => Some(ColumnType::Int),
            Self::Float(_) => Some(ColumnType::Float),
            Self::Text(_) => Some(ColumnType::Text),
            Self::Bytes(_) => Some(ColumnType::Bytes),
            Self::Timestamp(_) => Some(ColumnType::Timestamp),
        }
    }

    /// Try to get this value as an i64.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Try to get this value as an f64.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Try to get this value as a string reference.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get this value as a timestamp.
    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }

    /// Coerce this value into `target` without losing information.
    ///
    /// Returns `None` when the conversion would be lossy or makes no sense
    /// (e.g. text that is not a number into `Int`). Nulls coerce to any type.
    /// Timestamps are never produced here: they need an explicit encoding.
    pub fn coerce(self, target: ColumnType) -> Option<Value> {
        if self.column_type() == Some(target) || self.is_null() {
            return Some(self);
        }
        match (self, target) {
            (Self::Int(i), ColumnType::Float) => Some(Self::Float(i as f64)),
            (Self::Int(i), ColumnType::Text) => Some(Self::Text(i.to_string())),
            (Self::Int(i), ColumnType::Bool) => match i {
                0 => Some(Self::Bool(false)),
                1 => Some(Self::Bool(true)),
                _ => None,
            },
            (Self::Float(f), ColumnType::Int) => {
                if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
                    Some(Self::Int(f as i64))
                } else {
                    None
                }
            }
            (Self::Float(f), ColumnType::Text) => Some(Self::Text(f.to_string())),
            (Self::Text(s), ColumnType::Int) => s.trim().parse().ok().map(Self::Int),
            (Self::Text(s), ColumnType::Float) => s.trim().parse().ok().map(Self::Float),
            (Self::Text(s), ColumnType::Bytes) => Some(Self::Bytes(s.into_bytes())),
            (Self::Bytes(b), ColumnType::Text) => String::from_utf8(b).ok().map(Self::Text),
            (Self::Bool(b), ColumnType::Int) => Some(Self::Int(i64::from(b))),
            _ => None,
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Timestamp(value)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Self::Null)
    }
}
