//! Schema of a row batch: ordered `(name, ColumnType)` pairs.

use crate::types::ColumnType;
use serde::{Deserialize, Serialize};

/// A single column in a batch schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// Column name as written to the destination
    pub name: String,

    /// Column type
    #[serde(rename = "type")]
    pub column_type: ColumnType,
}

impl Column {
    /// Create a new column.
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
        }
    }
}

/// Ordered list of columns, determined when a batch is read.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    /// Columns in row order
    pub columns: Vec<Column>,
}

impl Schema {
    /// Create a schema from a list of columns.
    pub fn new(columns: Vec<Column>) -> Self {
        Self { columns }
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Whether the schema has no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Position of the column named `name`.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Get a column by name.
    pub fn get(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// All column names, in order.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn events_schema() -> Schema {
        Schema::new(vec![
            Column::new("id", ColumnType::Int),
            Column::new("bucket_id", ColumnType::Int),
            Column::new("timestamp", ColumnType::Timestamp),
            Column::new("datastr", ColumnType::Text),
        ])
    }

    #[test]
    fn test_index_of() {
        let schema = events_schema();
        assert_eq!(schema.index_of("id"), Some(0));
        assert_eq!(schema.index_of("datastr"), Some(3));
        assert_eq!(schema.index_of("missing"), None);
    }

    #[test]
    fn test_column_names_keep_order() {
        let schema = events_schema();
        assert_eq!(
            schema.column_names(),
            vec!["id", "bucket_id", "timestamp", "datastr"]
        );
        assert_eq!(schema.len(), 4);
        assert!(!schema.is_empty());
    }

    #[test]
    fn test_get_column_type() {
        let schema = events_schema();
        assert_eq!(
            schema.get("timestamp").map(|c| c.column_type),
            Some(ColumnType::Timestamp)
        );
    }
}
