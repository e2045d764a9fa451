//! Row batches: the rows selected from a source during one sync cycle.

use crate::schema::{Column, Schema};
use crate::types::ColumnType;
use crate::values::Value;
use thiserror::Error;

/// Errors raised while assembling a batch.
#[derive(Error, Debug, PartialEq)]
pub enum BatchError {
    /// The primary-key column is not part of the schema.
    #[error("primary key column '{0}' is not in the schema")]
    MissingPrimaryKey(String),

    /// A row does not have one value per schema column.
    #[error("row has {actual} values but the schema has {expected} columns")]
    WidthMismatch { expected: usize, actual: usize },

    /// The primary-key value is null or not an integer.
    #[error("primary key column '{column}' holds a non-integer value: {value:?}")]
    NonIntegerKey { column: String, value: Value },

    /// A batch column has no counterpart in the target schema.
    #[error("column '{0}' does not exist in the target schema")]
    UnknownColumn(String),

    /// The target schema gives the primary key a non-integer type.
    #[error("primary key column '{column}' is {target} in the target schema")]
    KeyType { column: String, target: ColumnType },

    /// A value cannot take its column's target type without loss.
    #[error("column '{column}' cannot hold {value:?} as {target}")]
    Incompatible {
        column: String,
        value: Value,
        target: ColumnType,
    },
}

/// One record, values in schema order.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub values: Vec<Value>,
}

impl Row {
    /// Create a row from its values.
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    /// Get the value at `index`.
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }
}

/// Ordered rows sharing one schema, with one integer primary-key column.
///
/// Every row pushed into a batch carries a non-null integer primary key, so
/// the next watermark can always be derived from the batch alone.
#[derive(Debug, Clone, PartialEq)]
pub struct RowBatch {
    schema: Schema,
    primary_key: usize,
    rows: Vec<Row>,
}

impl RowBatch {
    /// Create an empty batch whose primary key is the column named `primary_key`.
    pub fn new(schema: Schema, primary_key: &str) -> Result<Self, BatchError> {
        let index = schema
            .index_of(primary_key)
            .ok_or_else(|| BatchError::MissingPrimaryKey(primary_key.to_string()))?;
        Ok(Self {
            schema,
            primary_key: index,
            rows: Vec::new(),
        })
    }

    /// Append a row, validating its width and primary key.
    pub fn push(&mut self, row: Row) -> Result<(), BatchError> {
        if row.values.len() != self.schema.len() {
            return Err(BatchError::WidthMismatch {
                expected: self.schema.len(),
                actual: row.values.len(),
            });
        }
        let key = &row.values[self.primary_key];
        if key.as_i64().is_none() {
            return Err(BatchError::NonIntegerKey {
                column: self.primary_key_name().to_string(),
                value: key.clone(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    /// The batch schema.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Name of the primary-key column.
    pub fn primary_key_name(&self) -> &str {
        &self.schema.columns[self.primary_key].name
    }

    /// Position of the primary-key column in the schema.
    pub fn primary_key_index(&self) -> usize {
        self.primary_key
    }

    /// All rows in read order.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Primary-key values in read order.
    pub fn primary_keys(&self) -> impl Iterator<Item = i64> + '_ {
        self.rows
            .iter()
            .filter_map(move |row| row.values[self.primary_key].as_i64())
    }

    /// Largest primary key in the batch, `None` when the batch is empty.
    pub fn max_primary_key(&self) -> Option<i64> {
        self.primary_keys().max()
    }

    /// Split the rows into slices of at most `size` rows.
    pub fn chunks(&self, size: usize) -> std::slice::Chunks<'_, Row> {
        self.rows.chunks(size.max(1))
    }

    /// Copy of this batch with every value coerced to the type its column
    /// has in `target`.
    ///
    /// Columns are matched by name and keep this batch's order. Used to fit
    /// a batch into a destination table created from an earlier batch.
    pub fn conform_to(&self, target: &Schema) -> Result<RowBatch, BatchError> {
        let types = self
            .schema
            .columns
            .iter()
            .map(|c| {
                target
                    .get(&c.name)
                    .map(|t| t.column_type)
                    .ok_or_else(|| BatchError::UnknownColumn(c.name.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;

        if types[self.primary_key] != ColumnType::Int {
            return Err(BatchError::KeyType {
                column: self.primary_key_name().to_string(),
                target: types[self.primary_key],
            });
        }

        let mut rows = Vec::with_capacity(self.rows.len());
        for row in &self.rows {
            let mut values = Vec::with_capacity(types.len());
            for ((value, column), target) in row.values.iter().zip(&self.schema.columns).zip(&types)
            {
                let coerced =
                    value
                        .clone()
                        .coerce(*target)
                        .ok_or_else(|| BatchError::Incompatible {
                            column: column.name.clone(),
                            value: value.clone(),
                            target: *target,
                        })?;
                values.push(coerced);
            }
            rows.push(Row::new(values));
        }

        let schema = Schema::new(
            self.schema
                .columns
                .iter()
                .zip(&types)
                .map(|(c, t)| Column::new(c.name.clone(), *t))
                .collect(),
        );
        Ok(Self {
            schema,
            primary_key: self.primary_key,
            rows,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch() -> RowBatch {
        let schema = Schema::new(vec![
            Column::new("z_pk", ColumnType::Int),
            Column::new("zstreamname", ColumnType::Text),
        ]);
        RowBatch::new(schema, "z_pk").unwrap()
    }

    #[test]
    fn test_missing_primary_key_column() {
        let schema = Schema::new(vec![Column::new("id", ColumnType::Int)]);
        let err = RowBatch::new(schema, "Z_PK").unwrap_err();
        assert_eq!(err, BatchError::MissingPrimaryKey("Z_PK".into()));
    }

    #[test]
    fn test_max_primary_key_ignores_order() {
        let mut b = batch();
        for key in [3, 7, 5] {
            b.push(Row::new(vec![Value::Int(key), Value::from("/app/usage")]))
                .unwrap();
        }
        assert_eq!(b.len(), 3);
        assert_eq!(b.max_primary_key(), Some(7));
        assert_eq!(b.primary_keys().collect::<Vec<_>>(), vec![3, 7, 5]);
    }

    #[test]
    fn test_empty_batch_has_no_max() {
        let b = batch();
        assert!(b.is_empty());
        assert_eq!(b.max_primary_key(), None);
    }

    #[test]
    fn test_rejects_null_key() {
        let mut b = batch();
        let err = b
            .push(Row::new(vec![Value::Null, Value::from("/app/usage")]))
            .unwrap_err();
        assert!(matches!(err, BatchError::NonIntegerKey { .. }));
        assert!(b.is_empty());
    }

    #[test]
    fn test_rejects_wrong_width() {
        let mut b = batch();
        let err = b.push(Row::new(vec![Value::Int(1)])).unwrap_err();
        assert_eq!(
            err,
            BatchError::WidthMismatch {
                expected: 2,
                actual: 1
            }
        );
    }

    #[test]
    fn test_chunks() {
        let mut b = batch();
        for key in 1..=5 {
            b.push(Row::new(vec![Value::Int(key), Value::Null])).unwrap();
        }
        let sizes: Vec<usize> = b.chunks(2).map(|c| c.len()).collect();
        assert_eq!(sizes, vec![2, 2, 1]);
        // zero is clamped rather than panicking
        assert_eq!(b.chunks(0).count(), 5);
    }

    fn durations(values: &[Value]) -> RowBatch {
        let schema = Schema::new(vec![
            Column::new("id", ColumnType::Int),
            Column::new("duration", values[0].column_type().unwrap_or(ColumnType::Text)),
        ]);
        let mut b = RowBatch::new(schema, "id").unwrap();
        for (key, value) in values.iter().enumerate() {
            b.push(Row::new(vec![Value::Int(key as i64 + 1), value.clone()]))
                .unwrap();
        }
        b
    }

    fn target(duration: ColumnType) -> Schema {
        Schema::new(vec![
            Column::new("duration", duration),
            Column::new("id", ColumnType::Int),
        ])
    }

    #[test]
    fn test_conform_widens_integers_to_float_column() {
        let b = durations(&[Value::Int(0), Value::Int(3)]);
        let conformed = b.conform_to(&target(ColumnType::Float)).unwrap();

        assert_eq!(conformed.schema().column_names(), vec!["id", "duration"]);
        assert_eq!(conformed.schema().columns[1].column_type, ColumnType::Float);
        assert_eq!(conformed.rows()[1].get(1), Some(&Value::Float(3.0)));
        assert_eq!(conformed.max_primary_key(), Some(2));
    }

    #[test]
    fn test_conform_rejects_lossy_values() {
        let b = durations(&[Value::Float(1.25)]);
        let err = b.conform_to(&target(ColumnType::Int)).unwrap_err();
        assert_eq!(
            err,
            BatchError::Incompatible {
                column: "duration".into(),
                value: Value::Float(1.25),
                target: ColumnType::Int,
            }
        );
    }

    #[test]
    fn test_conform_requires_every_column() {
        let b = durations(&[Value::Int(1)]);
        let only_id = Schema::new(vec![Column::new("id", ColumnType::Int)]);
        assert_eq!(
            b.conform_to(&only_id).unwrap_err(),
            BatchError::UnknownColumn("duration".into())
        );
    }

    #[test]
    fn test_conform_keeps_integer_key() {
        let b = durations(&[Value::Int(1)]);
        let float_key = Schema::new(vec![
            Column::new("id", ColumnType::Float),
            Column::new("duration", ColumnType::Int),
        ]);
        assert!(matches!(
            b.conform_to(&float_key),
            Err(BatchError::KeyType { .. })
        ));
    }
}
