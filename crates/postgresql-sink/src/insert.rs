//! Batched INSERT logic.

use chrono::{DateTime, Utc};
use sync_core::{ColumnType, Row, RowBatch, Schema, Value};
use tokio_postgres::types::ToSql;
use tokio_postgres::GenericClient;
use tracing::debug;

use crate::ddl::quote_ident;

/// Default number of rows per INSERT statement.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Bind parameters PostgreSQL accepts in one statement.
pub const MAX_BIND_PARAMETERS: usize = 65_535;

/// Rows per statement for a table of `column_count` columns.
///
/// Honors `batch_size` but never exceeds the bind parameter limit, and is
/// always at least one.
pub fn rows_per_statement(column_count: usize, batch_size: usize) -> usize {
    let by_params = MAX_BIND_PARAMETERS / column_count.max(1);
    batch_size.min(by_params).max(1)
}

/// Multi-row INSERT with `$n` placeholders.
///
/// With `conflict_key`, rows whose key already exists are skipped.
pub fn generate_insert(
    table: &str,
    schema: &Schema,
    row_count: usize,
    conflict_key: Option<&str>,
) -> String {
    let col_count = schema.len();
    let mut placeholders: Vec<String> = Vec::with_capacity(row_count);
    let mut param_idx = 1;

    for _ in 0..row_count {
        let row_placeholders: Vec<String> = (0..col_count)
            .map(|_| {
                let p = format!("${param_idx}");
                param_idx += 1;
                p
            })
            .collect();
        placeholders.push(format!("({})", row_placeholders.join(", ")));
    }

    let mut sql = format!(
        "INSERT INTO {} ({}) VALUES {}",
        quote_ident(table),
        schema
            .columns
            .iter()
            .map(|c| quote_ident(&c.name))
            .collect::<Vec<_>>()
            .join(", "),
        placeholders.join(", ")
    );
    if let Some(key) = conflict_key {
        sql.push_str(&format!(" ON CONFLICT ({}) DO NOTHING", quote_ident(key)));
    }
    sql
}

/// Convert a value to a boxed ToSql trait object.
///
/// Nulls are typed after their column so the server can infer the
/// parameter type.
pub fn value_to_boxed(value: &Value, column_type: ColumnType) -> Box<dyn ToSql + Sync + Send> {
    match value {
        Value::Null => match column_type {
            ColumnType::Bool => Box::new(None::<bool>),
            ColumnType::Int => Box::new(None::<i64>),
            ColumnType::Float => Box::new(None::<f64>),
            ColumnType::Text => Box::new(None::<String>),
            ColumnType::Bytes => Box::new(None::<Vec<u8>>),
            ColumnType::Timestamp => Box::new(None::<DateTime<Utc>>),
        },
        Value::Bool(b) => Box::new(*b),
        Value::Int(i) => Box::new(*i),
        Value::Float(f) => Box::new(*f),
        Value::Text(s) => Box::new(s.clone()),
        Value::Bytes(b) => Box::new(b.clone()),
        Value::Timestamp(ts) => Box::new(*ts),
    }
}

/// Insert one chunk of rows with a single statement.
async fn insert_chunk<C>(
    client: &C,
    table: &str,
    schema: &Schema,
    rows: &[Row],
    conflict_key: Option<&str>,
) -> Result<u64, tokio_postgres::Error>
where
    C: GenericClient + Sync,
{
    if rows.is_empty() {
        return Ok(0);
    }

    let sql = generate_insert(table, schema, rows.len(), conflict_key);

    let mut params: Vec<Box<dyn ToSql + Sync + Send>> =
        Vec::with_capacity(rows.len() * schema.len());
    for row in rows {
        for (value, column) in row.values.iter().zip(&schema.columns) {
            params.push(value_to_boxed(value, column.column_type));
        }
    }

    let param_refs: Vec<&(dyn ToSql + Sync)> = params
        .iter()
        .map(|p| p.as_ref() as &(dyn ToSql + Sync))
        .collect();

    client.execute(&sql, &param_refs).await
}

/// Insert every row of `batch` into `table`, `batch_size` rows at a time.
///
/// Returns the number of rows the server reports as inserted, which excludes
/// rows skipped by `ON CONFLICT DO NOTHING` when `dedupe` is set.
pub async fn insert_batch<C>(
    client: &C,
    table: &str,
    batch: &RowBatch,
    batch_size: usize,
    dedupe: bool,
) -> Result<u64, tokio_postgres::Error>
where
    C: GenericClient + Sync,
{
    let schema = batch.schema();
    let conflict_key = dedupe.then(|| batch.primary_key_name());
    let chunk_size = rows_per_statement(schema.len(), batch_size);

    let mut written = 0;
    for chunk in batch.chunks(chunk_size) {
        written += insert_chunk(client, table, schema, chunk, conflict_key).await?;
        debug!("Inserted chunk of {} rows into {}", chunk.len(), table);
    }
    Ok(written)
}
