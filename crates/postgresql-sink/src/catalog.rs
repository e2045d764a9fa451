//! Destination table definitions read back from `information_schema`.
//!
//! A destination table is created from the first batch written to it. Later
//! batches can resolve some columns differently (an untyped SQLite column
//! holding only whole numbers in one batch and fractions in the next), so
//! every batch is fitted to the types the table actually has before binding.

use sync_core::{Column, ColumnType, Schema};
use tokio_postgres::GenericClient;

/// sync-core type bound for an `information_schema.columns.data_type`.
///
/// Only types whose Rust parameter type binds directly are mapped; `integer`
/// or `real` columns do not accept `i64` / `f64` parameters.
pub fn column_type_of(data_type: &str) -> Option<ColumnType> {
    match data_type {
        "boolean" => Some(ColumnType::Bool),
        "bigint" => Some(ColumnType::Int),
        "double precision" => Some(ColumnType::Float),
        "text" | "character varying" | "character" => Some(ColumnType::Text),
        "bytea" => Some(ColumnType::Bytes),
        "timestamp with time zone" => Some(ColumnType::Timestamp),
        _ => None,
    }
}

/// Columns of `table` in the current schema, in table order.
///
/// Columns of unmapped types are left out.
pub async fn table_schema<C>(client: &C, table: &str) -> Result<Schema, tokio_postgres::Error>
where
    C: GenericClient + Sync,
{
    let rows = client
        .query(
            "SELECT column_name::text, data_type::text FROM information_schema.columns \
             WHERE table_schema = current_schema() AND table_name = $1 \
             ORDER BY ordinal_position",
            &[&table],
        )
        .await?;

    Ok(Schema::new(
        rows.iter()
            .filter_map(|row| {
                let name: String = row.get(0);
                let data_type: String = row.get(1);
                column_type_of(&data_type).map(|t| Column::new(name, t))
            })
            .collect(),
    ))
}

/// Schema to write `batch` with: the table's type where the table has the
/// column, the batch's own type otherwise.
pub fn write_schema(batch: &Schema, table: &Schema) -> Schema {
    Schema::new(
        batch
            .columns
            .iter()
            .map(|c| {
                let column_type = table.get(&c.name).map_or(c.column_type, |t| t.column_type);
                Column::new(c.name.clone(), column_type)
            })
            .collect(),
    )
}
