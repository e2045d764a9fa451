//! PostgreSQL DDL generation from batch schemas.

use sync_core::{ColumnType, Schema};

/// Quote an identifier for PostgreSQL.
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// PostgreSQL column type for a sync-core column type.
pub fn column_ddl(column_type: ColumnType) -> &'static str {
    match column_type {
        ColumnType::Bool => "BOOLEAN",
        ColumnType::Int => "BIGINT",
        ColumnType::Float => "DOUBLE PRECISION",
        ColumnType::Text => "TEXT",
        ColumnType::Bytes => "BYTEA",
        ColumnType::Timestamp => "TIMESTAMPTZ",
    }
}

/// `CREATE TABLE IF NOT EXISTS` for a destination table shaped like `schema`.
///
/// No constraints are declared: without dedupe the table is append-only and
/// may legitimately hold the same key twice.
pub fn generate_create_table(table: &str, schema: &Schema) -> String {
    let columns = schema
        .columns
        .iter()
        .map(|c| format!("{} {}", quote_ident(&c.name), column_ddl(c.column_type)))
        .collect::<Vec<_>>()
        .join(", ");
    format!("CREATE TABLE IF NOT EXISTS {} ({columns})", quote_ident(table))
}

/// Unique index backing `ON CONFLICT DO NOTHING` when dedupe is enabled.
pub fn generate_unique_index(table: &str, primary_key: &str) -> String {
    format!(
        "CREATE UNIQUE INDEX IF NOT EXISTS {} ON {} ({})",
        quote_ident(&format!("{table}_{primary_key}_key")),
        quote_ident(table),
        quote_ident(primary_key)
    )
}

/// Append-only watermark history table.
pub fn generate_watermark_table(table: &str) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {} (\
         id BIGSERIAL PRIMARY KEY, \
         dataset_name TEXT NOT NULL, \
         last_row BIGINT NOT NULL, \
         synced_at TIMESTAMPTZ NOT NULL DEFAULT now())",
        quote_ident(table)
    )
}

/// Index serving the per-dataset MAX lookup.
pub fn generate_watermark_index(table: &str) -> String {
    format!(
        "CREATE INDEX IF NOT EXISTS {} ON {} (dataset_name, last_row)",
        quote_ident(&format!("{table}_dataset_idx")),
        quote_ident(table)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use sync_core::Column;

    #[test]
    fn test_column_ddl() {
        assert_eq!(column_ddl(ColumnType::Int), "BIGINT");
        assert_eq!(column_ddl(ColumnType::Float), "DOUBLE PRECISION");
        assert_eq!(column_ddl(ColumnType::Timestamp), "TIMESTAMPTZ");
        assert_eq!(column_ddl(ColumnType::Bytes), "BYTEA");
    }

    #[test]
    fn test_create_table() {
        let schema = Schema::new(vec![
            Column::new("z_pk", ColumnType::Int),
            Column::new("zstreamname", ColumnType::Text),
            Column::new("zstartdate", ColumnType::Timestamp),
        ]);
        assert_eq!(
            generate_create_table("apple_screentime", &schema),
            "CREATE TABLE IF NOT EXISTS \"apple_screentime\" \
             (\"z_pk\" BIGINT, \"zstreamname\" TEXT, \"zstartdate\" TIMESTAMPTZ)"
        );
    }

    #[test]
    fn test_unique_index() {
        assert_eq!(
            generate_unique_index("eventmodel", "id"),
            "CREATE UNIQUE INDEX IF NOT EXISTS \"eventmodel_id_key\" ON \"eventmodel\" (\"id\")"
        );
    }

    #[test]
    fn test_watermark_table() {
        let ddl = generate_watermark_table("screen_thyme_watermarks");
        assert!(ddl.starts_with("CREATE TABLE IF NOT EXISTS \"screen_thyme_watermarks\" ("));
        assert!(ddl.contains("last_row BIGINT NOT NULL"));
        assert!(ddl.contains("synced_at TIMESTAMPTZ NOT NULL"));
    }

    #[test]
    fn test_quote_ident() {
        assert_eq!(quote_ident("we\"ird"), "\"we\"\"ird\"");
    }
}
