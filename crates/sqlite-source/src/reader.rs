//! Blocking read path: column discovery, the filtered query and batch assembly.

use rusqlite::types::{Value as SqliteValue, ValueRef};
use rusqlite::Connection;
use sync_core::{Column, ColumnType, Dataset, Row, RowBatch, Schema, SyncError, SyncResult};
use tracing::{debug, warn};

use crate::affinity::{affinity_of, infer_from_values, infer_numeric, Affinity};
use crate::convert::{convert_value, owned_value};

/// A source column selected for the batch.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SelectedColumn {
    /// Name as the source table spells it
    pub source: String,
    /// Name in the batch schema / destination
    pub name: String,
    /// Declared SQLite type, if any
    pub declared: Option<String>,
}

/// Quote an identifier for use in SQL.
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Columns of `table` with their declared types, in table order.
///
/// Returns an empty list when the table does not exist.
pub fn table_columns(
    conn: &Connection,
    table: &str,
) -> rusqlite::Result<Vec<(String, Option<String>)>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", quote_ident(table)))?;
    let columns = stmt.query_map([], |row| {
        let name: String = row.get(1)?;
        let declared: Option<String> = row.get(2)?;
        Ok((name, declared.filter(|d| !d.trim().is_empty())))
    })?;
    columns.collect()
}

/// Resolve the dataset's projection against the real table columns.
pub(crate) fn select_columns(
    dataset: &Dataset,
    table_columns: &[(String, Option<String>)],
) -> SyncResult<Vec<SelectedColumn>> {
    if table_columns.is_empty() {
        return Err(SyncError::source(
            &dataset.name,
            format!("table '{}' not found", dataset.source_table),
        ));
    }

    let find = |wanted: &str| {
        table_columns
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(wanted))
    };

    let selected: Vec<SelectedColumn> = if dataset.columns.is_empty() {
        table_columns
            .iter()
            .map(|(name, declared)| SelectedColumn {
                source: name.clone(),
                name: name.clone(),
                declared: declared.clone(),
            })
            .collect()
    } else {
        dataset
            .columns
            .iter()
            .map(|mapping| {
                let (source, declared) = find(&mapping.source).ok_or_else(|| {
                    SyncError::source(
                        &dataset.name,
                        format!(
                            "column '{}' not found in table '{}'",
                            mapping.source, dataset.source_table
                        ),
                    )
                })?;
                Ok(SelectedColumn {
                    source: source.clone(),
                    name: mapping.destination_name().to_string(),
                    declared: declared.clone(),
                })
            })
            .collect::<SyncResult<_>>()?
    };

    if find(&dataset.primary_key_column).is_none() {
        return Err(SyncError::source(
            &dataset.name,
            format!(
                "primary key column '{}' not found in table '{}'",
                dataset.primary_key_column, dataset.source_table
            ),
        ));
    }

    Ok(selected)
}

/// Build the filtered, ordered SELECT for `dataset`.
pub(crate) fn build_select(dataset: &Dataset, columns: &[SelectedColumn]) -> String {
    let projection = columns
        .iter()
        .map(|c| quote_ident(&c.source))
        .collect::<Vec<_>>()
        .join(", ");
    let pk = quote_ident(&dataset.primary_key_column);
    format!(
        "SELECT {projection} FROM {} WHERE {pk} > ?1 ORDER BY {pk} ASC",
        quote_ident(&dataset.source_table)
    )
}

/// Read every row of `dataset` with primary key > `watermark`.
pub fn read_after(conn: &Connection, dataset: &Dataset, watermark: i64) -> SyncResult<RowBatch> {
    let unavailable = |e: rusqlite::Error| SyncError::source(&dataset.name, e);

    let table_columns = table_columns(conn, &dataset.source_table).map_err(unavailable)?;
    let columns = select_columns(dataset, &table_columns)?;
    let sql = build_select(dataset, &columns);
    debug!("Querying source for {}: {}", dataset.name, sql);

    let mut stmt = conn.prepare(&sql).map_err(unavailable)?;
    let mut rows = stmt.query([watermark]).map_err(unavailable)?;
    let mut raw: Vec<Vec<SqliteValue>> = Vec::new();
    while let Some(row) = rows.next().map_err(unavailable)? {
        let mut values = Vec::with_capacity(columns.len());
        for (i, column) in columns.iter().enumerate() {
            let value = row.get_ref(i).map_err(unavailable)?;
            if matches!(value, ValueRef::Text(bytes) if std::str::from_utf8(bytes).is_err()) {
                warn!(
                    "Dataset {}: column {} holds invalid UTF-8, replacing the bad bytes",
                    dataset.name, column.source
                );
            }
            values.push(owned_value(value));
        }
        raw.push(values);
    }

    let schema = Schema::new(
        columns
            .iter()
            .enumerate()
            .map(|(i, column)| {
                Column::new(column.name.clone(), resolve_type(dataset, column, &raw, i))
            })
            .collect(),
    );

    let pk_name = dataset.destination_primary_key().to_string();
    let pk_name = schema
        .columns
        .iter()
        .find(|c| c.name.eq_ignore_ascii_case(&pk_name))
        .map(|c| c.name.clone())
        .unwrap_or(pk_name);
    let mut batch =
        RowBatch::new(schema, &pk_name).map_err(|e| SyncError::source(&dataset.name, e))?;

    for values in raw {
        let mut converted = Vec::with_capacity(values.len());
        for (i, value) in values.into_iter().enumerate() {
            let column = &batch.schema().columns[i];
            let encoding = dataset.timestamp_encoding(&columns[i].source);
            let value = convert_value(value, column.column_type, encoding).map_err(|reason| {
                SyncError::Conversion {
                    dataset: dataset.name.clone(),
                    column: column.name.clone(),
                    reason,
                }
            })?;
            converted.push(value);
        }
        batch
            .push(Row::new(converted))
            .map_err(|e| SyncError::Conversion {
                dataset: dataset.name.clone(),
                column: pk_name.clone(),
                reason: e.to_string(),
            })?;
    }

    Ok(batch)
}

/// Decide the type of column `index`.
///
/// The primary key is always an integer and configured timestamp columns are
/// always timestamps; everything else follows the declared affinity.
/// Columns without a declared type are the only ones whose type can change
/// from one batch to the next.
fn resolve_type(
    dataset: &Dataset,
    column: &SelectedColumn,
    raw: &[Vec<SqliteValue>],
    index: usize,
) -> ColumnType {
    if column.source.eq_ignore_ascii_case(&dataset.primary_key_column) {
        return ColumnType::Int;
    }
    if dataset.timestamp_encoding(&column.source).is_some() {
        return ColumnType::Timestamp;
    }
    match affinity_of(column.declared.as_deref()) {
        Affinity::Fixed(column_type) => column_type,
        Affinity::Numeric => infer_numeric(raw.iter().map(|row| &row[index])),
        Affinity::Infer => infer_from_values(raw.iter().map(|row| &row[index])),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sync_core::ColumnMapping;

    fn zobject_columns() -> Vec<(String, Option<String>)> {
        vec![
            ("Z_PK".into(), Some("INTEGER".into())),
            ("ZSTREAMNAME".into(), Some("VARCHAR".into())),
            ("ZSTARTDATE".into(), Some("TIMESTAMP".into())),
        ]
    }

    fn screentime() -> Dataset {
        Dataset::new("apple_screentime", "/tmp/k.db", "ZOBJECT", "apple_screentime", "Z_PK")
    }

    #[test]
    fn test_quote_ident_escapes_quotes() {
        assert_eq!(quote_ident("Z_PK"), "\"Z_PK\"");
        assert_eq!(quote_ident("a\"b"), "\"a\"\"b\"");
    }

    #[test]
    fn test_select_all_columns() {
        let cols = select_columns(&screentime(), &zobject_columns()).unwrap();
        assert_eq!(cols.len(), 3);
        assert_eq!(cols[0].name, "Z_PK");
        assert_eq!(cols[2].declared.as_deref(), Some("TIMESTAMP"));
    }

    #[test]
    fn test_select_projection_uses_table_spelling() {
        let ds = screentime().with_columns(vec![
            ColumnMapping::renamed("z_pk", "z_pk"),
            ColumnMapping::renamed("zstartdate", "zstartdate"),
        ]);
        let cols = select_columns(&ds, &zobject_columns()).unwrap();
        assert_eq!(cols[0].source, "Z_PK");
        assert_eq!(cols[1].source, "ZSTARTDATE");
        assert_eq!(cols[1].name, "zstartdate");
    }

    #[test]
    fn test_missing_table_is_source_unavailable() {
        let err = select_columns(&screentime(), &[]).unwrap_err();
        assert!(matches!(err, SyncError::SourceUnavailable { .. }));
        assert!(err.to_string().contains("table 'ZOBJECT' not found"));
    }

    #[test]
    fn test_missing_projected_column() {
        let ds = screentime().with_columns(vec![
            ColumnMapping::new("Z_PK"),
            ColumnMapping::new("ZVALUESTRING"),
        ]);
        let err = select_columns(&ds, &zobject_columns()).unwrap_err();
        assert!(err.to_string().contains("column 'ZVALUESTRING' not found"));
    }

    #[test]
    fn test_build_select() {
        let ds = screentime();
        let cols = select_columns(&ds, &zobject_columns()).unwrap();
        assert_eq!(
            build_select(&ds, &cols),
            "SELECT \"Z_PK\", \"ZSTREAMNAME\", \"ZSTARTDATE\" FROM \"ZOBJECT\" \
             WHERE \"Z_PK\" > ?1 ORDER BY \"Z_PK\" ASC"
        );
    }
}
