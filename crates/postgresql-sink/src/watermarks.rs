//! Watermark history table access.
//!
//! One table holds the history of every dataset; each successful cycle
//! appends a row. The current watermark of a dataset is its largest
//! `last_row`.

use chrono::{DateTime, Utc};
use tokio_postgres::GenericClient;
use watermark::Watermark;

use crate::ddl::{generate_watermark_index, generate_watermark_table, quote_ident};

/// Whether `table` exists in the current schema.
pub async fn table_exists<C>(client: &C, table: &str) -> Result<bool, tokio_postgres::Error>
where
    C: GenericClient + Sync,
{
    let rows = client
        .query(
            "SELECT 1 FROM information_schema.tables \
             WHERE table_schema = current_schema() AND table_name = $1",
            &[&table],
        )
        .await?;
    Ok(!rows.is_empty())
}

/// Create the history table and its lookup index if missing.
pub async fn ensure_watermark_table<C>(client: &C, table: &str) -> Result<(), tokio_postgres::Error>
where
    C: GenericClient + Sync,
{
    client.execute(&generate_watermark_table(table), &[]).await?;
    client.execute(&generate_watermark_index(table), &[]).await?;
    Ok(())
}

/// Most advanced watermark recorded for `dataset`.
///
/// A missing history table reads as no watermark at all, the same as a
/// dataset that never synced.
pub async fn latest_watermark<C>(
    client: &C,
    table: &str,
    dataset: &str,
) -> Result<Option<Watermark>, tokio_postgres::Error>
where
    C: GenericClient + Sync,
{
    if !table_exists(client, table).await? {
        return Ok(None);
    }

    let sql = format!(
        "SELECT last_row, synced_at FROM {} WHERE dataset_name = $1 \
         ORDER BY last_row DESC, synced_at DESC LIMIT 1",
        quote_ident(table)
    );
    let row = client.query_opt(&sql, &[&dataset]).await?;

    Ok(row.map(|row| Watermark {
        dataset_name: dataset.to_string(),
        last_row: row.get(0),
        synced_at: row.get(1),
    }))
}

/// Append a history entry for `dataset`.
pub async fn insert_watermark<C>(
    client: &C,
    table: &str,
    dataset: &str,
    last_row: i64,
    synced_at: DateTime<Utc>,
) -> Result<(), tokio_postgres::Error>
where
    C: GenericClient + Sync,
{
    let sql = format!(
        "INSERT INTO {} (dataset_name, last_row, synced_at) VALUES ($1, $2, $3)",
        quote_ident(table)
    );
    client
        .execute(&sql, &[&dataset, &last_row, &synced_at])
        .await?;
    Ok(())
}
