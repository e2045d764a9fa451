//! In-process destination.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use sync_core::{Dataset, Row, RowBatch, Schema, SyncError, SyncResult};
use watermark::{MemoryStore, Watermark, WatermarkStore};

use crate::traits::{Destination, RowSink};

#[derive(Debug, Clone)]
struct MemoryTable {
    schema: Schema,
    rows: Vec<Row>,
}

#[derive(Default)]
struct Inner {
    tables: Mutex<HashMap<String, MemoryTable>>,
    watermarks: MemoryStore,
    dedupe: bool,
}

/// Destination that keeps tables and watermark history in memory.
///
/// Cloning yields another handle onto the same tables, the way a new
/// connection sees the same database.
#[derive(Clone, Default)]
pub struct MemoryDestination {
    inner: Arc<Inner>,
}

impl MemoryDestination {
    pub fn new() -> Self {
        Self::default()
    }

    /// Skip rows whose primary key is already present in the table.
    pub fn with_dedupe() -> Self {
        Self {
            inner: Arc::new(Inner {
                dedupe: true,
                ..Inner::default()
            }),
        }
    }

    /// Rows of `table` in insertion order; empty if the table does not exist.
    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.tables_unchecked()
            .get(table)
            .map(|t| t.rows.clone())
            .unwrap_or_default()
    }

    /// Schema `table` was created with.
    pub fn schema(&self, table: &str) -> Option<Schema> {
        self.tables_unchecked().get(table).map(|t| t.schema.clone())
    }

    /// Values of `column` across all rows of `table`, as integers.
    pub fn column_i64(&self, table: &str, column: &str) -> Vec<i64> {
        let tables = self.tables_unchecked();
        let Some(t) = tables.get(table) else {
            return Vec::new();
        };
        let Some(index) = t.schema.index_of(column) else {
            return Vec::new();
        };
        t.rows
            .iter()
            .filter_map(|row| row.get(index).and_then(|v| v.as_i64()))
            .collect()
    }

    /// Watermark history recorded for `dataset`, oldest first.
    pub fn watermark_history(&self, dataset: &str) -> Vec<Watermark> {
        self.inner.watermarks.history(dataset)
    }

    fn tables_unchecked(&self) -> MutexGuard<'_, HashMap<String, MemoryTable>> {
        self.inner
            .tables
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl RowSink for MemoryDestination {
    async fn table_exists(&self, table: &str) -> SyncResult<bool> {
        Ok(self.tables_unchecked().contains_key(table))
    }

    async fn append(&self, dataset: &Dataset, batch: &RowBatch) -> SyncResult<u64> {
        if batch.is_empty() {
            return Ok(0);
        }

        let mut tables = self.tables_unchecked();
        let table = tables
            .entry(dataset.destination_table.clone())
            .or_insert_with(|| MemoryTable {
                schema: batch.schema().clone(),
                rows: Vec::new(),
            });

        if table.schema.column_names() != batch.schema().column_names() {
            return Err(SyncError::storage(
                &dataset.name,
                format!(
                    "table '{}' has columns {:?}, batch has {:?}",
                    dataset.destination_table,
                    table.schema.column_names(),
                    batch.schema().column_names()
                ),
            ));
        }

        // The table keeps the types of the batch that created it
        let conformed;
        let batch = if table.schema == *batch.schema() {
            batch
        } else {
            conformed = batch.conform_to(&table.schema).map_err(|e| {
                SyncError::storage(
                    &dataset.name,
                    format!("table '{}': {e}", dataset.destination_table),
                )
            })?;
            &conformed
        };

        let pk = batch.primary_key_index();
        let mut existing: HashSet<i64> = if self.inner.dedupe {
            table
                .rows
                .iter()
                .filter_map(|row| row.get(pk).and_then(|v| v.as_i64()))
                .collect()
        } else {
            HashSet::new()
        };

        let mut written = 0;
        for row in batch.rows() {
            if self.inner.dedupe {
                let key = row.get(pk).and_then(|v| v.as_i64());
                if key.is_some_and(|k| !existing.insert(k)) {
                    continue;
                }
            }
            table.rows.push(row.clone());
            written += 1;
        }

        tracing::debug!(
            "Appended {} rows to in-memory table {}",
            written,
            dataset.destination_table
        );
        Ok(written)
    }
}

#[async_trait]
impl WatermarkStore for MemoryDestination {
    async fn latest_watermark(&self, dataset: &str) -> SyncResult<Option<Watermark>> {
        self.inner.watermarks.latest_watermark(dataset).await
    }

    async fn advance_watermark(
        &self,
        dataset: &str,
        last_row: i64,
        synced_at: DateTime<Utc>,
    ) -> SyncResult<()> {
        self.inner
            .watermarks
            .advance_watermark(dataset, last_row, synced_at)
            .await
    }
}

impl Destination for MemoryDestination {}
