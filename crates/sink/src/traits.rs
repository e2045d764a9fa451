//! RowSink and Destination trait definitions.

use sync_core::{Dataset, RowBatch, SyncResult};
use watermark::{Watermark, WatermarkStore};

/// Trait for appending row batches to destination tables.
///
/// # Usage Pattern
///
/// The exporter uses generics for zero-cost dispatch:
///
/// ```ignore
/// pub async fn run_cycle<S: SourceReader, D: Destination>(
///     source: &S,
///     destination: &D,
///     dataset: &Dataset,
/// ) -> SyncResult<CycleOutcome> {
///     let written = destination.append(dataset, &batch).await?;
/// }
/// ```
#[async_trait::async_trait]
pub trait RowSink: Send + Sync {
    /// Whether `table` exists in the destination.
    async fn table_exists(&self, table: &str) -> SyncResult<bool>;

    /// Append every row of `batch` to `dataset.destination_table`.
    ///
    /// Creates the table from the batch schema when it does not exist. An
    /// empty batch is a no-op. Returns the number of rows actually written.
    /// Large batches may be split into several statements, so a failure can
    /// leave part of the batch written.
    async fn append(&self, dataset: &Dataset, batch: &RowBatch) -> SyncResult<u64>;
}

/// A destination store: a row sink that also holds watermark history.
///
/// Both roles share one connection, which is what lets an implementation
/// commit rows and watermark together.
#[async_trait::async_trait]
pub trait Destination: RowSink + WatermarkStore {
    /// Whether [`append_and_advance`](Self::append_and_advance) commits rows
    /// and watermark as a single atomic unit.
    fn commits_atomically(&self) -> bool {
        false
    }

    /// Append `batch`, then record `watermark`.
    ///
    /// The default runs the two steps one after the other; a crash between
    /// them leaves the rows written and the previous watermark in place.
    async fn append_and_advance(
        &self,
        dataset: &Dataset,
        batch: &RowBatch,
        watermark: &Watermark,
    ) -> SyncResult<u64> {
        let written = self.append(dataset, batch).await?;
        self.advance_watermark(&dataset.name, watermark.last_row, watermark.synced_at)
            .await?;
        Ok(written)
    }
}
