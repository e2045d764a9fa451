//! Watermark storage trait.
//!
//! This module defines the `WatermarkStore` trait for backend-agnostic
//! watermark operations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sync_core::SyncResult;

use crate::{Watermark, INITIAL_WATERMARK};

/// Trait for watermark storage operations.
///
/// This trait abstracts the storage backend, allowing the same exporter
/// logic to work with:
/// - PostgreSQL (`PostgresDestination` in the postgresql-sink crate)
/// - In-process memory (`MemoryStore`)
///
/// Errors are reported as [`SyncError::Storage`](sync_core::SyncError::Storage).
#[async_trait]
pub trait WatermarkStore: Send + Sync {
    /// Read the current watermark entry for `dataset`.
    ///
    /// Returns `None` if the dataset has never been synced, including when the
    /// backing table does not exist yet.
    async fn latest_watermark(&self, dataset: &str) -> SyncResult<Option<Watermark>>;

    /// Append a new history entry for `dataset`.
    async fn advance_watermark(
        &self,
        dataset: &str,
        last_row: i64,
        synced_at: DateTime<Utc>,
    ) -> SyncResult<()>;

    /// Current `last_row` for `dataset`, or [`INITIAL_WATERMARK`] if none.
    async fn get_watermark(&self, dataset: &str) -> SyncResult<i64> {
        Ok(self
            .latest_watermark(dataset)
            .await?
            .map(|w| w.last_row)
            .unwrap_or(INITIAL_WATERMARK))
    }
}
