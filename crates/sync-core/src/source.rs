//! The source-side seam of a sync cycle.

use crate::batch::RowBatch;
use crate::dataset::Dataset;
use crate::error::SyncResult;

/// Read-only access to an append-only source table.
///
/// Implementations select every row whose primary key is strictly greater
/// than `watermark`, ordered by primary key ascending, with any
/// source-specific timestamp encodings already converted to
/// [`Value::Timestamp`](crate::Value::Timestamp). An empty batch is not an error.
#[async_trait::async_trait]
pub trait SourceReader: Send + Sync {
    /// Return all rows of `dataset.source_table` with primary key > `watermark`.
    async fn read_after(&self, dataset: &Dataset, watermark: i64) -> SyncResult<RowBatch>;
}
