//! In-process watermark storage.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use sync_core::{SyncError, SyncResult};

use crate::store::WatermarkStore;
use crate::Watermark;

/// Memory implementation of WatermarkStore trait.
///
/// Keeps the full append-only history per dataset. Nothing survives the process.
#[derive(Default)]
pub struct MemoryStore {
    history: Mutex<HashMap<String, Vec<Watermark>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every entry recorded for `dataset`, oldest first.
    pub fn history(&self, dataset: &str) -> Vec<Watermark> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(dataset)
            .cloned()
            .unwrap_or_default()
    }

    fn lock(
        &self,
        dataset: &str,
    ) -> SyncResult<MutexGuard<'_, HashMap<String, Vec<Watermark>>>> {
        self.history
            .lock()
            .map_err(|_| SyncError::storage(dataset, "watermark history lock poisoned"))
    }
}

#[async_trait]
impl WatermarkStore for MemoryStore {
    async fn latest_watermark(&self, dataset: &str) -> SyncResult<Option<Watermark>> {
        let history = self.lock(dataset)?;
        Ok(history
            .get(dataset)
            .and_then(|entries| Watermark::current(entries))
            .cloned())
    }

    async fn advance_watermark(
        &self,
        dataset: &str,
        last_row: i64,
        synced_at: DateTime<Utc>,
    ) -> SyncResult<()> {
        let mut history = self.lock(dataset)?;
        history
            .entry(dataset.to_string())
            .or_default()
            .push(Watermark {
                dataset_name: dataset.to_string(),
                last_row,
                synced_at,
            });
        tracing::debug!("Recorded watermark {last_row} for {dataset}");
        Ok(())
    }
}
