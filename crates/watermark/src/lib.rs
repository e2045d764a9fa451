//! Watermark management for screen-thyme
//!
//! A watermark is the highest source primary key known to have been durably
//! written to the destination for a dataset.
//!
//! # Architecture
//!
//! This crate provides:
//! - [`Watermark`], one entry of a dataset's watermark history
//! - [`WatermarkStore`], the storage-agnostic interface the exporter talks to
//! - [`MemoryStore`], an in-process implementation
//!
//! The PostgreSQL implementation lives in the `postgresql-sink` crate, next
//! to the row writer, so both can share one connection and one transaction.
//!
//! ## History semantics
//!
//! Stores never update a watermark in place. Each successful cycle appends a
//! new entry, and the current watermark is the entry with the largest
//! `last_row`. A crash before the append leaves the previous entry as the
//! last known-good value.

mod memory;
pub mod store;

#[cfg(test)]
mod tests;

pub use memory::MemoryStore;
pub use store::WatermarkStore;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Value returned for datasets that have never completed a sync.
pub const INITIAL_WATERMARK: i64 = 0;

/// One entry of a dataset's watermark history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Watermark {
    /// Dataset this watermark belongs to
    pub dataset_name: String,
    /// Largest primary key written to the destination
    pub last_row: i64,
    /// When the rows up to `last_row` were written
    pub synced_at: DateTime<Utc>,
}

impl Watermark {
    /// Create a watermark stamped with the current time.
    pub fn now(dataset_name: impl Into<String>, last_row: i64) -> Self {
        Self {
            dataset_name: dataset_name.into(),
            last_row,
            synced_at: Utc::now(),
        }
    }

    /// Pick the current watermark out of a history.
    ///
    /// The largest `last_row` wins; ties go to the most recent `synced_at`.
    pub fn current<'a, I>(history: I) -> Option<&'a Watermark>
    where
        I: IntoIterator<Item = &'a Watermark>,
    {
        history
            .into_iter()
            .max_by(|a, b| (a.last_row, a.synced_at).cmp(&(b.last_row, b.synced_at)))
    }
}

impl fmt::Display for Watermark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@{} ({})",
            self.dataset_name,
            self.last_row,
            self.synced_at.to_rfc3339()
        )
    }
}
