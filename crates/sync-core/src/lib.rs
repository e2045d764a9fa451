//! Core types for screen-thyme.
//!
//! This crate provides the foundational types shared by every other crate
//! in the workspace:
//!
//! - [`ColumnType`] - Semantic type of a column in a row batch
//! - [`Value`] - A single dynamically-typed cell value
//! - [`Schema`] - Ordered `(name, ColumnType)` pairs determined at read time
//! - [`RowBatch`] - Rows selected from a source during one sync cycle
//! - [`Dataset`] - A source table to destination table mapping
//! - [`SyncError`] - Error kinds reported per dataset
//! - [`SourceReader`] - The seam every source implementation plugs into
//!
//! # Architecture
//!
//! ```text
//! sync-core (this crate)
//!    │
//!    ├─── watermark         (watermark history and the WatermarkStore trait)
//!    ├─── sink              (RowSink / Destination traits)
//!    ├─── sqlite-source     (implements SourceReader for SQLite files)
//!    └─── postgresql-sink   (implements Destination for PostgreSQL)
//! ```

pub mod batch;
pub mod dataset;
pub mod error;
pub mod schema;
pub mod source;
pub mod types;
pub mod values;

pub use batch::{BatchError, Row, RowBatch};
pub use dataset::{ColumnMapping, Dataset, TimestampColumn, TimestampEncoding};
pub use error::{SyncError, SyncResult};
pub use schema::{Column, Schema};
pub use source::SourceReader;
pub use types::ColumnType;
pub use values::Value;
