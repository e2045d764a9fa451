//! screen-thyme library
//!
//! Incrementally exports rows from local SQLite trackers (Apple Screen Time's
//! `knowledgeC.db`, ActivityWatch) into PostgreSQL.
//!
//! # Features
//!
//! - Per-dataset watermarks: only rows with a primary key above the last
//!   transferred one are read, so a run never re-scans old data
//! - Append-only watermark history in the destination database
//! - Failure isolation: one broken dataset does not stop the others
//! - Optional primary-key dedupe and single-transaction commits
//!
//! # Crates
//!
//! - `sync-core` - values, schemas, row batches, datasets and errors
//! - `watermark` - watermark history and the `WatermarkStore` trait
//! - `sink` - `RowSink` / `Destination` traits and an in-memory destination
//! - `screen-thyme-sqlite-source` - read-only SQLite source reader
//! - `postgresql-sink` - PostgreSQL destination
//!
//! # CLI Usage
//!
//! ```bash
//! # Export both trackers
//! PG_URL=postgres://me@localhost/screentime \
//! APPLE_PATH=~/Library/Application\ Support/Knowledge/knowledgeC.db \
//! AW_PATH=~/Library/Application\ Support/activitywatch/aw-server/peewee-sqlite.v2.db \
//!   screen-thyme sync
//!
//! # Show where each dataset stands
//! screen-thyme status --dataset apple_screentime
//! ```

pub mod config;
pub mod coordinator;
pub mod exporter;
pub mod presets;

pub use config::{ConnectionOpts, FileConfig, Settings, WriteOpts};
pub use coordinator::{Connector, DatasetReport, PostgresConnector, StatusReport, SyncCoordinator};
pub use exporter::{CycleFailure, CycleOutcome, CyclePhase, Exporter, ExporterOptions};
