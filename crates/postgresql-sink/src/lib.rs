//! PostgreSQL destination for screen-thyme.
//!
//! Appends row batches to destination tables (created on first write from
//! the batch schema) and keeps the watermark history of every dataset in a
//! single append-only table:
//!
//! ```text
//! screen_thyme_watermarks
//!   id            BIGSERIAL PRIMARY KEY
//!   dataset_name  TEXT
//!   last_row      BIGINT
//!   synced_at     TIMESTAMPTZ
//! ```
//!
//! With `dedupe` enabled a unique index on the primary-key column backs
//! `ON CONFLICT DO NOTHING`, so replaying a batch after a crash between the
//! row write and the watermark write does not duplicate rows. With
//! `transactional` enabled rows and watermark commit together and that
//! crash window does not exist at all.

pub mod catalog;
pub mod ddl;
mod destination;
mod error;
pub mod insert;
pub mod watermarks;

pub use destination::{PostgresDestination, PostgresOptions, DEFAULT_WATERMARK_TABLE};
pub use error::PostgreSQLSinkError;
pub use insert::{DEFAULT_BATCH_SIZE, MAX_BIND_PARAMETERS};
