//! Error types for the PostgreSQL destination.

use sync_core::{BatchError, SyncError};
use thiserror::Error;

/// Errors that can occur while writing to PostgreSQL.
#[derive(Error, Debug)]
pub enum PostgreSQLSinkError {
    /// PostgreSQL connection or query error.
    #[error("PostgreSQL error: {}", describe(.0))]
    PostgreSQL(#[from] tokio_postgres::Error),

    /// Connection error.
    #[error("Connection error: {0}")]
    Connection(String),

    /// A batch does not fit the existing destination table.
    #[error("Table '{table}' cannot take the batch: {source}")]
    Incompatible {
        table: String,
        #[source]
        source: BatchError,
    },
}

impl PostgreSQLSinkError {
    /// Report this error as a storage failure of `dataset`.
    pub fn into_storage(self, dataset: &str) -> SyncError {
        SyncError::storage(dataset, self)
    }
}

/// Server errors carry their SQLSTATE and message in the `DbError`; the
/// plain `Display` of `tokio_postgres::Error` only says "db error".
fn describe(err: &tokio_postgres::Error) -> String {
    match err.as_db_error() {
        Some(db) => format!("{} ({})", db.message(), db.code().code()),
        None => err.to_string(),
    }
}
