//! SQLite source reader.
//!
//! Reads rows from a table inside a local SQLite file (Apple's knowledgeC.db,
//! ActivityWatch's sqlite store, ...) whose primary key is above a watermark.
//!
//! The file is opened read-only; another process (the OS, the ActivityWatch
//! server) keeps writing to it while we read. rusqlite is blocking, so every
//! query runs on tokio's blocking pool.
//!
//! # Example
//!
//! ```ignore
//! let source = SqliteSource::open_for(&dataset).await?;
//! let batch = source.read_after(&dataset, 3).await?;
//! ```

mod affinity;
mod convert;
mod reader;

pub use affinity::{affinity_of, infer_from_values, infer_numeric, Affinity};
pub use convert::{
    convert_value, decode_timestamp, from_sqlite, owned_value, parse_text_timestamp,
    CORE_DATA_EPOCH_OFFSET_SECS,
};
pub use reader::{quote_ident, read_after, table_columns};

use async_trait::async_trait;
use rusqlite::{Connection, OpenFlags};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use sync_core::{Dataset, RowBatch, SourceReader, SyncError, SyncResult};
use tracing::debug;

/// How long to wait on a lock held by the writing application.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// A read-only handle onto one SQLite file.
///
/// The connection is closed when the last clone of the handle is dropped.
#[derive(Clone)]
pub struct SqliteSource {
    path: PathBuf,
    conn: Arc<Mutex<Connection>>,
}

impl std::fmt::Debug for SqliteSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteSource")
            .field("path", &self.path)
            .finish()
    }
}

impl SqliteSource {
    /// Open `path` read-only. Blocks the calling thread.
    ///
    /// Fails if the file does not exist; nothing is ever created.
    pub fn open(path: impl AsRef<Path>) -> rusqlite::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let conn = Connection::open_with_flags(
            &path,
            OpenFlags::SQLITE_OPEN_READ_ONLY
                | OpenFlags::SQLITE_OPEN_NO_MUTEX
                | OpenFlags::SQLITE_OPEN_URI,
        )?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(Self {
            path,
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open the source file of `dataset` on the blocking pool.
    pub async fn open_for(dataset: &Dataset) -> SyncResult<Self> {
        let path = dataset.source_path.clone();
        let name = dataset.name.clone();
        debug!("Opening SQLite source {} for {}", path.display(), name);

        tokio::task::spawn_blocking(move || Self::open(&path))
            .await
            .map_err(|e| SyncError::source(&name, e))?
            .map_err(|e| {
                SyncError::source(
                    &name,
                    format!("{}: {e}", dataset.source_path.display()),
                )
            })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SourceReader for SqliteSource {
    async fn read_after(&self, dataset: &Dataset, watermark: i64) -> SyncResult<RowBatch> {
        let conn = Arc::clone(&self.conn);
        let owned = dataset.clone();

        tokio::task::spawn_blocking(move || {
            let conn = conn
                .lock()
                .map_err(|e| SyncError::source(&owned.name, e))?;
            reader::read_after(&conn, &owned, watermark)
        })
        .await
        .map_err(|e| SyncError::source(&dataset.name, e))?
    }
}
