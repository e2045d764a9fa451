//! Built-in datasets for the two supported trackers.

use std::path::Path;
use sync_core::{ColumnMapping, Dataset, TimestampEncoding};

/// Apple Screen Time usage objects from `knowledgeC.db`.
pub const APPLE_SCREENTIME: &str = "apple_screentime";

/// ActivityWatch events from its SQLite store.
pub const ACTIVITYWATCH_EVENTS: &str = "activitywatch_events";

/// ZOBJECT columns copied by the Screen Time preset.
const ZOBJECT_COLUMNS: &[&str] = &[
    "Z_PK",
    "ZSTREAMNAME",
    "ZVALUESTRING",
    "ZCREATIONDATE",
    "ZENDDATE",
    "ZLOCALCREATIONDATE",
    "ZSTARTDATE",
];

/// Core Data timestamps among `ZOBJECT_COLUMNS`.
const ZOBJECT_DATES: &[&str] = &[
    "ZCREATIONDATE",
    "ZENDDATE",
    "ZLOCALCREATIONDATE",
    "ZSTARTDATE",
];

/// Screen Time preset reading `path`.
///
/// Column names are lower-cased in the destination so they can be queried
/// without quoting.
pub fn apple_screentime(path: impl AsRef<Path>) -> Dataset {
    let columns = ZOBJECT_COLUMNS
        .iter()
        .map(|c| ColumnMapping::renamed(*c, c.to_ascii_lowercase()))
        .collect();
    ZOBJECT_DATES.iter().fold(
        Dataset::new(APPLE_SCREENTIME, path.as_ref(), "ZOBJECT", "zobject", "Z_PK")
            .with_columns(columns),
        |dataset, column| dataset.with_timestamp(*column, TimestampEncoding::CoreData),
    )
}

/// ActivityWatch preset reading `path`. Copies every column of `eventmodel`.
pub fn activitywatch_events(path: impl AsRef<Path>) -> Dataset {
    Dataset::new(ACTIVITYWATCH_EVENTS, path.as_ref(), "eventmodel", "eventmodel", "id")
        .with_timestamp("timestamp", TimestampEncoding::Iso8601)
}
