//! Dataset definitions: one source table mapped to one destination table.

use crate::error::{SyncError, SyncResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;

/// How a source stores a timestamp column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimestampEncoding {
    /// Seconds since 2001-01-01T00:00:00Z (Apple Core Data / NSDate reference date).
    CoreData,
    /// Seconds since the Unix epoch.
    UnixSeconds,
    /// Milliseconds since the Unix epoch.
    UnixMillis,
    /// RFC 3339 / ISO 8601 text; naive values are read as UTC.
    Iso8601,
}

/// A source column to copy, optionally renamed in the destination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMapping {
    /// Column name in the source table
    pub source: String,

    /// Column name in the destination table (defaults to `source`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl ColumnMapping {
    /// Copy `source` under the same name.
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            name: None,
        }
    }

    /// Copy `source` and write it as `name`.
    pub fn renamed(source: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            name: Some(name.into()),
        }
    }

    /// Name this column gets in the destination table.
    pub fn destination_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.source)
    }
}

/// A source column holding timestamps in a source-specific encoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimestampColumn {
    /// Column name in the source table
    pub column: String,

    /// How the source stores it
    pub encoding: TimestampEncoding,
}

/// A named logical stream copied under independent watermark tracking.
///
/// Identity is `name`; it keys the dataset's watermark history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dataset {
    /// Dataset name, unique per invocation
    pub name: String,

    /// Path to the source database file
    pub source_path: PathBuf,

    /// Table to read from
    pub source_table: String,

    /// Table to append to
    pub destination_table: String,

    /// Integer primary-key column in the source table
    pub primary_key_column: String,

    /// Columns to copy; empty means every column under its source name
    #[serde(default)]
    pub columns: Vec<ColumnMapping>,

    /// Timestamp columns to canonicalize while reading
    #[serde(default)]
    pub timestamps: Vec<TimestampColumn>,
}

impl Dataset {
    /// Create a dataset that copies every column unchanged.
    pub fn new(
        name: impl Into<String>,
        source_path: impl Into<PathBuf>,
        source_table: impl Into<String>,
        destination_table: impl Into<String>,
        primary_key_column: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            source_path: source_path.into(),
            source_table: source_table.into(),
            destination_table: destination_table.into(),
            primary_key_column: primary_key_column.into(),
            columns: Vec::new(),
            timestamps: Vec::new(),
        }
    }

    /// Restrict and rename the copied columns.
    pub fn with_columns(mut self, columns: Vec<ColumnMapping>) -> Self {
        self.columns = columns;
        self
    }

    /// Declare a timestamp column.
    pub fn with_timestamp(
        mut self,
        column: impl Into<String>,
        encoding: TimestampEncoding,
    ) -> Self {
        self.timestamps.push(TimestampColumn {
            column: column.into(),
            encoding,
        });
        self
    }

    /// Encoding of source column `column`, if it is a timestamp column.
    pub fn timestamp_encoding(&self, column: &str) -> Option<TimestampEncoding> {
        self.timestamps
            .iter()
            .find(|t| t.column.eq_ignore_ascii_case(column))
            .map(|t| t.encoding)
    }

    /// Destination name of the source column `source`.
    pub fn destination_column<'a>(&'a self, source: &'a str) -> &'a str {
        self.columns
            .iter()
            .find(|m| m.source.eq_ignore_ascii_case(source))
            .map(|m| m.destination_name())
            .unwrap_or(source)
    }

    /// Name of the primary-key column in the destination table.
    pub fn destination_primary_key(&self) -> &str {
        self.destination_column(&self.primary_key_column)
    }

    /// Check the definition before any I/O happens.
    pub fn validate(&self) -> SyncResult<()> {
        let invalid = |reason: String| -> SyncResult<()> {
            Err(SyncError::Configuration(format!(
                "dataset '{}': {reason}",
                self.name
            )))
        };

        if self.name.trim().is_empty() {
            return Err(SyncError::Configuration("dataset name is empty".into()));
        }
        for (what, ident) in [
            ("source_table", &self.source_table),
            ("destination_table", &self.destination_table),
            ("primary_key_column", &self.primary_key_column),
        ] {
            if !is_valid_identifier(ident) {
                return invalid(format!("{what} '{ident}' is not a valid identifier"));
            }
        }

        if !self.columns.is_empty() {
            let mut seen = HashSet::new();
            for mapping in &self.columns {
                if !is_valid_identifier(&mapping.source)
                    || !is_valid_identifier(mapping.destination_name())
                {
                    return invalid(format!(
                        "column '{}' is not a valid identifier",
                        mapping.source
                    ));
                }
                if !seen.insert(mapping.destination_name().to_string()) {
                    return invalid(format!(
                        "destination column '{}' is mapped twice",
                        mapping.destination_name()
                    ));
                }
            }
            let projected = |column: &str| {
                self.columns
                    .iter()
                    .any(|m| m.source.eq_ignore_ascii_case(column))
            };
            if !projected(&self.primary_key_column) {
                return invalid(format!(
                    "primary key '{}' must be one of the copied columns",
                    self.primary_key_column
                ));
            }
            if let Some(ts) = self.timestamps.iter().find(|t| !projected(&t.column)) {
                return invalid(format!(
                    "timestamp column '{}' is not one of the copied columns",
                    ts.column
                ));
            }
        }

        Ok(())
    }
}

/// Identifiers are always quoted, so only characters that break quoting are refused.
pub fn is_valid_identifier(ident: &str) -> bool {
    !ident.trim().is_empty() && !ident.contains('"') && !ident.contains('\0')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn screentime() -> Dataset {
        Dataset::new(
            "apple_screentime",
            "/tmp/knowledgeC.db",
            "ZOBJECT",
            "apple_screentime",
            "Z_PK",
        )
        .with_columns(vec![
            ColumnMapping::renamed("Z_PK", "z_pk"),
            ColumnMapping::renamed("ZSTARTDATE", "zstartdate"),
        ])
        .with_timestamp("ZSTARTDATE", TimestampEncoding::CoreData)
    }

    #[test]
    fn test_destination_names_follow_mapping() {
        let ds = screentime();
        assert_eq!(ds.destination_primary_key(), "z_pk");
        assert_eq!(ds.destination_column("ZSTARTDATE"), "zstartdate");
        assert_eq!(ds.destination_column("ZOTHER"), "ZOTHER");
        assert!(ds.validate().is_ok());
    }

    #[test]
    fn test_timestamp_lookup_is_case_insensitive() {
        let ds = screentime();
        assert_eq!(
            ds.timestamp_encoding("zstartdate"),
            Some(TimestampEncoding::CoreData)
        );
        assert_eq!(ds.timestamp_encoding("Z_PK"), None);
    }

    #[test]
    fn test_primary_key_must_be_projected() {
        let ds = screentime().with_columns(vec![ColumnMapping::new("ZSTARTDATE")]);
        let err = ds.validate().unwrap_err();
        assert!(err.to_string().contains("primary key 'Z_PK'"));
    }

    #[test]
    fn test_duplicate_destination_columns_rejected() {
        let ds = screentime().with_columns(vec![
            ColumnMapping::renamed("Z_PK", "id"),
            ColumnMapping::renamed("ZSTARTDATE", "id"),
        ]);
        assert!(matches!(ds.validate(), Err(SyncError::Configuration(_))));
    }

    #[test]
    fn test_quote_in_identifier_rejected() {
        let ds = Dataset::new("x", "/tmp/x.db", "bad\"table", "dest", "id");
        assert!(ds.validate().is_err());
    }

    #[test]
    fn test_deserialize_from_toml() {
        let toml_src = r#"
name = "activitywatch_events"
source_path = "/tmp/aw.db"
source_table = "eventmodel"
destination_table = "eventmodel"
primary_key_column = "id"

[[timestamps]]
column = "timestamp"
encoding = "iso8601"
"#;
        let ds: Dataset = toml::from_str(toml_src).unwrap();
        assert!(ds.columns.is_empty());
        assert_eq!(
            ds.timestamp_encoding("timestamp"),
            Some(TimestampEncoding::Iso8601)
        );
        assert!(ds.validate().is_ok());
    }
}
