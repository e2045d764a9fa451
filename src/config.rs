//! Configuration: CLI flags, environment, `.env` and an optional TOML file.
//!
//! Precedence is flag, then environment variable (clap reads both), then the
//! config file, then the built-in default.
//!
//! ```toml
//! postgres_url = "postgres://me@localhost/screentime"
//! batch_size = 500
//!
//! [[datasets]]
//! name = "firefox_visits"
//! source_path = "/Users/me/places.sqlite"
//! source_table = "moz_historyvisits"
//! destination_table = "firefox_visits"
//! primary_key_column = "id"
//! timestamps = [{ column = "visit_date", encoding = "unix_millis" }]
//! ```

use clap::Parser;
use postgresql_sink::{PostgresOptions, DEFAULT_BATCH_SIZE, DEFAULT_WATERMARK_TABLE};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use sync_core::{dataset::is_valid_identifier, Dataset, SyncError, SyncResult};

use crate::exporter::ExporterOptions;
use crate::presets;

/// Where to read from and write to.
#[derive(Parser, Debug, Clone, Default)]
pub struct ConnectionOpts {
    /// PostgreSQL connection URL
    #[arg(long, env = "PG_URL")]
    pub postgres_url: Option<String>,

    /// Path to Apple's knowledgeC.db (enables the apple_screentime dataset)
    #[arg(long, env = "APPLE_PATH")]
    pub apple_path: Option<PathBuf>,

    /// Path to ActivityWatch's sqlite database (enables the activitywatch_events dataset)
    #[arg(long, env = "AW_PATH")]
    pub aw_path: Option<PathBuf>,

    /// TOML file with settings and extra [[datasets]]
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Only run these datasets (repeatable)
    #[arg(long = "dataset", value_name = "NAME")]
    pub datasets: Vec<String>,

    /// Table holding watermark history (default: screen_thyme_watermarks)
    #[arg(long)]
    pub watermark_table: Option<String>,
}

/// How to write.
#[derive(Parser, Debug, Clone, Default)]
pub struct WriteOpts {
    /// Rows per INSERT statement (default: 1000)
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Skip rows whose primary key already exists in the destination table
    #[arg(long)]
    pub dedupe: bool,

    /// Commit rows and watermark in one transaction
    #[arg(long)]
    pub transactional: bool,

    /// Dry run mode - read and report, don't write anything
    #[arg(long)]
    pub dry_run: bool,
}

/// Contents of the `--config` file. Every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub postgres_url: Option<String>,
    pub apple_path: Option<PathBuf>,
    pub aw_path: Option<PathBuf>,
    pub watermark_table: Option<String>,
    pub batch_size: Option<usize>,
    #[serde(default)]
    pub dedupe: bool,
    #[serde(default)]
    pub transactional: bool,
    #[serde(default)]
    pub datasets: Vec<Dataset>,
}

impl FileConfig {
    pub fn load(path: &Path) -> SyncResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            SyncError::Configuration(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::parse(&text)
            .map_err(|e| SyncError::Configuration(format!("{}: {e}", path.display())))
    }

    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}

/// Fully resolved settings for one invocation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub postgres_url: String,
    pub datasets: Vec<Dataset>,
    pub postgres: PostgresOptions,
    pub exporter: ExporterOptions,
}

impl Settings {
    /// Merge flags, environment and config file into settings.
    ///
    /// All problems are configuration errors, raised before any dataset runs.
    pub fn resolve(conn: &ConnectionOpts, write: &WriteOpts) -> SyncResult<Self> {
        let file = match &conn.config {
            Some(path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };
        Self::merge(conn, write, file)
    }

    pub fn merge(conn: &ConnectionOpts, write: &WriteOpts, file: FileConfig) -> SyncResult<Self> {
        let postgres_url = conn
            .postgres_url
            .clone()
            .or(file.postgres_url)
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| {
                SyncError::Configuration(
                    "no destination URL: pass --postgres-url or set PG_URL".into(),
                )
            })?;

        let watermark_table = conn
            .watermark_table
            .clone()
            .or(file.watermark_table)
            .unwrap_or_else(|| DEFAULT_WATERMARK_TABLE.to_string());
        if !is_valid_identifier(&watermark_table) {
            return Err(SyncError::Configuration(format!(
                "watermark table '{watermark_table}' is not a valid identifier"
            )));
        }

        let batch_size = write
            .batch_size
            .or(file.batch_size)
            .unwrap_or(DEFAULT_BATCH_SIZE);
        if batch_size == 0 {
            return Err(SyncError::Configuration("batch size must be at least 1".into()));
        }

        let mut datasets = Vec::new();
        let apple_path = conn.apple_path.clone().or(file.apple_path);
        if let Some(path) = apple_path {
            datasets.push(presets::apple_screentime(path));
        }
        let aw_path = conn.aw_path.clone().or(file.aw_path);
        if let Some(path) = aw_path {
            datasets.push(presets::activitywatch_events(path));
        }
        for dataset in file.datasets {
            // A file entry with a preset's name replaces the preset
            datasets.retain(|d: &Dataset| d.name != dataset.name);
            datasets.push(dataset);
        }

        if !conn.datasets.is_empty() {
            if let Some(unknown) = conn
                .datasets
                .iter()
                .find(|name| !datasets.iter().any(|d| &d.name == *name))
            {
                return Err(SyncError::Configuration(format!(
                    "dataset '{unknown}' is not configured"
                )));
            }
            datasets.retain(|d| conn.datasets.contains(&d.name));
        }

        if datasets.is_empty() {
            return Err(SyncError::Configuration(
                "no datasets configured: set APPLE_PATH or AW_PATH, or add [[datasets]] to \
                 the config file"
                    .into(),
            ));
        }

        Ok(Self {
            postgres_url,
            datasets,
            postgres: PostgresOptions {
                batch_size,
                watermark_table,
                dedupe: write.dedupe || file.dedupe,
                transactional: write.transactional || file.transactional,
            },
            exporter: ExporterOptions {
                dry_run: write.dry_run,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use sync_core::TimestampEncoding;

    fn conn() -> ConnectionOpts {
        ConnectionOpts {
            postgres_url: Some("postgres://localhost/screentime".into()),
            apple_path: Some("/tmp/knowledgeC.db".into()),
            aw_path: Some("/tmp/aw.db".into()),
            ..ConnectionOpts::default()
        }
    }

    #[test]
    fn test_presets_from_paths() {
        let settings = Settings::merge(&conn(), &WriteOpts::default(), FileConfig::default())
            .unwrap();
        let names: Vec<_> = settings.datasets.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["apple_screentime", "activitywatch_events"]);
        assert_eq!(settings.postgres, PostgresOptions::default());
        assert!(!settings.exporter.dry_run);
    }

    #[test]
    fn test_missing_url_is_configuration_error() {
        let conn = ConnectionOpts {
            postgres_url: None,
            ..conn()
        };
        let err = Settings::merge(&conn, &WriteOpts::default(), FileConfig::default())
            .unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("PG_URL"));
    }

    #[test]
    fn test_no_datasets_is_configuration_error() {
        let conn = ConnectionOpts {
            postgres_url: Some("postgres://localhost/db".into()),
            ..ConnectionOpts::default()
        };
        let err = Settings::merge(&conn, &WriteOpts::default(), FileConfig::default())
            .unwrap_err();
        assert!(err.to_string().contains("no datasets configured"));
    }

    #[test]
    fn test_dataset_filter() {
        let conn = ConnectionOpts {
            datasets: vec!["activitywatch_events".into()],
            ..conn()
        };
        let settings =
            Settings::merge(&conn, &WriteOpts::default(), FileConfig::default()).unwrap();
        assert_eq!(settings.datasets.len(), 1);
        assert_eq!(settings.datasets[0].name, "activitywatch_events");

        let conn = ConnectionOpts {
            datasets: vec!["nope".into()],
            ..conn
        };
        let err = Settings::merge(&conn, &WriteOpts::default(), FileConfig::default())
            .unwrap_err();
        assert!(err.to_string().contains("'nope' is not configured"));
    }

    #[test]
    fn test_flags_override_file() {
        let file = FileConfig::parse(
            r#"
            postgres_url = "postgres://file/db"
            watermark_table = "wm_from_file"
            batch_size = 50
            dedupe = true
            "#,
        )
        .unwrap();
        let write = WriteOpts {
            batch_size: Some(200),
            transactional: true,
            ..WriteOpts::default()
        };
        let settings = Settings::merge(&conn(), &write, file).unwrap();
        assert_eq!(settings.postgres_url, "postgres://localhost/screentime");
        assert_eq!(settings.postgres.watermark_table, "wm_from_file");
        assert_eq!(settings.postgres.batch_size, 200);
        assert!(settings.postgres.dedupe);
        assert!(settings.postgres.transactional);
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let write = WriteOpts {
            batch_size: Some(0),
            ..WriteOpts::default()
        };
        assert!(Settings::merge(&conn(), &write, FileConfig::default()).is_err());
    }

    #[test]
    fn test_load_datasets_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
            postgres_url = "postgres://file/db"

            [[datasets]]
            name = "firefox_visits"
            source_path = "/tmp/places.sqlite"
            source_table = "moz_historyvisits"
            destination_table = "firefox_visits"
            primary_key_column = "id"
            timestamps = [{{ column = "visit_date", encoding = "unix_millis" }}]
            "#
        )
        .unwrap();

        let conn = ConnectionOpts {
            config: Some(file.path().to_path_buf()),
            ..ConnectionOpts::default()
        };
        let settings = Settings::resolve(&conn, &WriteOpts::default()).unwrap();
        assert_eq!(settings.postgres_url, "postgres://file/db");
        assert_eq!(settings.datasets.len(), 1);
        assert_eq!(
            settings.datasets[0].timestamp_encoding("visit_date"),
            Some(TimestampEncoding::UnixMillis)
        );
    }

    #[test]
    fn test_unreadable_or_bad_file() {
        let conn = ConnectionOpts {
            config: Some("/nonexistent/screen-thyme.toml".into()),
            ..conn()
        };
        let err = Settings::resolve(&conn, &WriteOpts::default()).unwrap_err();
        assert!(err.is_fatal());

        assert!(FileConfig::parse("unknown_key = 1").is_err());
    }
}
