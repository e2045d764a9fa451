//! Runs the exporter once per configured dataset.
//!
//! Every dataset gets its own destination connection and source handle,
//! opened through a [`Connector`] and dropped when its cycle ends, so nothing
//! leaks from one dataset into the next. A failing dataset is recorded in its
//! report and the remaining datasets still run.

use async_trait::async_trait;
use postgresql_sink::{PostgresDestination, PostgresOptions};
use screen_thyme_sqlite_source::SqliteSource;
use sink::Destination;
use std::collections::HashSet;
use std::fmt;
use sync_core::{Dataset, SourceReader, SyncError, SyncResult};
use tracing::{error, info};
use watermark::{Watermark, WatermarkStore};

use crate::exporter::{CycleFailure, CycleOutcome, CyclePhase, Exporter, ExporterOptions};

/// Opens the per-cycle source and destination handles.
#[async_trait]
pub trait Connector: Send + Sync {
    type Source: SourceReader;
    type Destination: Destination;

    async fn open_source(&self, dataset: &Dataset) -> SyncResult<Self::Source>;

    async fn open_destination(&self, dataset: &Dataset) -> SyncResult<Self::Destination>;
}

/// SQLite files in, PostgreSQL out.
#[derive(Debug, Clone)]
pub struct PostgresConnector {
    url: String,
    options: PostgresOptions,
}

impl PostgresConnector {
    pub fn new(url: impl Into<String>, options: PostgresOptions) -> Self {
        Self {
            url: url.into(),
            options,
        }
    }
}

#[async_trait]
impl Connector for PostgresConnector {
    type Source = SqliteSource;
    type Destination = PostgresDestination;

    async fn open_source(&self, dataset: &Dataset) -> SyncResult<SqliteSource> {
        SqliteSource::open_for(dataset).await
    }

    async fn open_destination(&self, dataset: &Dataset) -> SyncResult<PostgresDestination> {
        PostgresDestination::connect(&self.url, self.options.clone())
            .await
            .map_err(|e| e.into_storage(&dataset.name))
    }
}

/// What happened to one dataset during an invocation.
#[derive(Debug)]
pub struct DatasetReport {
    pub dataset: String,
    pub result: Result<CycleOutcome, CycleFailure>,
}

impl DatasetReport {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

impl fmt::Display for DatasetReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.result {
            Ok(outcome) if outcome.no_new_rows() => write!(
                f,
                "{}: no new rows, watermark {}",
                self.dataset, outcome.watermark
            ),
            Ok(outcome) if outcome.dry_run => write!(
                f,
                "{}: dry run, would write {} rows, watermark stays {}",
                self.dataset, outcome.rows_selected, outcome.watermark
            ),
            Ok(outcome) => write!(
                f,
                "{}: wrote {} rows, watermark {}",
                self.dataset, outcome.rows_written, outcome.watermark
            ),
            Err(failure) => write!(f, "{}: FAILED {}", self.dataset, failure),
        }
    }
}

/// Current watermark of one dataset, as shown by `status`.
#[derive(Debug)]
pub struct StatusReport {
    pub dataset: String,
    pub result: SyncResult<Option<Watermark>>,
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.result {
            Ok(Some(wm)) => write!(
                f,
                "{}: watermark {} (synced {})",
                self.dataset,
                wm.last_row,
                wm.synced_at.to_rfc3339()
            ),
            Ok(None) => write!(f, "{}: never synced", self.dataset),
            Err(e) => write!(f, "{}: FAILED {}", self.dataset, e),
        }
    }
}

/// Runs every configured dataset, in order, once.
pub struct SyncCoordinator<C> {
    connector: C,
    datasets: Vec<Dataset>,
    options: ExporterOptions,
}

impl<C: Connector> SyncCoordinator<C> {
    /// Validate the dataset list.
    ///
    /// Fails with a configuration error when the list is empty, a dataset is
    /// malformed, or two datasets share a name.
    pub fn new(connector: C, datasets: Vec<Dataset>, options: ExporterOptions) -> SyncResult<Self> {
        if datasets.is_empty() {
            return Err(SyncError::Configuration("no datasets configured".into()));
        }
        let mut names = HashSet::new();
        for dataset in &datasets {
            dataset.validate()?;
            if !names.insert(dataset.name.as_str()) {
                return Err(SyncError::Configuration(format!(
                    "dataset '{}' is configured twice",
                    dataset.name
                )));
            }
        }
        Ok(Self {
            connector,
            datasets,
            options,
        })
    }

    pub fn datasets(&self) -> &[Dataset] {
        &self.datasets
    }

    /// Run one sync cycle per dataset and report each result.
    pub async fn run_all_datasets(&self) -> Vec<DatasetReport> {
        let mut reports = Vec::with_capacity(self.datasets.len());
        for dataset in &self.datasets {
            let report = self.run_dataset(dataset).await;
            match &report.result {
                Ok(_) => info!("{}", report),
                Err(_) => error!("{}", report),
            }
            reports.push(report);
        }
        reports
    }

    /// Run one cycle for `dataset` with freshly opened handles.
    pub async fn run_dataset(&self, dataset: &Dataset) -> DatasetReport {
        DatasetReport {
            dataset: dataset.name.clone(),
            result: self.cycle(dataset).await,
        }
    }

    async fn cycle(&self, dataset: &Dataset) -> Result<CycleOutcome, CycleFailure> {
        let failure = |phase, error| CycleFailure {
            dataset: dataset.name.clone(),
            phase,
            error,
        };

        let destination = self
            .connector
            .open_destination(dataset)
            .await
            .map_err(|e| failure(CyclePhase::ReadWatermark, e))?;
        let source = self
            .connector
            .open_source(dataset)
            .await
            .map_err(|e| failure(CyclePhase::QuerySource, e))?;

        Exporter::new(&source, &destination, self.options)
            .run_cycle(dataset)
            .await
    }

    /// Read the current watermark of every dataset without syncing.
    pub async fn status(&self) -> Vec<StatusReport> {
        let mut reports = Vec::with_capacity(self.datasets.len());
        for dataset in &self.datasets {
            let result = match self.connector.open_destination(dataset).await {
                Ok(destination) => destination.latest_watermark(&dataset.name).await,
                Err(e) => Err(e),
            };
            reports.push(StatusReport {
                dataset: dataset.name.clone(),
                result,
            });
        }
        reports
    }
}
