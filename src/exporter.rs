//! One dataset's sync cycle.
//!
//! ```text
//! ReadWatermark -> QuerySource -> NoNewRows ---------------------> Done
//!                              \-> WriteRows -> AdvanceWatermark -> Done
//! ```
//!
//! A failure in any phase ends the cycle. The watermark only moves in
//! `AdvanceWatermark`, after the rows it covers were written, so an aborted
//! cycle is retried from the previous watermark on the next run.

use sink::Destination;
use std::fmt;
use sync_core::{Dataset, SourceReader, SyncError};
use thiserror::Error;
use tracing::{debug, info, warn};
use watermark::Watermark;

/// Phases of a sync cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CyclePhase {
    ReadWatermark,
    QuerySource,
    NoNewRows,
    WriteRows,
    AdvanceWatermark,
    Done,
}

impl CyclePhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            CyclePhase::ReadWatermark => "read_watermark",
            CyclePhase::QuerySource => "query_source",
            CyclePhase::NoNewRows => "no_new_rows",
            CyclePhase::WriteRows => "write_rows",
            CyclePhase::AdvanceWatermark => "advance_watermark",
            CyclePhase::Done => "done",
        }
    }
}

impl fmt::Display for CyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options that change what a cycle does.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExporterOptions {
    /// Read and report, but write nothing
    pub dry_run: bool,
}

/// Result of a completed cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleOutcome {
    pub dataset: String,
    /// Watermark read at the start of the cycle
    pub previous_watermark: i64,
    /// Rows returned by the source
    pub rows_selected: usize,
    /// Rows the destination accepted
    pub rows_written: u64,
    /// Watermark after the cycle
    pub watermark: i64,
    /// Phases passed through, in order
    pub phases: Vec<CyclePhase>,
    pub dry_run: bool,
}

impl CycleOutcome {
    pub fn no_new_rows(&self) -> bool {
        self.phases.contains(&CyclePhase::NoNewRows)
    }
}

/// A cycle that stopped in `phase`.
#[derive(Debug, Error)]
#[error("{error} (during {phase})")]
pub struct CycleFailure {
    pub dataset: String,
    pub phase: CyclePhase,
    pub error: SyncError,
}

/// Runs sync cycles against one source and one destination.
pub struct Exporter<'a, S, D> {
    source: &'a S,
    destination: &'a D,
    options: ExporterOptions,
}

impl<'a, S, D> Exporter<'a, S, D>
where
    S: SourceReader,
    D: Destination,
{
    pub fn new(source: &'a S, destination: &'a D, options: ExporterOptions) -> Self {
        Self {
            source,
            destination,
            options,
        }
    }

    /// Run one cycle for `dataset`.
    pub async fn run_cycle(&self, dataset: &Dataset) -> Result<CycleOutcome, CycleFailure> {
        let fail = |phase: CyclePhase| {
            move |error: SyncError| {
                warn!("Cycle for {} failed during {}: {}", dataset.name, phase, error);
                CycleFailure {
                    dataset: dataset.name.clone(),
                    phase,
                    error,
                }
            }
        };

        let mut phases = vec![CyclePhase::ReadWatermark];
        let previous = self
            .destination
            .get_watermark(&dataset.name)
            .await
            .map_err(fail(CyclePhase::ReadWatermark))?;
        info!("Dataset {}: watermark {}", dataset.name, previous);

        phases.push(CyclePhase::QuerySource);
        let batch = self
            .source
            .read_after(dataset, previous)
            .await
            .map_err(fail(CyclePhase::QuerySource))?;
        info!(
            "Dataset {}: selected {} rows from {}",
            dataset.name,
            batch.len(),
            dataset.source_table
        );

        let mut outcome = CycleOutcome {
            dataset: dataset.name.clone(),
            previous_watermark: previous,
            rows_selected: batch.len(),
            rows_written: 0,
            watermark: previous,
            phases,
            dry_run: self.options.dry_run,
        };

        let Some(max_key) = batch.max_primary_key() else {
            info!("Dataset {}: no new rows", dataset.name);
            outcome.phases.push(CyclePhase::NoNewRows);
            outcome.phases.push(CyclePhase::Done);
            return Ok(outcome);
        };

        if self.options.dry_run {
            info!(
                "Dry run: would write {} rows to {} and advance {} to {}",
                batch.len(),
                dataset.destination_table,
                dataset.name,
                max_key
            );
            outcome.phases.push(CyclePhase::Done);
            return Ok(outcome);
        }

        let next = Watermark::now(&dataset.name, max_key);
        outcome.phases.push(CyclePhase::WriteRows);

        let written = if self.destination.commits_atomically() {
            let written = self
                .destination
                .append_and_advance(dataset, &batch, &next)
                .await
                .map_err(fail(CyclePhase::WriteRows))?;
            outcome.phases.push(CyclePhase::AdvanceWatermark);
            written
        } else {
            let written = self
                .destination
                .append(dataset, &batch)
                .await
                .map_err(fail(CyclePhase::WriteRows))?;
            debug!(
                "Dataset {}: wrote {} rows to {}",
                dataset.name, written, dataset.destination_table
            );

            outcome.phases.push(CyclePhase::AdvanceWatermark);
            self.destination
                .advance_watermark(&dataset.name, next.last_row, next.synced_at)
                .await
                .map_err(fail(CyclePhase::AdvanceWatermark))?;
            written
        };

        info!(
            "Dataset {}: wrote {} rows, watermark {} -> {}",
            dataset.name, written, previous, next.last_row
        );
        outcome.rows_written = written;
        outcome.watermark = next.last_row;
        outcome.phases.push(CyclePhase::Done);
        Ok(outcome)
    }
}
