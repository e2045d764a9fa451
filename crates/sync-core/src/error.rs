//! Error kinds reported by sources, sinks and the exporter.

use thiserror::Error;

/// Convenience alias used across the workspace.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur while syncing a dataset.
///
/// `Configuration` is fatal for the whole invocation. Every other kind aborts
/// only the cycle of the dataset it names; the watermark of that dataset is
/// left untouched.
#[derive(Error, Debug)]
pub enum SyncError {
    /// A required connection parameter or dataset definition is missing or invalid.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The source could not be opened or queried.
    #[error("Source unavailable for dataset '{dataset}': {reason}")]
    SourceUnavailable { dataset: String, reason: String },

    /// The destination rejected a watermark read/write or a row append.
    #[error("Storage error for dataset '{dataset}': {reason}")]
    Storage { dataset: String, reason: String },

    /// A source value cannot be represented in its column type.
    #[error("Conversion error in dataset '{dataset}', column '{column}': {reason}")]
    Conversion {
        dataset: String,
        column: String,
        reason: String,
    },
}

impl SyncError {
    /// Build a `SourceUnavailable` error from anything displayable.
    pub fn source(dataset: impl Into<String>, reason: impl ToString) -> Self {
        Self::SourceUnavailable {
            dataset: dataset.into(),
            reason: reason.to_string(),
        }
    }

    /// Build a `Storage` error from anything displayable.
    pub fn storage(dataset: impl Into<String>, reason: impl ToString) -> Self {
        Self::Storage {
            dataset: dataset.into(),
            reason: reason.to_string(),
        }
    }

    /// Short machine-friendly name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration",
            Self::SourceUnavailable { .. } => "source_unavailable",
            Self::Storage { .. } => "storage",
            Self::Conversion { .. } => "conversion",
        }
    }

    /// Whether this error should stop the invocation before any dataset runs.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Configuration(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_name_the_dataset() {
        let err = SyncError::source("eventmodel", "unable to open database file");
        assert_eq!(
            err.to_string(),
            "Source unavailable for dataset 'eventmodel': unable to open database file"
        );
        assert_eq!(err.kind(), "source_unavailable");
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_configuration_is_fatal() {
        let err = SyncError::Configuration("PG_URL is not set".into());
        assert!(err.is_fatal());
        assert_eq!(err.kind(), "configuration");
    }
}
