// Dataset error types and constants

use crate::error::ErrorCode;
use log::error;
use std::fmt;
use std::path::PathBuf;

/// Dataset error code constants
///
/// Error code range: 2001-2008
pub struct DatasetErrorCodes {}

impl DatasetErrorCodes {
    /// Archive file does not exist
    pub const ARCHIVE_MISSING: i32 = 2001;

    /// Archive exists but is not a valid zip
    pub const ARCHIVE_CORRUPT: i32 = 2002;

    /// Filesystem failure while reading or writing dataset files
    pub const IO: i32 = 2003;

    /// Label CSV does not exist
    pub const CSV_MISSING: i32 = 2004;

    /// Label CSV lacks `filepath` or `emotion`
    pub const MISSING_COLUMNS: i32 = 2005;

    /// No labeled file survived path validation
    pub const EMPTY_DATASET: i32 = 2006;

    /// Feature extraction failed for every file
    pub const NO_FEATURES: i32 = 2007;

    /// Too few samples to split into train and test sets
    pub const INSUFFICIENT_SAMPLES: i32 = 2008;
}

/// Log a dataset error with structured context
pub fn log_dataset_error(err: &DatasetError, context: &str) {
    error!(
        "Dataset error in {}: code={}, component=DatasetPipeline, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Dataset preparation errors
///
/// Every variant is fatal for the batch job that raises it. Per-file
/// problems (bad names, unreadable clips) are logged and skipped instead.
#[derive(Debug, Clone, PartialEq)]
pub enum DatasetError {
    /// Archive file not found
    ArchiveMissing { path: PathBuf },

    /// Archive could not be read as zip
    ArchiveCorrupt { path: PathBuf, reason: String },

    /// Filesystem failure
    Io { path: PathBuf, reason: String },

    /// Label CSV not found
    CsvMissing { path: PathBuf },

    /// Label CSV header lacks required columns
    MissingColumns { found: Vec<String> },

    /// No rows left after path validation
    EmptyDataset,

    /// No features could be extracted
    NoFeatures,

    /// Not enough rows to produce non-empty train and test splits
    InsufficientSamples { required: usize, found: usize },
}

impl ErrorCode for DatasetError {
    fn code(&self) -> i32 {
        match self {
            DatasetError::ArchiveMissing { .. } => DatasetErrorCodes::ARCHIVE_MISSING,
            DatasetError::ArchiveCorrupt { .. } => DatasetErrorCodes::ARCHIVE_CORRUPT,
            DatasetError::Io { .. } => DatasetErrorCodes::IO,
            DatasetError::CsvMissing { .. } => DatasetErrorCodes::CSV_MISSING,
            DatasetError::MissingColumns { .. } => DatasetErrorCodes::MISSING_COLUMNS,
            DatasetError::EmptyDataset => DatasetErrorCodes::EMPTY_DATASET,
            DatasetError::NoFeatures => DatasetErrorCodes::NO_FEATURES,
            DatasetError::InsufficientSamples { .. } => DatasetErrorCodes::INSUFFICIENT_SAMPLES,
        }
    }

    fn message(&self) -> String {
        match self {
            DatasetError::ArchiveMissing { path } => {
                format!("ZIP file '{}' not found", path.display())
            }
            DatasetError::ArchiveCorrupt { path, reason } => {
                format!("'{}' is not a valid ZIP file: {}", path.display(), reason)
            }
            DatasetError::Io { path, reason } => {
                format!("I/O failure on {}: {}", path.display(), reason)
            }
            DatasetError::CsvMissing { path } => {
                format!("CSV file not found at {}", path.display())
            }
            DatasetError::MissingColumns { found } => format!(
                "CSV file must contain 'filepath' and 'emotion' columns (found: {})",
                found.join(", ")
            ),
            DatasetError::EmptyDataset => {
                "No valid audio data available for training".to_string()
            }
            DatasetError::NoFeatures => "No valid features extracted".to_string(),
            DatasetError::InsufficientSamples { required, found } => format!(
                "Insufficient samples for a train/test split: need {}, got {}",
                required, found
            ),
        }
    }
}

impl fmt::Display for DatasetError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DatasetError (code {}): {}",
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for DatasetError {}

impl DatasetError {
    pub(crate) fn io(path: impl Into<PathBuf>, err: impl fmt::Display) -> Self {
        DatasetError::Io {
            path: path.into(),
            reason: err.to_string(),
        }
    }
}
