// Model error types and constants

use crate::error::ErrorCode;
use std::fmt;
use std::path::PathBuf;

/// Model error code constants
///
/// Error code range: 3001-3006
pub struct ModelErrorCodes {}

impl ModelErrorCodes {
    pub const MISSING: i32 = 3001;
    pub const CORRUPT: i32 = 3002;
    pub const IO: i32 = 3003;
    pub const EMPTY_TRAINING_SET: i32 = 3004;
    pub const DIMENSION_MISMATCH: i32 = 3005;
    pub const BACKEND: i32 = 3006;
}

/// Errors raised while fitting, persisting or loading the classifier
#[derive(Debug, Clone, PartialEq)]
pub enum ModelError {
    /// Model artifact not found on disk
    Missing { path: PathBuf },

    /// Artifact exists but cannot be parsed or is internally inconsistent
    Corrupt { path: PathBuf, reason: String },

    /// Filesystem failure while writing the artifact
    Io { path: PathBuf, reason: String },

    /// Fit called with no rows
    EmptyTrainingSet,

    /// Feature width disagrees with what the forest was fitted on
    DimensionMismatch { expected: usize, actual: usize },

    /// smartcore rejected the training data or produced an unknown class
    Backend { reason: String },
}

impl ErrorCode for ModelError {
    fn code(&self) -> i32 {
        match self {
            ModelError::Missing { .. } => ModelErrorCodes::MISSING,
            ModelError::Corrupt { .. } => ModelErrorCodes::CORRUPT,
            ModelError::Io { .. } => ModelErrorCodes::IO,
            ModelError::EmptyTrainingSet => ModelErrorCodes::EMPTY_TRAINING_SET,
            ModelError::DimensionMismatch { .. } => ModelErrorCodes::DIMENSION_MISMATCH,
            ModelError::Backend { .. } => ModelErrorCodes::BACKEND,
        }
    }

    fn message(&self) -> String {
        match self {
            ModelError::Missing { path } => {
                format!("Model artifact not found at {}", path.display())
            }
            ModelError::Corrupt { path, reason } => {
                format!("Model artifact {} is unusable: {}", path.display(), reason)
            }
            ModelError::Io { path, reason } => {
                format!("Failed to write model artifact {}: {}", path.display(), reason)
            }
            ModelError::EmptyTrainingSet => "Cannot fit a model on an empty training set".into(),
            ModelError::DimensionMismatch { expected, actual } => format!(
                "Feature vector has {} components, model expects {}",
                actual, expected
            ),
            ModelError::Backend { reason } => format!("Random forest failed: {}", reason),
        }
    }
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ModelError (code {}): {}", self.code(), self.message())
    }
}

impl std::error::Error for ModelError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_error_codes() {
        assert_eq!(
            ModelError::Missing {
                path: PathBuf::from("m.json")
            }
            .code(),
            3001
        );
        assert_eq!(ModelError::EmptyTrainingSet.code(), 3004);
        assert_eq!(
            ModelError::DimensionMismatch {
                expected: 40,
                actual: 13
            }
            .code(),
            ModelErrorCodes::DIMENSION_MISMATCH
        );
        assert_eq!(
            ModelError::Backend {
                reason: "label".into()
            }
            .code(),
            3006
        );
    }

    #[test]
    fn test_dimension_mismatch_message() {
        let err = ModelError::DimensionMismatch {
            expected: 40,
            actual: 13,
        };
        assert_eq!(
            err.message(),
            "Feature vector has 13 components, model expects 40"
        );
    }
}
