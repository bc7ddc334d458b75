// Inference service, persistence and startup error types

use crate::error::{DecodeError, ErrorCode, ModelError};
use log::error;
use std::fmt;
use std::path::PathBuf;

/// Persistence error code constants
///
/// Error code range: 4001-4004
pub struct PersistenceErrorCodes {}

impl PersistenceErrorCodes {
    /// Prediction log could not be opened or migrated
    pub const OPEN: i32 = 4001;

    /// Insert failed
    pub const WRITE: i32 = 4002;

    /// Bulk read failed
    pub const READ: i32 = 4003;

    /// Connection mutex was poisoned
    pub const LOCK_POISONED: i32 = 4004;
}

/// Inference error code constants
///
/// Error code range: 5001-5005
pub struct InferenceErrorCodes {}

impl InferenceErrorCodes {
    /// Upload could not be turned into a feature vector
    pub const UNPROCESSABLE_INPUT: i32 = 5001;

    /// Prediction computed but could not be recorded
    pub const PERSISTENCE: i32 = 5002;

    /// Temp file handling failed
    pub const IO: i32 = 5003;

    /// Model rejected the feature vector
    pub const INTERNAL: i32 = 5004;

    /// Caller gave up before the prediction was recorded
    pub const CANCELLED: i32 = 5005;
}

/// Startup error code constants
///
/// Error code range: 6001-6004
pub struct StartupErrorCodes {}

impl StartupErrorCodes {
    pub const MODEL_UNAVAILABLE: i32 = 6001;
    pub const STORE_UNAVAILABLE: i32 = 6002;
    pub const UPLOAD_DIR: i32 = 6003;
    pub const BIND: i32 = 6004;
}

/// Log an inference error with structured context
pub fn log_inference_error(err: &InferenceError, context: &str) {
    error!(
        "Inference error in {}: code={}, component=InferenceService, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Prediction log failures
#[derive(Debug, Clone, PartialEq)]
pub enum PersistenceError {
    Open { reason: String },
    Write { reason: String },
    Read { reason: String },
    LockPoisoned,
}

impl ErrorCode for PersistenceError {
    fn code(&self) -> i32 {
        match self {
            PersistenceError::Open { .. } => PersistenceErrorCodes::OPEN,
            PersistenceError::Write { .. } => PersistenceErrorCodes::WRITE,
            PersistenceError::Read { .. } => PersistenceErrorCodes::READ,
            PersistenceError::LockPoisoned => PersistenceErrorCodes::LOCK_POISONED,
        }
    }

    fn message(&self) -> String {
        match self {
            PersistenceError::Open { reason } => {
                format!("Prediction log unavailable: {}", reason)
            }
            PersistenceError::Write { reason } => {
                format!("Failed to record prediction: {}", reason)
            }
            PersistenceError::Read { reason } => {
                format!("Failed to read prediction history: {}", reason)
            }
            PersistenceError::LockPoisoned => "Prediction log lock poisoned".to_string(),
        }
    }
}

impl fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PersistenceError (code {}): {}",
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for PersistenceError {}

/// Per-request inference failures
///
/// Each variant maps to one HTTP status class: unprocessable input is the
/// caller's problem (4xx), everything else is ours (5xx).
#[derive(Debug, Clone, PartialEq)]
pub enum InferenceError {
    /// Upload is empty, undecodable, or too short to analyse
    UnprocessableInput { reason: String },

    /// Prediction log write failed after retries
    Persistence(PersistenceError),

    /// Temp file could not be written
    Io { reason: String },

    /// Model rejected the features
    Internal { reason: String },

    /// Deadline passed before the result was recorded; nothing was written
    Cancelled,
}

impl ErrorCode for InferenceError {
    fn code(&self) -> i32 {
        match self {
            InferenceError::UnprocessableInput { .. } => InferenceErrorCodes::UNPROCESSABLE_INPUT,
            InferenceError::Persistence(_) => InferenceErrorCodes::PERSISTENCE,
            InferenceError::Io { .. } => InferenceErrorCodes::IO,
            InferenceError::Internal { .. } => InferenceErrorCodes::INTERNAL,
            InferenceError::Cancelled => InferenceErrorCodes::CANCELLED,
        }
    }

    fn message(&self) -> String {
        match self {
            InferenceError::UnprocessableInput { reason } => {
                format!("Unprocessable audio input: {}", reason)
            }
            InferenceError::Persistence(err) => err.message(),
            InferenceError::Io { reason } => format!("Upload handling failed: {}", reason),
            InferenceError::Internal { reason } => format!("Prediction failed: {}", reason),
            InferenceError::Cancelled => "Prediction cancelled before it was recorded".to_string(),
        }
    }
}

impl fmt::Display for InferenceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "InferenceError (code {}): {}",
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for InferenceError {}

impl From<DecodeError> for InferenceError {
    fn from(err: DecodeError) -> Self {
        match err {
            DecodeError::Io { reason } => InferenceError::Io { reason },
            other => InferenceError::UnprocessableInput {
                reason: other.message(),
            },
        }
    }
}

impl From<PersistenceError> for InferenceError {
    fn from(err: PersistenceError) -> Self {
        InferenceError::Persistence(err)
    }
}

impl From<ModelError> for InferenceError {
    fn from(err: ModelError) -> Self {
        InferenceError::Internal {
            reason: err.message(),
        }
    }
}

/// Fatal service startup failures
#[derive(Debug, Clone, PartialEq)]
pub enum StartupError {
    /// Model artifact missing or unreadable
    ModelUnavailable(ModelError),

    /// Prediction log could not be opened
    StoreUnavailable(PersistenceError),

    /// Upload directory could not be created
    UploadDir { path: PathBuf, reason: String },

    /// Listener could not bind
    Bind { addr: String, reason: String },
}

impl ErrorCode for StartupError {
    fn code(&self) -> i32 {
        match self {
            StartupError::ModelUnavailable(_) => StartupErrorCodes::MODEL_UNAVAILABLE,
            StartupError::StoreUnavailable(_) => StartupErrorCodes::STORE_UNAVAILABLE,
            StartupError::UploadDir { .. } => StartupErrorCodes::UPLOAD_DIR,
            StartupError::Bind { .. } => StartupErrorCodes::BIND,
        }
    }

    fn message(&self) -> String {
        match self {
            StartupError::ModelUnavailable(err) => err.message(),
            StartupError::StoreUnavailable(err) => err.message(),
            StartupError::UploadDir { path, reason } => format!(
                "Cannot prepare upload directory {}: {}",
                path.display(),
                reason
            ),
            StartupError::Bind { addr, reason } => {
                format!("Cannot bind HTTP listener on {}: {}", addr, reason)
            }
        }
    }
}

impl fmt::Display for StartupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "StartupError (code {}): {}",
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for StartupError {}
