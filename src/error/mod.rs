// Error types for the speech emotion pipeline
//
// This module defines custom error types for decoding, dataset preparation,
// model persistence and the inference service, providing structured error
// handling with numeric codes that the HTTP layer and CLI surface verbatim.

mod audio;
mod dataset;
mod model;
mod service;

pub use audio::{log_decode_error, DecodeError, DecodeErrorCodes};
pub use dataset::{log_dataset_error, DatasetError, DatasetErrorCodes};
pub use model::{ModelError, ModelErrorCodes};
pub use service::{
    log_inference_error, InferenceError, InferenceErrorCodes, PersistenceError,
    PersistenceErrorCodes, StartupError, StartupErrorCodes,
};

/// Error codes for structured error reporting
///
/// This trait provides a standard way to get error codes and messages
/// from custom error types, enabling consistent error handling across
/// the CLI and HTTP boundaries.
pub trait ErrorCode {
    /// Get the numeric error code
    fn code(&self) -> i32;

    /// Get the human-readable error message
    fn message(&self) -> String;
}
