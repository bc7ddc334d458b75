// Decode error types and constants

use crate::error::ErrorCode;
use log::warn;
use std::fmt;
use std::path::PathBuf;

/// Decode error code constants
///
/// Error code range: 1001-1007
pub struct DecodeErrorCodes {}

impl DecodeErrorCodes {
    /// File could not be opened as audio
    pub const OPEN: i32 = 1001;

    /// Container or codec not supported
    pub const UNSUPPORTED_FORMAT: i32 = 1002;

    /// PCM sample layout not supported (e.g. 12-bit integer)
    pub const UNSUPPORTED_SAMPLE_FORMAT: i32 = 1003;

    /// Container holds no decodable audio track
    pub const NO_AUDIO_TRACK: i32 = 1004;

    /// Nothing left to analyse after applying the offset window
    pub const EMPTY_WINDOW: i32 = 1005;

    /// Sample rate conversion failed
    pub const RESAMPLE: i32 = 1006;

    /// Filesystem failure while reading or writing audio
    pub const IO: i32 = 1007;
}

/// Log a decode error with structured context
///
/// Decode failures are expected during dataset processing (corrupt clips),
/// so they are reported at warn level.
pub fn log_decode_error(err: &DecodeError, context: &str) {
    warn!(
        "Decode error in {}: code={}, component=AudioLoader, message={}",
        context,
        err.code(),
        err.message()
    );
}

/// Audio decoding errors
///
/// These errors cover opening, probing, decoding and resampling audio
/// before feature extraction.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodeError {
    /// File could not be opened or its header parsed
    Open { path: PathBuf, reason: String },

    /// Container or codec not supported by the decoder
    UnsupportedFormat { reason: String },

    /// PCM sample layout not supported
    UnsupportedSampleFormat { bits_per_sample: u16 },

    /// No audio track in the container
    NoAudioTrack,

    /// Signal is shorter than the analysis offset
    EmptyWindow { offset_secs: f32 },

    /// Sample rate conversion failed
    Resample { reason: String },

    /// Filesystem failure
    Io { reason: String },
}

impl ErrorCode for DecodeError {
    fn code(&self) -> i32 {
        match self {
            DecodeError::Open { .. } => DecodeErrorCodes::OPEN,
            DecodeError::UnsupportedFormat { .. } => DecodeErrorCodes::UNSUPPORTED_FORMAT,
            DecodeError::UnsupportedSampleFormat { .. } => {
                DecodeErrorCodes::UNSUPPORTED_SAMPLE_FORMAT
            }
            DecodeError::NoAudioTrack => DecodeErrorCodes::NO_AUDIO_TRACK,
            DecodeError::EmptyWindow { .. } => DecodeErrorCodes::EMPTY_WINDOW,
            DecodeError::Resample { .. } => DecodeErrorCodes::RESAMPLE,
            DecodeError::Io { .. } => DecodeErrorCodes::IO,
        }
    }

    fn message(&self) -> String {
        match self {
            DecodeError::Open { path, reason } => {
                format!("Failed to open audio {}: {}", path.display(), reason)
            }
            DecodeError::UnsupportedFormat { reason } => {
                format!("Unsupported audio format: {}", reason)
            }
            DecodeError::UnsupportedSampleFormat { bits_per_sample } => {
                format!("Unsupported PCM sample width: {} bits", bits_per_sample)
            }
            DecodeError::NoAudioTrack => "No decodable audio track found".to_string(),
            DecodeError::EmptyWindow { offset_secs } => format!(
                "Audio is shorter than the {:.1}s analysis offset",
                offset_secs
            ),
            DecodeError::Resample { reason } => format!("Resampling failed: {}", reason),
            DecodeError::Io { reason } => format!("Audio I/O failed: {}", reason),
        }
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "DecodeError (code {}): {}",
            self.code(),
            self.message()
        )
    }
}

impl std::error::Error for DecodeError {}

impl From<std::io::Error> for DecodeError {
    fn from(err: std::io::Error) -> Self {
        DecodeError::Io {
            reason: err.to_string(),
        }
    }
}

impl From<rubato::ResamplerConstructionError> for DecodeError {
    fn from(err: rubato::ResamplerConstructionError) -> Self {
        DecodeError::Resample {
            reason: err.to_string(),
        }
    }
}

impl From<rubato::ResampleError> for DecodeError {
    fn from(err: rubato::ResampleError) -> Self {
        DecodeError::Resample {
            reason: err.to_string(),
        }
    }
}
