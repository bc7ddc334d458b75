//! Configuration management for the labeling, training and serving jobs
//!
//! This module provides runtime configuration loading from JSON files so
//! paths, feature parameters and forest hyperparameters can be adjusted
//! without recompilation. Missing or malformed files fall back to defaults.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default location of the JSON config file
pub const DEFAULT_CONFIG_PATH: &str = "config/emotion.json";

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub features: FeatureConfig,
    #[serde(default)]
    pub training: TrainingConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// Filesystem layout shared by all jobs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Zip archive of actor folders
    pub archive: PathBuf,
    /// Where the archive is unpacked
    pub extract_dir: PathBuf,
    /// Labeler output / trainer input
    pub labels_csv: PathBuf,
    /// Single overwrite-in-place model slot
    pub model: PathBuf,
    /// SQLite prediction log
    pub database: PathBuf,
    /// Directory for per-request temp uploads
    pub upload_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            archive: PathBuf::from("ravdess_dataset.zip"),
            extract_dir: PathBuf::from("ravdess_extracted"),
            labels_csv: PathBuf::from("data/labeled_ravdess.csv"),
            model: PathBuf::from("model/emotion_model.json"),
            database: PathBuf::from("data/emotions.db"),
            upload_dir: PathBuf::from("data/audio_samples"),
        }
    }
}

/// MFCC extraction parameters
///
/// The model artifact stores the copy used at training time; inference
/// always extracts with that copy rather than the current config.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Analysis sample rate in Hz (audio is resampled to this)
    pub sample_rate: u32,
    /// Seconds skipped at the start of each clip
    pub offset_secs: f32,
    /// Maximum seconds analysed after the offset
    pub duration_secs: f32,
    /// Upper bound on the FFT window; capped to the signal length
    pub n_fft: usize,
    /// Hop between STFT frames in samples
    pub hop_length: usize,
    /// Number of mel bands before the DCT
    pub n_mels: usize,
    /// Dynamic range clamp for the log-mel spectrogram
    pub top_db: f32,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            sample_rate: 22_050,
            offset_secs: 0.6,
            duration_secs: 2.5,
            n_fft: 1024,
            hop_length: 512,
            n_mels: 128,
            top_db: 80.0,
        }
    }
}

/// Oversampling, split and random forest parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Fraction of rows held out for evaluation
    pub test_fraction: f64,
    /// Seed for the split, SMOTE and the forest
    pub seed: u64,
    pub n_trees: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    /// Nearest neighbours considered when synthesising minority rows
    pub smote_k_neighbors: usize,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            test_fraction: 0.2,
            seed: 42,
            n_trees: 300,
            max_depth: 50,
            min_samples_split: 5,
            smote_k_neighbors: 5,
        }
    }
}

/// Prediction service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
    /// Upper bound on one /predict call, decode through database write
    pub request_timeout_ms: u64,
    pub max_upload_bytes: usize,
    /// Attempts for the prediction log insert (decode/predict never retry)
    pub persist_attempts: u32,
    pub persist_backoff_ms: u64,
    pub allow_cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:5000".to_string(),
            request_timeout_ms: 30_000,
            max_upload_bytes: 25 * 1024 * 1024,
            persist_attempts: 3,
            persist_backoff_ms: 100,
            allow_cors: true,
        }
    }
}

impl AppConfig {
    /// Load configuration from JSON file
    ///
    /// # Arguments
    /// * `path` - Path to JSON config file
    ///
    /// # Returns
    /// The parsed configuration, or defaults if the file doesn't exist or
    /// the JSON is invalid. Sections absent from the file keep their defaults.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    config
                }
                Err(err) => {
                    log::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }

    /// Load configuration from the default location
    pub fn load() -> Self {
        Self::load_from_file(DEFAULT_CONFIG_PATH)
    }
}
