// Speech Emotion - RAVDESS labeling, MFCC features, random forest training
// and a small HTTP prediction service backed by a SQLite log

// Module declarations
pub mod analysis;
pub mod audio;
pub mod config;
pub mod dataset;
pub mod emotion;
pub mod error;
pub mod http;
pub mod inference;
pub mod model;
pub mod store;
pub mod training;

// Re-exports for convenience
pub use analysis::{FeatureVector, MfccExtractor, MFCC_COEFFICIENTS};
pub use config::AppConfig;
pub use emotion::Emotion;
pub use error::ErrorCode;
pub use inference::InferenceService;
pub use model::EmotionModel;
pub use store::{PredictionLog, PredictionRecord, SqlitePredictionLog};
pub use training::{Trainer, TrainingReport};

use tracing_subscriber::EnvFilter;

/// Install the global fmt subscriber
///
/// Honours `RUST_LOG`, defaulting to `info`. Output goes to stderr so CLI
/// results on stdout stay machine-readable. `log` records from the config
/// and error helpers are bridged into the same output. Calling it twice is a
/// no-op.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
