// Inference service - upload to recorded prediction
//
// Stateless apart from the shared, read-only model and the prediction log.
// All methods block (file I/O, DSP, SQLite); async callers run them on the
// blocking pool.

pub mod upload;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use crate::analysis::MfccExtractor;
use crate::config::AppConfig;
use crate::emotion::Emotion;
use crate::error::{InferenceError, StartupError};
use crate::model::EmotionModel;
use crate::store::{
    append_with_retry, PredictionLog, PredictionRecord, RetryPolicy, SqlitePredictionLog,
};

pub use upload::{sanitize_extension, ScopedUpload};

const PENDING: u8 = 0;
const RECORDING: u8 = 1;
const EXPIRED: u8 = 2;

/// Race between a caller's deadline and the log write
///
/// The prediction claims it right before appending to the log; the caller
/// expires it when time runs out. Only the first transition sticks.
#[derive(Clone, Debug, Default)]
pub struct Deadline(Arc<AtomicU8>);

impl Deadline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the deadline as passed
    ///
    /// Returns `false` when the prediction is already being recorded.
    pub fn expire(&self) -> bool {
        match self
            .0
            .compare_exchange(PENDING, EXPIRED, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => true,
            Err(state) => state == EXPIRED,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.0.load(Ordering::Acquire) == EXPIRED
    }

    fn claim(&self) -> bool {
        match self
            .0
            .compare_exchange(PENDING, RECORDING, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => true,
            Err(state) => state == RECORDING,
        }
    }
}

/// Shared prediction pipeline
///
/// Cheap to clone: every clone points at the same model and log.
#[derive(Clone)]
pub struct InferenceService {
    model: Arc<EmotionModel>,
    extractor: MfccExtractor,
    log: Arc<dyn PredictionLog>,
    upload_dir: PathBuf,
    retry: RetryPolicy,
}

impl InferenceService {
    /// Create a service around an already-loaded model
    ///
    /// Features are extracted with the configuration stored in the model, not
    /// the current config file, so inference matches training.
    pub fn new(
        model: Arc<EmotionModel>,
        log: Arc<dyn PredictionLog>,
        upload_dir: PathBuf,
        retry: RetryPolicy,
    ) -> Self {
        let extractor = MfccExtractor::new(model.feature_config());
        Self {
            model,
            extractor,
            log,
            upload_dir,
            retry,
        }
    }

    /// Build the service from configuration: load model, open log, prepare
    /// the upload directory
    pub fn bootstrap(config: &AppConfig) -> Result<Self, StartupError> {
        let model =
            EmotionModel::load(&config.paths.model).map_err(StartupError::ModelUnavailable)?;
        let log =
            SqlitePredictionLog::open(&config.paths.database).map_err(StartupError::StoreUnavailable)?;

        std::fs::create_dir_all(&config.paths.upload_dir).map_err(|err| {
            StartupError::UploadDir {
                path: config.paths.upload_dir.clone(),
                reason: err.to_string(),
            }
        })?;

        tracing::info!(
            "[InferenceService] Ready: {} trees, log at {}, uploads in {}",
            model.n_trees(),
            config.paths.database.display(),
            config.paths.upload_dir.display()
        );

        Ok(Self::new(
            Arc::new(model),
            Arc::new(log),
            config.paths.upload_dir.clone(),
            RetryPolicy::from(&config.server),
        ))
    }

    pub fn model(&self) -> &EmotionModel {
        &self.model
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    /// Classify an uploaded clip and record the result
    ///
    /// # Arguments
    /// * `file_name` - Client-supplied filename, only its extension is used
    /// * `bytes` - Raw upload body
    ///
    /// # Returns
    /// * `Ok(Emotion)` - Prediction was made and recorded
    /// * `Err(InferenceError)` - See variant docs; temp files are removed either way
    pub fn predict_upload(
        &self,
        file_name: Option<&str>,
        bytes: &[u8],
    ) -> Result<Emotion, InferenceError> {
        self.predict_upload_before(file_name, bytes, &Deadline::new())
    }

    /// Same as [`predict_upload`](Self::predict_upload), but nothing is
    /// recorded once `deadline` has expired
    ///
    /// Returns `InferenceError::Cancelled` in that case.
    pub fn predict_upload_before(
        &self,
        file_name: Option<&str>,
        bytes: &[u8],
        deadline: &Deadline,
    ) -> Result<Emotion, InferenceError> {
        let emotion = self.classify_bytes(file_name, bytes)?;

        if !deadline.claim() {
            tracing::warn!(
                "[InferenceService] Dropping {} prediction, caller timed out",
                emotion
            );
            return Err(InferenceError::Cancelled);
        }

        append_with_retry(self.log.as_ref(), &PredictionRecord { emotion }, &self.retry)?;
        tracing::info!("[InferenceService] Predicted {}", emotion);
        Ok(emotion)
    }

    /// Classify a clip on disk without recording it
    ///
    /// Runs the same staging and transcoding as uploads, so any container the
    /// service accepts works here too.
    pub fn predict_file(&self, path: &Path) -> Result<Emotion, InferenceError> {
        let bytes = std::fs::read(path).map_err(|err| InferenceError::Io {
            reason: format!("{}: {}", path.display(), err),
        })?;
        let file_name = path.file_name().and_then(|name| name.to_str());
        self.classify_bytes(file_name, &bytes)
    }

    /// Every recorded prediction, oldest first
    pub fn history(&self) -> Result<Vec<PredictionRecord>, InferenceError> {
        Ok(self.log.all()?)
    }

    fn classify_bytes(
        &self,
        file_name: Option<&str>,
        bytes: &[u8],
    ) -> Result<Emotion, InferenceError> {
        if bytes.is_empty() {
            return Err(InferenceError::UnprocessableInput {
                reason: "empty upload".to_string(),
            });
        }

        let mut upload = ScopedUpload::create(&self.upload_dir, file_name, bytes)?;
        let wav_path = upload.normalize()?;
        self.classify(wav_path)
    }

    fn classify(&self, wav_path: &Path) -> Result<Emotion, InferenceError> {
        let features = self.extractor.extract_file(wav_path)?;
        Ok(self.model.predict(&features)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{FeatureVector, MFCC_COEFFICIENTS};
    use crate::audio::write_mono_wav;
    use crate::config::FeatureConfig;
    use crate::error::PersistenceError;
    use crate::model::ForestParams;
    use std::io::Cursor;

    fn tone(frequency: f32, seconds: f32) -> Vec<f32> {
        (0..(22_050.0 * seconds) as usize)
            .map(|i| 0.5 * (2.0 * std::f32::consts::PI * frequency * i as f32 / 22_050.0).sin())
            .collect()
    }

    fn wav_bytes(samples: &[f32]) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 22_050,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for &s in samples {
                writer.write_sample((s * i16::MAX as f32) as i16).unwrap();
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    /// Model trained on two tones, one per class
    fn tone_model() -> EmotionModel {
        let extractor = MfccExtractor::new(&FeatureConfig::default());
        let dir = tempfile::tempdir().unwrap();
        let mut features: Vec<FeatureVector> = Vec::new();
        let mut labels = Vec::new();
        for (i, (frequency, label)) in [(150.0, Emotion::Calm), (3_000.0, Emotion::Angry)]
            .iter()
            .enumerate()
        {
            for k in 0..6 {
                let path = dir.path().join(format!("{}-{}.wav", i, k));
                write_mono_wav(&path, &tone(frequency + k as f32 * 5.0, 2.0), 22_050).unwrap();
                features.push(extractor.extract_file(&path).unwrap());
                labels.push(*label);
            }
        }
        assert_eq!(features[0].len(), MFCC_COEFFICIENTS);
        let params = ForestParams {
            n_trees: 10,
            ..ForestParams::default()
        };
        EmotionModel::fit(&features, &labels, &FeatureConfig::default(), &params).unwrap()
    }

    struct BrokenLog;

    impl PredictionLog for BrokenLog {
        fn append(&self, _record: &PredictionRecord) -> Result<(), PersistenceError> {
            Err(PersistenceError::Write {
                reason: "disk I/O error".to_string(),
            })
        }

        fn all(&self) -> Result<Vec<PredictionRecord>, PersistenceError> {
            Ok(Vec::new())
        }
    }

    fn service(dir: &Path, log: Arc<dyn PredictionLog>) -> InferenceService {
        InferenceService::new(
            Arc::new(tone_model()),
            log,
            dir.to_path_buf(),
            RetryPolicy {
                attempts: 2,
                backoff: std::time::Duration::from_millis(1),
            },
        )
    }

    fn file_count(dir: &Path) -> usize {
        std::fs::read_dir(dir).unwrap().count()
    }

    #[test]
    fn test_predict_upload_records_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let log = Arc::new(SqlitePredictionLog::in_memory().unwrap());
        let service = service(dir.path(), log);

        let bytes = wav_bytes(&tone(3_010.0, 2.0));
        let first = service.predict_upload(Some("clip.wav"), &bytes).unwrap();
        let second = service.predict_upload(Some("clip.wav"), &bytes).unwrap();

        assert_eq!(first, Emotion::Angry);
        assert_eq!(first, second);
        assert_eq!(
            service.history().unwrap(),
            vec![PredictionRecord { emotion: first }; 2]
        );
        assert_eq!(file_count(dir.path()), 0);
    }

    #[test]
    fn test_upload_with_misleading_extension_is_transcoded() {
        let dir = tempfile::tempdir().unwrap();
        let log = Arc::new(SqlitePredictionLog::in_memory().unwrap());
        let service = service(dir.path(), log);

        let bytes = wav_bytes(&tone(155.0, 2.0));
        let emotion = service.predict_upload(Some("recording.webm"), &bytes).unwrap();
        assert_eq!(emotion, Emotion::Calm);
        assert_eq!(file_count(dir.path()), 0);
    }

    #[test]
    fn test_short_and_garbage_uploads_are_unprocessable() {
        let dir = tempfile::tempdir().unwrap();
        let log = Arc::new(SqlitePredictionLog::in_memory().unwrap());
        let service = service(dir.path(), log.clone());

        let short = wav_bytes(&tone(440.0, 0.3));
        for (name, bytes) in [
            (Some("short.wav"), short),
            (Some("noise.wav"), b"not a wav file at all".to_vec()),
            (None, Vec::new()),
        ] {
            let err = service.predict_upload(name, &bytes).unwrap_err();
            assert!(
                matches!(err, InferenceError::UnprocessableInput { .. }),
                "{:?}",
                err
            );
        }

        assert!(log.all().unwrap().is_empty());
        assert_eq!(file_count(dir.path()), 0);
    }

    #[test]
    fn test_truncated_wav_upload_is_unprocessable() {
        let dir = tempfile::tempdir().unwrap();
        let log = Arc::new(SqlitePredictionLog::in_memory().unwrap());
        let service = service(dir.path(), log.clone());

        let full = wav_bytes(&tone(3_000.0, 2.0));
        let err = service
            .predict_upload(Some("clip.wav"), &full[..full.len() / 2])
            .unwrap_err();
        assert!(
            matches!(err, InferenceError::UnprocessableInput { .. }),
            "{:?}",
            err
        );
        assert!(log.all().unwrap().is_empty());
        assert_eq!(file_count(dir.path()), 0);
    }

    #[test]
    fn test_expired_deadline_skips_the_log() {
        let dir = tempfile::tempdir().unwrap();
        let log = Arc::new(SqlitePredictionLog::in_memory().unwrap());
        let service = service(dir.path(), log.clone());

        let deadline = Deadline::new();
        assert!(deadline.expire());
        assert!(deadline.is_expired());

        let bytes = wav_bytes(&tone(3_000.0, 2.0));
        let err = service
            .predict_upload_before(Some("clip.wav"), &bytes, &deadline)
            .unwrap_err();
        assert_eq!(err, InferenceError::Cancelled);
        assert!(log.all().unwrap().is_empty());
        assert_eq!(file_count(dir.path()), 0);
    }

    #[test]
    fn test_recorded_prediction_cannot_be_expired() {
        let dir = tempfile::tempdir().unwrap();
        let log = Arc::new(SqlitePredictionLog::in_memory().unwrap());
        let service = service(dir.path(), log.clone());

        let deadline = Deadline::new();
        let bytes = wav_bytes(&tone(150.0, 2.0));
        let emotion = service
            .predict_upload_before(Some("clip.wav"), &bytes, &deadline)
            .unwrap();

        assert!(!deadline.expire());
        assert!(!deadline.is_expired());
        assert_eq!(log.all().unwrap(), vec![PredictionRecord { emotion }]);
    }

    #[test]
    fn test_predict_file_transcodes_and_records_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let staging = dir.path().join("staging");
        std::fs::create_dir_all(&staging).unwrap();
        let log = Arc::new(SqlitePredictionLog::in_memory().unwrap());
        let service = service(&staging, log.clone());

        // WAV content behind a non-WAV extension goes through the transcoder
        let clip = dir.path().join("clip.ogg");
        std::fs::write(&clip, wav_bytes(&tone(3_020.0, 2.0))).unwrap();
        assert_eq!(service.predict_file(&clip).unwrap(), Emotion::Angry);

        let err = service.predict_file(&dir.path().join("absent.wav")).unwrap_err();
        assert!(matches!(err, InferenceError::Io { .. }), "{:?}", err);

        assert!(log.all().unwrap().is_empty());
        assert_eq!(file_count(&staging), 0);
    }

    #[test]
    fn test_persistence_failure_surfaces_after_retries() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path(), Arc::new(BrokenLog));

        let bytes = wav_bytes(&tone(3_000.0, 2.0));
        let err = service.predict_upload(Some("clip.wav"), &bytes).unwrap_err();
        assert!(matches!(err, InferenceError::Persistence(_)));
        assert_eq!(file_count(dir.path()), 0);
    }

    #[test]
    fn test_bootstrap_without_model_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.paths.model = dir.path().join("missing.json");
        config.paths.database = dir.path().join("emotions.db");
        config.paths.upload_dir = dir.path().join("uploads");

        match InferenceService::bootstrap(&config) {
            Err(StartupError::ModelUnavailable(_)) => {}
            Err(other) => panic!("unexpected error {:?}", other),
            Ok(_) => panic!("bootstrap should fail without a model"),
        }
    }

    #[test]
    fn test_bootstrap_prepares_store_and_upload_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AppConfig::default();
        config.paths.model = dir.path().join("model").join("emotion_model.json");
        config.paths.database = dir.path().join("data").join("emotions.db");
        config.paths.upload_dir = dir.path().join("data").join("audio_samples");
        tone_model().save(&config.paths.model).unwrap();

        let service = InferenceService::bootstrap(&config).unwrap();
        assert!(config.paths.upload_dir.is_dir());
        assert!(service.history().unwrap().is_empty());
        assert_eq!(service.model().n_trees(), 10);
    }
}
