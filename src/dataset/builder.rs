// Builder - turn labeled paths into feature rows
//
// Paths in the label CSV were valid when the labeler ran but may have moved
// since, so each one is checked again. Missing files and clips the extractor
// rejects are logged and dropped; only an empty result aborts the build.

use super::{LabeledSample, TrainingSet};
use crate::analysis::MfccExtractor;
use crate::error::{log_decode_error, DatasetError};

/// Feature rows plus what was dropped on the way
#[derive(Debug, Clone, Default)]
pub struct ExtractedDataset {
    pub rows: TrainingSet,
    /// Rows whose file no longer exists
    pub missing: usize,
    /// Rows whose file exists but could not be decoded or analysed
    pub failed: usize,
}

/// Extracts one feature vector per labeled clip
pub struct DatasetBuilder {
    extractor: MfccExtractor,
}

impl DatasetBuilder {
    pub fn new(extractor: MfccExtractor) -> Self {
        Self { extractor }
    }

    pub fn extractor(&self) -> &MfccExtractor {
        &self.extractor
    }

    /// Extract features for every sample whose file still exists
    ///
    /// # Returns
    /// * `Err(DatasetError::EmptyDataset)` - No sample points at an existing file
    /// * `Err(DatasetError::NoFeatures)` - Every existing file failed extraction
    pub fn build(&self, samples: &[LabeledSample]) -> Result<ExtractedDataset, DatasetError> {
        let mut dataset = ExtractedDataset::default();

        let valid: Vec<&LabeledSample> = samples
            .iter()
            .filter(|sample| {
                let exists = sample.file_path.is_file();
                if !exists {
                    tracing::warn!("[Dataset] Missing file: {}", sample.file_path.display());
                }
                exists
            })
            .collect();
        dataset.missing = samples.len() - valid.len();

        if valid.is_empty() {
            return Err(DatasetError::EmptyDataset);
        }

        tracing::info!("[Dataset] Extracting features from {} files", valid.len());
        for (index, sample) in valid.iter().enumerate() {
            match self.extractor.extract_file(&sample.file_path) {
                Ok(features) => dataset.rows.push(features, sample.emotion),
                Err(err) => {
                    log_decode_error(&err, &sample.file_path.display().to_string());
                    dataset.failed += 1;
                }
            }

            if (index + 1) % 100 == 0 {
                tracing::info!("[Dataset] {}/{} files processed", index + 1, valid.len());
            }
        }

        if dataset.rows.is_empty() {
            return Err(DatasetError::NoFeatures);
        }

        tracing::info!(
            "[Dataset] Extracted {} feature rows ({} missing, {} failed)",
            dataset.rows.len(),
            dataset.missing,
            dataset.failed
        );
        Ok(dataset)
    }
}
