// Model module - the persisted emotion classifier
//
// `EmotionModel` bundles the forest with everything inference needs to
// reproduce training conditions: the ordered class list and the feature
// parameters the training rows were extracted with. It is serialized as a
// single JSON artifact that retraining overwrites atomically.

pub mod forest;
pub mod split;

use std::fs;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::analysis::{FeatureVector, MFCC_COEFFICIENTS};
use crate::config::FeatureConfig;
use crate::emotion::Emotion;
use crate::error::ModelError;

pub use forest::{ForestParams, RandomForest};
pub use split::{accuracy, train_test_split, SplitIndices};

/// Artifact format version written by this build
pub const MODEL_FORMAT_VERSION: u32 = 1;

/// Trained, immutable emotion classifier
#[derive(Debug, Serialize, Deserialize)]
pub struct EmotionModel {
    version: u32,
    feature_config: FeatureConfig,
    /// Class index -> label, sorted
    classes: Vec<Emotion>,
    params: ForestParams,
    forest: RandomForest,
}

impl EmotionModel {
    /// Fit a model on labeled feature rows
    ///
    /// # Arguments
    /// * `features` - Training rows
    /// * `labels` - Label per row
    /// * `feature_config` - Parameters the rows were extracted with
    /// * `params` - Forest hyperparameters
    pub fn fit(
        features: &[FeatureVector],
        labels: &[Emotion],
        feature_config: &FeatureConfig,
        params: &ForestParams,
    ) -> Result<Self, ModelError> {
        if features.is_empty() {
            return Err(ModelError::EmptyTrainingSet);
        }

        let mut classes: Vec<Emotion> = labels.to_vec();
        classes.sort();
        classes.dedup();

        let indices: Vec<usize> = labels
            .iter()
            .map(|label| classes.binary_search(label).unwrap_or(0))
            .collect();
        let rows: Vec<&[f32]> = features.iter().map(FeatureVector::as_slice).collect();

        let forest = RandomForest::fit(&rows, &indices, classes.len(), params)?;

        Ok(Self {
            version: MODEL_FORMAT_VERSION,
            feature_config: feature_config.clone(),
            classes,
            params: params.clone(),
            forest,
        })
    }

    /// Predict the label of one feature vector
    pub fn predict(&self, features: &FeatureVector) -> Result<Emotion, ModelError> {
        let index = self.forest.predict(features.as_slice())?;
        self.classes
            .get(index)
            .copied()
            .ok_or_else(|| ModelError::Backend {
                reason: format!("no label for class {}", index),
            })
    }

    pub fn classes(&self) -> &[Emotion] {
        &self.classes
    }

    pub fn feature_config(&self) -> &FeatureConfig {
        &self.feature_config
    }

    pub fn params(&self) -> &ForestParams {
        &self.params
    }

    pub fn n_trees(&self) -> usize {
        self.forest.n_trees()
    }

    /// Write the artifact to `path`, replacing any previous one
    ///
    /// The JSON is written to a temp file in the same directory and renamed
    /// into place, so readers never observe a partial artifact.
    pub fn save(&self, path: &Path) -> Result<(), ModelError> {
        let io_err = |reason: String| ModelError::Io {
            path: path.to_path_buf(),
            reason,
        };

        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).map_err(|err| io_err(err.to_string()))?;

        let mut temp =
            tempfile::NamedTempFile::new_in(dir).map_err(|err| io_err(err.to_string()))?;
        {
            let mut writer = BufWriter::new(temp.as_file_mut());
            serde_json::to_writer(&mut writer, self).map_err(|err| io_err(err.to_string()))?;
            writer.flush().map_err(|err| io_err(err.to_string()))?;
        }
        temp.as_file()
            .sync_all()
            .map_err(|err| io_err(err.to_string()))?;
        temp.persist(path)
            .map_err(|err| io_err(err.error.to_string()))?;

        tracing::info!(
            "[Model] Saved {} trees over {} classes to {}",
            self.n_trees(),
            self.classes.len(),
            path.display()
        );
        Ok(())
    }

    /// Load and validate an artifact
    ///
    /// # Returns
    /// * `Err(ModelError::Missing)` - No file at `path`
    /// * `Err(ModelError::Corrupt)` - Unparseable, unknown version, or
    ///   structurally inconsistent (including a feature width other than 40)
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let file = match fs::File::open(path) {
            Ok(file) => file,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(ModelError::Missing {
                    path: path.to_path_buf(),
                })
            }
            Err(err) => {
                return Err(ModelError::Io {
                    path: path.to_path_buf(),
                    reason: err.to_string(),
                })
            }
        };

        let corrupt = |reason: String| ModelError::Corrupt {
            path: path.to_path_buf(),
            reason,
        };

        let model: Self =
            serde_json::from_reader(BufReader::new(file)).map_err(|err| corrupt(err.to_string()))?;

        if model.version != MODEL_FORMAT_VERSION {
            return Err(corrupt(format!(
                "unsupported format version {}",
                model.version
            )));
        }
        if model.forest.n_features() != MFCC_COEFFICIENTS {
            return Err(corrupt(format!(
                "forest expects {} features, extractor produces {}",
                model.forest.n_features(),
                MFCC_COEFFICIENTS
            )));
        }
        if model.classes.is_empty() || model.classes.len() != model.forest.n_classes() {
            return Err(corrupt(format!(
                "{} labels for {} forest classes",
                model.classes.len(),
                model.forest.n_classes()
            )));
        }
        if model.forest.n_trees() != model.params.n_trees {
            return Err(corrupt(format!(
                "{} trees recorded, parameters ask for {}",
                model.forest.n_trees(),
                model.params.n_trees
            )));
        }

        tracing::info!(
            "[Model] Loaded {} trees, classes [{}] from {}",
            model.n_trees(),
            model
                .classes
                .iter()
                .map(Emotion::as_str)
                .collect::<Vec<_>>()
                .join(", "),
            path.display()
        );
        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toy_model(n_trees: usize) -> EmotionModel {
        let mut features = Vec::new();
        let mut labels = Vec::new();
        for (i, label) in [Emotion::Angry, Emotion::Calm, Emotion::Sad].iter().enumerate() {
            for j in 0..10 {
                let value = i as f32 * 10.0 + j as f32 * 0.1;
                features.push(FeatureVector::new(vec![value; MFCC_COEFFICIENTS]).unwrap());
                labels.push(*label);
            }
        }
        let params = ForestParams {
            n_trees,
            ..ForestParams::default()
        };
        EmotionModel::fit(&features, &labels, &FeatureConfig::default(), &params).unwrap()
    }

    fn vector(value: f32) -> FeatureVector {
        FeatureVector::new(vec![value; MFCC_COEFFICIENTS]).unwrap()
    }

    #[test]
    fn test_classes_are_sorted_and_unique() {
        let model = toy_model(5);
        assert_eq!(model.classes(), &[Emotion::Calm, Emotion::Sad, Emotion::Angry]);
    }

    #[test]
    fn test_predict() {
        let model = toy_model(10);
        assert_eq!(model.predict(&vector(0.5)).unwrap(), Emotion::Angry);
        assert_eq!(model.predict(&vector(10.5)).unwrap(), Emotion::Calm);
        assert_eq!(model.predict(&vector(20.5)).unwrap(), Emotion::Sad);
    }

    #[test]
    fn test_save_load_roundtrip_predicts_identically() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model").join("emotion_model.json");
        let model = toy_model(8);
        model.save(&path).unwrap();

        let loaded = EmotionModel::load(&path).unwrap();
        assert_eq!(loaded.classes(), model.classes());
        assert_eq!(loaded.n_trees(), model.n_trees());
        assert_eq!(loaded.feature_config(), model.feature_config());
        for value in [0.0, 3.3, 9.9, 14.0, 25.0] {
            assert_eq!(
                loaded.predict(&vector(value)).unwrap(),
                model.predict(&vector(value)).unwrap()
            );
        }

        // Only the artifact remains, no temp files
        let entries: Vec<_> = fs::read_dir(path.parent().unwrap()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_save_overwrites_previous_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("emotion_model.json");
        toy_model(3).save(&path).unwrap();
        toy_model(6).save(&path).unwrap();
        assert_eq!(EmotionModel::load(&path).unwrap().n_trees(), 6);
    }

    #[test]
    fn test_load_missing() {
        let err = EmotionModel::load(Path::new("/nonexistent/model.json")).unwrap_err();
        assert!(matches!(err, ModelError::Missing { .. }));
    }

    #[test]
    fn test_load_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            EmotionModel::load(&path).unwrap_err(),
            ModelError::Corrupt { .. }
        ));
    }

    #[test]
    fn test_load_rejects_wrong_feature_width() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");

        let rows: Vec<Vec<f32>> = (0..10).map(|i| vec![i as f32; 13]).collect();
        let slices: Vec<&[f32]> = rows.iter().map(|r| r.as_slice()).collect();
        let labels: Vec<usize> = (0..10).map(|i| i % 2).collect();
        let params = ForestParams {
            n_trees: 4,
            ..ForestParams::default()
        };
        let forest = RandomForest::fit(&slices, &labels, 2, &params).unwrap();
        let model = EmotionModel {
            version: MODEL_FORMAT_VERSION,
            feature_config: FeatureConfig::default(),
            classes: vec![Emotion::Happy, Emotion::Sad],
            params,
            forest,
        };
        fs::write(&path, serde_json::to_string(&model).unwrap()).unwrap();

        match EmotionModel::load(&path).unwrap_err() {
            ModelError::Corrupt { reason, .. } => assert!(reason.contains("13"), "{}", reason),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_load_rejects_label_count_mismatch() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        let mut model = toy_model(4);
        model.classes.pop();
        fs::write(&path, serde_json::to_string(&model).unwrap()).unwrap();

        match EmotionModel::load(&path).unwrap_err() {
            ModelError::Corrupt { reason, .. } => {
                assert!(reason.contains("2 labels for 3"), "{}", reason)
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_fit_empty() {
        let err = EmotionModel::fit(&[], &[], &FeatureConfig::default(), &ForestParams::default())
            .unwrap_err();
        assert_eq!(err, ModelError::EmptyTrainingSet);
    }
}
