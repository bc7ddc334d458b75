// Forest - smartcore random forest over class indices
//
// Wraps `RandomForestClassifier` with the shape checks smartcore leaves to
// the caller: rectangular rows, labels inside `0..n_classes`, and a fixed
// feature width at prediction time. Trees are grown from a single seed, so a
// forest is fully determined by its parameters and training rows.

use serde::{Deserialize, Serialize};
use smartcore::ensemble::random_forest_classifier::{
    RandomForestClassifier, RandomForestClassifierParameters,
};
use smartcore::error::Failed;
use smartcore::linalg::basic::matrix::DenseMatrix;

use crate::config::TrainingConfig;
use crate::error::ModelError;

type Classifier = RandomForestClassifier<f32, u32, DenseMatrix<f32>, Vec<u32>>;

/// Random forest hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_trees: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub seed: u64,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self::from(&TrainingConfig::default())
    }
}

impl From<&TrainingConfig> for ForestParams {
    fn from(config: &TrainingConfig) -> Self {
        Self {
            n_trees: config.n_trees,
            max_depth: config.max_depth,
            min_samples_split: config.min_samples_split,
            seed: config.seed,
        }
    }
}

impl ForestParams {
    /// smartcore takes tree count and depth as `u16`; larger values saturate
    fn classifier_parameters(&self) -> RandomForestClassifierParameters {
        RandomForestClassifierParameters::default()
            .with_n_trees(saturate_u16(self.n_trees))
            .with_max_depth(saturate_u16(self.max_depth))
            .with_min_samples_split(self.min_samples_split)
            .with_seed(self.seed)
    }
}

fn saturate_u16(value: usize) -> u16 {
    u16::try_from(value).unwrap_or(u16::MAX)
}

/// Fitted forest over class indices `0..n_classes`
#[derive(Debug, Serialize, Deserialize)]
pub struct RandomForest {
    n_classes: usize,
    n_features: usize,
    n_trees: usize,
    classifier: Classifier,
}

impl RandomForest {
    /// Fit the forest
    ///
    /// # Arguments
    /// * `features` - One row per sample, all the same width
    /// * `labels` - Class index per row, each `< n_classes`
    ///
    /// # Returns
    /// * `Err(ModelError::EmptyTrainingSet)` - No rows
    /// * `Err(ModelError::DimensionMismatch)` - Ragged rows or label count mismatch
    /// * `Err(ModelError::Backend)` - Label out of range or smartcore refused the data
    pub fn fit(
        features: &[&[f32]],
        labels: &[usize],
        n_classes: usize,
        params: &ForestParams,
    ) -> Result<Self, ModelError> {
        if features.is_empty() || n_classes == 0 {
            return Err(ModelError::EmptyTrainingSet);
        }
        if labels.len() != features.len() {
            return Err(ModelError::DimensionMismatch {
                expected: features.len(),
                actual: labels.len(),
            });
        }

        let n_features = features[0].len();
        if let Some(row) = features.iter().find(|row| row.len() != n_features) {
            return Err(ModelError::DimensionMismatch {
                expected: n_features,
                actual: row.len(),
            });
        }

        let y = labels
            .iter()
            .map(|&label| {
                if label < n_classes {
                    u32::try_from(label).map_err(|err| backend_error(err.to_string()))
                } else {
                    Err(backend_error(format!(
                        "label {} outside 0..{}",
                        label, n_classes
                    )))
                }
            })
            .collect::<Result<Vec<u32>, _>>()?;

        let rows: Vec<Vec<f32>> = features.iter().map(|row| row.to_vec()).collect();
        let x = DenseMatrix::from_2d_vec(&rows);
        let classifier =
            Classifier::fit(&x, &y, params.classifier_parameters()).map_err(from_failed)?;

        Ok(Self {
            n_classes,
            n_features,
            n_trees: params.n_trees,
            classifier,
        })
    }

    pub fn n_classes(&self) -> usize {
        self.n_classes
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn n_trees(&self) -> usize {
        self.n_trees
    }

    /// Majority-vote class index for one row
    pub fn predict(&self, row: &[f32]) -> Result<usize, ModelError> {
        if row.len() != self.n_features {
            return Err(ModelError::DimensionMismatch {
                expected: self.n_features,
                actual: row.len(),
            });
        }

        let x = DenseMatrix::from_2d_vec(&vec![row.to_vec()]);
        let predicted = self.classifier.predict(&x).map_err(from_failed)?;
        let index = predicted
            .first()
            .map(|&class| class as usize)
            .ok_or_else(|| backend_error("empty prediction".to_string()))?;

        if index >= self.n_classes {
            return Err(backend_error(format!(
                "predicted class {} outside 0..{}",
                index, self.n_classes
            )));
        }
        Ok(index)
    }
}

fn backend_error(reason: String) -> ModelError {
    ModelError::Backend { reason }
}

fn from_failed(err: Failed) -> ModelError {
    backend_error(err.to_string())
}
