// Training job - labels CSV to persisted model
//
// read CSV -> revalidate + extract -> SMOTE -> seeded split -> fit forest
// -> evaluate on the held-out rows -> save artifact.
//
// Balancing happens before the split, so synthetic rows can land in the
// test set.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use crate::analysis::MfccExtractor;
use crate::config::AppConfig;
use crate::dataset::{describe_counts, read_labels, DatasetBuilder, Smote, TrainingSet};
use crate::emotion::Emotion;
use crate::error::{DatasetError, ErrorCode, ModelError};
use crate::model::{accuracy, train_test_split, EmotionModel, ForestParams};

/// Failure of a training run
#[derive(Debug, Clone, PartialEq)]
pub enum TrainingError {
    Dataset(DatasetError),
    Model(ModelError),
}

impl ErrorCode for TrainingError {
    fn code(&self) -> i32 {
        match self {
            TrainingError::Dataset(err) => err.code(),
            TrainingError::Model(err) => err.code(),
        }
    }

    fn message(&self) -> String {
        match self {
            TrainingError::Dataset(err) => err.message(),
            TrainingError::Model(err) => err.message(),
        }
    }
}

impl fmt::Display for TrainingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrainingError::Dataset(err) => err.fmt(f),
            TrainingError::Model(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for TrainingError {}

impl From<DatasetError> for TrainingError {
    fn from(err: DatasetError) -> Self {
        TrainingError::Dataset(err)
    }
}

impl From<ModelError> for TrainingError {
    fn from(err: ModelError) -> Self {
        TrainingError::Model(err)
    }
}

/// Summary of one training run
#[derive(Debug, Clone)]
pub struct TrainingReport {
    /// Rows read from the CSV
    pub labeled: usize,
    pub missing_files: usize,
    pub failed_extractions: usize,
    pub counts_before_balancing: BTreeMap<Emotion, usize>,
    pub counts_after_balancing: BTreeMap<Emotion, usize>,
    pub train_rows: usize,
    pub test_rows: usize,
    /// Exact-match fraction on the test rows, 0.0..=1.0
    pub accuracy: f64,
    pub model_path: PathBuf,
}

impl TrainingReport {
    /// `Model Accuracy: NN.NN%`
    pub fn accuracy_line(&self) -> String {
        format!("Model Accuracy: {:.2}%", self.accuracy * 100.0)
    }
}

/// Runs the full training pipeline from an `AppConfig`
pub struct Trainer {
    config: AppConfig,
}

impl Trainer {
    pub fn new(config: AppConfig) -> Self {
        Self { config }
    }

    /// Train, evaluate and save the model
    ///
    /// Nothing is written unless every stage succeeds; an existing artifact
    /// is only replaced by a complete new one.
    pub fn run(&self) -> Result<TrainingReport, TrainingError> {
        let paths = &self.config.paths;
        let training = &self.config.training;

        tracing::info!("[Trainer] Loading labels from {}", paths.labels_csv.display());
        let samples = read_labels(&paths.labels_csv)?;
        if samples.is_empty() {
            return Err(DatasetError::EmptyDataset.into());
        }

        let builder = DatasetBuilder::new(MfccExtractor::new(&self.config.features));
        let extracted = builder.build(&samples)?;
        let counts_before_balancing = extracted.rows.class_counts();
        tracing::info!(
            "[Trainer] Class counts before balancing: {}",
            describe_counts(&extracted.rows)
        );

        let balanced = Smote::new(training.smote_k_neighbors, training.seed).balance(&extracted.rows);
        tracing::info!(
            "[Trainer] Class counts after balancing: {}",
            describe_counts(&balanced)
        );

        let split = train_test_split(balanced.len(), training.test_fraction, training.seed)?;
        let train = subset(&balanced, &split.train);
        let test = subset(&balanced, &split.test);

        let params = ForestParams::from(training);
        tracing::info!(
            "[Trainer] Fitting {} trees on {} rows ({} held out)",
            params.n_trees,
            train.len(),
            test.len()
        );
        let model = EmotionModel::fit(
            &train.features,
            &train.labels,
            builder.extractor().config(),
            &params,
        )?;

        let predicted = test
            .features
            .iter()
            .map(|features| model.predict(features))
            .collect::<Result<Vec<_>, _>>()?;
        let score = accuracy(&predicted, &test.labels);

        let report = TrainingReport {
            labeled: samples.len(),
            missing_files: extracted.missing,
            failed_extractions: extracted.failed,
            counts_before_balancing,
            counts_after_balancing: balanced.class_counts(),
            train_rows: train.len(),
            test_rows: test.len(),
            accuracy: score,
            model_path: paths.model.clone(),
        };
        tracing::info!("[Trainer] {}", report.accuracy_line());

        model.save(&paths.model)?;
        Ok(report)
    }
}

fn subset(set: &TrainingSet, indices: &[usize]) -> TrainingSet {
    let mut out = TrainingSet::default();
    for &i in indices {
        out.push(set.features[i].clone(), set.labels[i]);
    }
    out
}
