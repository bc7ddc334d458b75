// Dataset module - labeling, feature extraction and class balancing
//
// Batch-side preparation of the training set:
// - labeler: unpack the archive and derive labels from RAVDESS filenames
// - table: the `filepath,emotion` CSV handed from labeler to builder
// - builder: revalidate paths and extract one FeatureVector per clip
// - smote: oversample minority classes up to the majority count

pub mod builder;
pub mod labeler;
pub mod smote;
pub mod table;

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::analysis::FeatureVector;
use crate::emotion::Emotion;

pub use builder::{DatasetBuilder, ExtractedDataset};
pub use labeler::{
    extract_archive, label_directory, parse_filename, run_labeling, LabelingReport,
    RavdessFilename,
};
pub use smote::{describe_counts, Smote};
pub use table::{read_labels, write_labels};

/// One labeled clip
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabeledSample {
    /// Absolute path, valid when the row was produced
    pub file_path: PathBuf,
    pub emotion: Emotion,
}

/// Parallel feature rows and labels
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainingSet {
    pub features: Vec<FeatureVector>,
    pub labels: Vec<Emotion>,
}

impl TrainingSet {
    pub fn push(&mut self, features: FeatureVector, label: Emotion) {
        self.features.push(features);
        self.labels.push(label);
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Rows per label, in label order
    pub fn class_counts(&self) -> BTreeMap<Emotion, usize> {
        let mut counts = BTreeMap::new();
        for label in &self.labels {
            *counts.entry(*label).or_insert(0) += 1;
        }
        counts
    }
}
