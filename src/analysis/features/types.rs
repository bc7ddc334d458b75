// Types module - Data structures for audio features
//
// A clip is summarised by the per-coefficient mean of its MFCC frames. The
// width is fixed so every row the forest sees has the same shape.

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Number of cepstral coefficients kept per frame
pub const MFCC_COEFFICIENTS: usize = 40;

/// Mean MFCC vector of one clip
///
/// Always exactly `MFCC_COEFFICIENTS` long. Construct through the extractor
/// or `FeatureVector::new`, which rejects any other width.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f32>", into = "Vec<f32>")]
pub struct FeatureVector(Vec<f32>);

impl FeatureVector {
    /// Wrap raw coefficients
    ///
    /// # Returns
    /// * `Err(ModelError::DimensionMismatch)` - `values` is not 40 long
    pub fn new(values: Vec<f32>) -> Result<Self, ModelError> {
        if values.len() != MFCC_COEFFICIENTS {
            return Err(ModelError::DimensionMismatch {
                expected: MFCC_COEFFICIENTS,
                actual: values.len(),
            });
        }
        Ok(Self(values))
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Vec<f32> {
        self.0
    }
}

impl TryFrom<Vec<f32>> for FeatureVector {
    type Error = ModelError;

    fn try_from(values: Vec<f32>) -> Result<Self, Self::Error> {
        Self::new(values)
    }
}

impl From<FeatureVector> for Vec<f32> {
    fn from(vector: FeatureVector) -> Self {
        vector.0
    }
}

impl AsRef<[f32]> for FeatureVector {
    fn as_ref(&self) -> &[f32] {
        &self.0
    }
}
