// Split - seeded train/test partition and evaluation

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::error::DatasetError;

/// Row indices for each side of a split
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Shuffle `0..n` with `seed` and hold out `ceil(test_fraction * n)` rows
///
/// # Returns
/// * `Err(DatasetError::InsufficientSamples)` - Either side would be empty
pub fn train_test_split(
    n: usize,
    test_fraction: f64,
    seed: u64,
) -> Result<SplitIndices, DatasetError> {
    let n_test = (test_fraction.clamp(0.0, 1.0) * n as f64).ceil() as usize;
    if n_test == 0 || n_test >= n {
        return Err(DatasetError::InsufficientSamples {
            required: 2,
            found: n,
        });
    }

    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(&mut StdRng::seed_from_u64(seed));
    let train = indices.split_off(n_test);

    Ok(SplitIndices {
        train,
        test: indices,
    })
}

/// Fraction of positions where `predicted` equals `expected`
pub fn accuracy<T: PartialEq>(predicted: &[T], expected: &[T]) -> f64 {
    if expected.is_empty() {
        return 0.0;
    }
    let correct = predicted
        .iter()
        .zip(expected)
        .filter(|(p, e)| p == e)
        .count();
    correct as f64 / expected.len() as f64
}
