// Cepstral module - log compression and DCT
//
// Converts a mel power spectrogram to decibels, clamps the dynamic range to
// `top_db` below the loudest cell, then takes an orthonormal DCT-II of each
// frame to decorrelate the bands.

/// Floor applied before taking logs
pub const AMIN: f32 = 1e-10;

/// Convert power to decibels relative to 1.0, in place
///
/// Every cell is clamped to `max - top_db`, where `max` is taken over the
/// whole spectrogram rather than per frame.
pub fn power_to_db(spectrogram: &mut [Vec<f32>], top_db: f32) {
    let mut max_db = f32::NEG_INFINITY;
    for frame in spectrogram.iter_mut() {
        for cell in frame.iter_mut() {
            *cell = 10.0 * cell.max(AMIN).log10();
            max_db = max_db.max(*cell);
        }
    }

    if top_db > 0.0 && max_db.is_finite() {
        let floor = max_db - top_db;
        for cell in spectrogram.iter_mut().flatten() {
            *cell = cell.max(floor);
        }
    }
}

/// Orthonormal DCT-II basis truncated to the first `n_coefficients` rows
pub struct Dct {
    basis: Vec<Vec<f32>>,
}

impl Dct {
    /// # Arguments
    /// * `n_inputs` - Length of each input vector (number of mel bands)
    /// * `n_coefficients` - Output coefficients kept
    pub fn new(n_inputs: usize, n_coefficients: usize) -> Self {
        let n = n_inputs as f64;
        let basis = (0..n_coefficients)
            .map(|k| {
                let scale = if k == 0 {
                    (1.0 / n).sqrt()
                } else {
                    (2.0 / n).sqrt()
                };
                (0..n_inputs)
                    .map(|i| {
                        let angle = std::f64::consts::PI * k as f64 * (2 * i + 1) as f64 / (2.0 * n);
                        (scale * angle.cos()) as f32
                    })
                    .collect()
            })
            .collect();

        Self { basis }
    }

    pub fn apply(&self, input: &[f32]) -> Vec<f32> {
        self.basis
            .iter()
            .map(|row| row.iter().zip(input).map(|(b, x)| b * x).sum())
            .collect()
    }
}
