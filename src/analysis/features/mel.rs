// Mel module - Slaney-style mel filterbank
//
// Triangular filters spaced evenly on the Slaney mel scale (linear below
// 1 kHz, logarithmic above) between 0 Hz and Nyquist, each scaled to unit
// area so wide high-frequency bands don't dominate.

const F_SP: f64 = 200.0 / 3.0;
const MIN_LOG_HZ: f64 = 1000.0;
const MIN_LOG_MEL: f64 = MIN_LOG_HZ / F_SP;

fn log_step() -> f64 {
    6.4f64.ln() / 27.0
}

/// Convert Hz to Slaney mels
pub fn hz_to_mel(hz: f64) -> f64 {
    if hz >= MIN_LOG_HZ {
        MIN_LOG_MEL + (hz / MIN_LOG_HZ).ln() / log_step()
    } else {
        hz / F_SP
    }
}

/// Convert Slaney mels to Hz
pub fn mel_to_hz(mel: f64) -> f64 {
    if mel >= MIN_LOG_MEL {
        MIN_LOG_HZ * (log_step() * (mel - MIN_LOG_MEL)).exp()
    } else {
        mel * F_SP
    }
}

/// Centre frequency of each of the `n_fft / 2 + 1` real FFT bins
///
/// Bin `i` sits at `i * sample_rate / n_fft`, so for odd `n_fft` the last bin
/// stops short of Nyquist.
pub fn fft_frequencies(sample_rate: u32, n_fft: usize) -> Vec<f64> {
    let n_bins = n_fft / 2 + 1;
    if n_fft == 0 {
        return vec![0.0; n_bins];
    }
    (0..n_bins)
        .map(|i| sample_rate as f64 * i as f64 / n_fft as f64)
        .collect()
}

/// Mel filterbank matrix for one (sample rate, n_fft) pair
pub struct MelFilterbank {
    n_fft: usize,
    /// `n_mels` rows of `n_fft / 2 + 1` weights
    weights: Vec<Vec<f32>>,
}

impl MelFilterbank {
    /// Build the filterbank
    ///
    /// # Arguments
    /// * `sample_rate` - Sample rate of the analysed signal
    /// * `n_fft` - FFT length the power spectra were computed with
    /// * `n_mels` - Number of bands
    pub fn new(sample_rate: u32, n_fft: usize, n_mels: usize) -> Self {
        let nyquist = sample_rate as f64 / 2.0;
        let fft_freqs = fft_frequencies(sample_rate, n_fft);

        let max_mel = hz_to_mel(nyquist);
        let mel_points: Vec<f64> = (0..n_mels + 2)
            .map(|i| mel_to_hz(max_mel * i as f64 / (n_mels + 1) as f64))
            .collect();

        let weights = (0..n_mels)
            .map(|m| {
                let (left, centre, right) = (mel_points[m], mel_points[m + 1], mel_points[m + 2]);
                let enorm = 2.0 / (right - left);
                fft_freqs
                    .iter()
                    .map(|&f| {
                        let lower = (f - left) / (centre - left);
                        let upper = (right - f) / (right - centre);
                        (lower.min(upper).max(0.0) * enorm) as f32
                    })
                    .collect()
            })
            .collect();

        Self { n_fft, weights }
    }

    pub fn n_fft(&self) -> usize {
        self.n_fft
    }

    pub fn n_mels(&self) -> usize {
        self.weights.len()
    }

    /// Project one power spectrum frame onto the mel bands
    pub fn apply(&self, power: &[f32]) -> Vec<f32> {
        self.weights
            .iter()
            .map(|row| row.iter().zip(power).map(|(w, p)| w * p).sum())
            .collect()
    }
}
