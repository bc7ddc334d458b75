// FFT module - short-time power spectrogram
//
// Frames are centred: the signal is zero padded by n_fft / 2 on both sides
// before framing, so frame t is centred on sample t * hop. Each frame is
// multiplied by a periodic Hann window and only the non-negative frequency
// bins are kept.

use rustfft::{num_complex::Complex, FftPlanner};
use std::sync::{Arc, Mutex};

/// Periodic Hann window of length `size`
pub fn periodic_hann(size: usize) -> Vec<f32> {
    (0..size)
        .map(|i| {
            0.5 - 0.5 * ((2.0 * std::f64::consts::PI * i as f64) / size as f64).cos() as f32
        })
        .collect()
}

/// Number of centred frames for a signal of `len` samples
pub fn frame_count(len: usize, n_fft: usize, hop_length: usize) -> usize {
    let padded = len + 2 * (n_fft / 2);
    if padded < n_fft || hop_length == 0 {
        return 0;
    }
    1 + (padded - n_fft) / hop_length
}

/// FFT processor that computes power spectrograms from mono audio
pub struct FftProcessor {
    fft_planner: Arc<Mutex<FftPlanner<f32>>>,
}

impl Default for FftProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl FftProcessor {
    pub fn new() -> Self {
        Self {
            fft_planner: Arc::new(Mutex::new(FftPlanner::new())),
        }
    }

    /// Compute the power spectrogram `|STFT|^2`
    ///
    /// # Arguments
    /// * `audio` - Mono signal
    /// * `n_fft` - Window and FFT length (must be >= 1)
    /// * `hop_length` - Samples between frame centres
    ///
    /// # Returns
    /// One row per frame, each `n_fft / 2 + 1` bins wide
    pub fn power_spectrogram(&self, audio: &[f32], n_fft: usize, hop_length: usize) -> Vec<Vec<f32>> {
        let n_frames = frame_count(audio.len(), n_fft, hop_length);
        if n_fft == 0 || n_frames == 0 {
            return Vec::new();
        }

        let pad = n_fft / 2;
        let mut padded = vec![0.0f32; audio.len() + 2 * pad];
        padded[pad..pad + audio.len()].copy_from_slice(audio);

        let window = periodic_hann(n_fft);
        let fft = {
            // A poisoned planner still holds valid cached plans
            let mut planner = self
                .fft_planner
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            planner.plan_fft_forward(n_fft)
        };

        let n_bins = n_fft / 2 + 1;
        let mut buffer: Vec<Complex<f32>> = vec![Complex::new(0.0, 0.0); n_fft];
        let mut frames: Vec<Vec<f32>> = Vec::with_capacity(n_frames);

        for frame in 0..n_frames {
            let start = frame * hop_length;
            for (i, slot) in buffer.iter_mut().enumerate() {
                *slot = Complex::new(padded[start + i] * window[i], 0.0);
            }
            fft.process(&mut buffer);
            frames.push(buffer[..n_bins].iter().map(|c| c.norm_sqr()).collect());
        }

        frames
    }
}
