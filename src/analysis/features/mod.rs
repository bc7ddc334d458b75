// MfccExtractor - mean MFCC features for emotion classification
//
// Summarises the analysis window of a clip as the time-average of its
// mel-frequency cepstral coefficients.
//
// Module organization:
// - types: FeatureVector and its fixed width
// - fft: centred STFT power spectrogram
// - mel: Slaney mel filterbank
// - cepstral: power_to_db and orthonormal DCT-II
// - mod.rs: Coordinator (MfccExtractor)
//
// Pipeline per clip:
// 1. Load offset/duration window, mono, at the analysis rate
// 2. n_fft = min(configured n_fft, window length)
// 3. Power spectrogram (hop 512, centred frames)
// 4. 128-band mel projection, converted to dB with an 80 dB range
// 5. DCT-II per frame, first 40 coefficients
// 6. Mean over frames
//
// The same bounded n_fft rule applies to training and inference, so very
// short clips never request a window longer than the signal.

mod cepstral;
mod fft;
mod mel;
mod types;

pub use types::{FeatureVector, MFCC_COEFFICIENTS};

use std::path::Path;
use std::sync::Arc;

use cepstral::{power_to_db, Dct};
use fft::FftProcessor;
use mel::MelFilterbank;

use crate::audio::AudioLoader;
use crate::config::FeatureConfig;
use crate::error::DecodeError;

/// MfccExtractor coordinates loading and the MFCC pipeline
///
/// Cheap to clone; the filterbank for the configured n_fft and the DCT basis
/// are computed once and shared.
#[derive(Clone)]
pub struct MfccExtractor {
    config: FeatureConfig,
    loader: AudioLoader,
    fft_processor: Arc<FftProcessor>,
    filterbank: Arc<MelFilterbank>,
    dct: Arc<Dct>,
    n_mels: usize,
}

impl MfccExtractor {
    /// Create a new MfccExtractor
    ///
    /// # Arguments
    /// * `config` - Feature parameters. `n_mels` below 40 is raised to 40 so
    ///   the DCT can always yield a full vector.
    pub fn new(config: &FeatureConfig) -> Self {
        let n_mels = config.n_mels.max(MFCC_COEFFICIENTS);
        let n_fft = config.n_fft.max(1);

        Self {
            config: config.clone(),
            loader: AudioLoader::new(config),
            fft_processor: Arc::new(FftProcessor::new()),
            filterbank: Arc::new(MelFilterbank::new(config.sample_rate, n_fft, n_mels)),
            dct: Arc::new(Dct::new(n_mels, MFCC_COEFFICIENTS)),
            n_mels,
        }
    }

    /// Parameters this extractor was built with
    pub fn config(&self) -> &FeatureConfig {
        &self.config
    }

    /// Extract the feature vector of a PCM WAV file
    ///
    /// # Returns
    /// * `Ok(FeatureVector)` - Exactly 40 coefficients
    /// * `Err(DecodeError)` - File unreadable or shorter than the offset
    pub fn extract_file(&self, path: &Path) -> Result<FeatureVector, DecodeError> {
        let samples = self.loader.load_window(path)?;
        self.extract(&samples)
    }

    /// Extract the feature vector of mono samples at the analysis rate
    ///
    /// # Arguments
    /// * `samples` - Analysis window (at least one sample)
    pub fn extract(&self, samples: &[f32]) -> Result<FeatureVector, DecodeError> {
        if samples.is_empty() {
            return Err(DecodeError::EmptyWindow {
                offset_secs: self.config.offset_secs,
            });
        }

        let n_fft = self.config.n_fft.max(1).min(samples.len());
        let mut mel_frames: Vec<Vec<f32>> = {
            let spectrogram =
                self.fft_processor
                    .power_spectrogram(samples, n_fft, self.config.hop_length.max(1));

            let adhoc;
            let bank = if n_fft == self.filterbank.n_fft() {
                self.filterbank.as_ref()
            } else {
                adhoc = MelFilterbank::new(self.config.sample_rate, n_fft, self.n_mels);
                &adhoc
            };
            spectrogram.iter().map(|frame| bank.apply(frame)).collect()
        };

        power_to_db(&mut mel_frames, self.config.top_db);

        let mut mean = vec![0.0f64; MFCC_COEFFICIENTS];
        for frame in &mel_frames {
            for (acc, coefficient) in mean.iter_mut().zip(self.dct.apply(frame)) {
                *acc += coefficient as f64;
            }
        }
        let n_frames = mel_frames.len().max(1) as f64;
        let values: Vec<f32> = mean.into_iter().map(|sum| (sum / n_frames) as f32).collect();

        if values.iter().any(|v| !v.is_finite()) {
            return Err(DecodeError::UnsupportedFormat {
                reason: "signal produced non-finite MFCC values".to_string(),
            });
        }

        FeatureVector::new(values).map_err(|err| DecodeError::UnsupportedFormat {
            reason: err.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::write_mono_wav;

    fn generate_sine_wave(sample_rate: u32, frequency: f32, duration_samples: usize) -> Vec<f32> {
        (0..duration_samples)
            .map(|i| {
                let t = i as f32 / sample_rate as f32;
                0.5 * (2.0 * std::f32::consts::PI * frequency * t).sin()
            })
            .collect()
    }

    fn generate_white_noise(duration_samples: usize) -> Vec<f32> {
        use rand::{Rng, SeedableRng};
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        (0..duration_samples)
            .map(|_| rng.gen_range(-0.5..0.5))
            .collect()
    }

    fn distance(a: &FeatureVector, b: &FeatureVector) -> f32 {
        a.as_slice()
            .iter()
            .zip(b.as_slice())
            .map(|(x, y)| (x - y) * (x - y))
            .sum::<f32>()
            .sqrt()
    }

    #[test]
    fn test_full_window_has_forty_coefficients() {
        let extractor = MfccExtractor::new(&FeatureConfig::default());
        let signal = generate_sine_wave(22_050, 440.0, 55_125);
        let features = extractor.extract(&signal).unwrap();
        assert_eq!(features.len(), MFCC_COEFFICIENTS);
        assert!(features.as_slice().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_tiny_inputs_still_yield_forty() {
        let extractor = MfccExtractor::new(&FeatureConfig::default());
        for len in [1usize, 2, 17, 511, 1023] {
            let signal = generate_sine_wave(22_050, 440.0, len);
            let features = extractor.extract(&signal).unwrap();
            assert_eq!(features.len(), 40, "len {}", len);
        }
    }

    #[test]
    fn test_empty_input_is_rejected() {
        let extractor = MfccExtractor::new(&FeatureConfig::default());
        assert!(matches!(
            extractor.extract(&[]),
            Err(DecodeError::EmptyWindow { .. })
        ));
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let extractor = MfccExtractor::new(&FeatureConfig::default());
        let signal = generate_white_noise(30_000);
        assert_eq!(
            extractor.extract(&signal).unwrap(),
            extractor.extract(&signal).unwrap()
        );
    }

    #[test]
    fn test_tone_and_noise_are_separable() {
        let extractor = MfccExtractor::new(&FeatureConfig::default());
        let low_a = extractor.extract(&generate_sine_wave(22_050, 200.0, 40_000)).unwrap();
        let low_b = extractor.extract(&generate_sine_wave(22_050, 210.0, 40_000)).unwrap();
        let noise = extractor.extract(&generate_white_noise(40_000)).unwrap();

        assert!(
            distance(&low_a, &low_b) < distance(&low_a, &noise),
            "similar tones should be closer than tone vs noise"
        );
    }

    #[test]
    fn test_extract_file_applies_offset_window() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.wav");
        let signal = generate_sine_wave(22_050, 330.0, 22_050 * 4);
        write_mono_wav(&path, &signal, 22_050).unwrap();

        let extractor = MfccExtractor::new(&FeatureConfig::default());
        let from_file = extractor.extract_file(&path).unwrap();

        let start = (0.6 * 22_050.0f64).round() as usize;
        let window = &signal[start..start + 55_125];
        let from_samples = extractor.extract(window).unwrap();

        assert!(distance(&from_file, &from_samples) < 1e-3);
    }

    #[test]
    fn test_clip_shorter_than_offset_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blip.wav");
        write_mono_wav(&path, &generate_sine_wave(22_050, 330.0, 4_000), 22_050).unwrap();

        let extractor = MfccExtractor::new(&FeatureConfig::default());
        assert!(matches!(
            extractor.extract_file(&path),
            Err(DecodeError::EmptyWindow { .. })
        ));
    }
}
