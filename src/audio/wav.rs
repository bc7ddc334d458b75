// WAV module - windowed PCM reads for feature extraction
//
// Reads at most `duration_secs` of audio starting `offset_secs` into the
// file, downmixes to mono and resamples to the analysis rate. Offset and
// duration are converted to frames at the file's native rate, so the
// window covers the same wall-clock span whatever the source rate.

use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};

use super::{downmix, resample};
use crate::config::FeatureConfig;
use crate::error::DecodeError;

/// Loads the fixed analysis window of a PCM WAV file
#[derive(Debug, Clone)]
pub struct AudioLoader {
    target_sample_rate: u32,
    offset_secs: f32,
    duration_secs: f32,
}

impl AudioLoader {
    pub fn new(config: &FeatureConfig) -> Self {
        Self {
            target_sample_rate: config.sample_rate,
            offset_secs: config.offset_secs,
            duration_secs: config.duration_secs,
        }
    }

    pub fn target_sample_rate(&self) -> u32 {
        self.target_sample_rate
    }

    /// Load the analysis window as mono samples at the target rate
    ///
    /// # Returns
    /// * `Ok(samples)` - Between 1 and `duration_secs * sample_rate` samples
    /// * `Err(DecodeError::EmptyWindow)` - File ends before the offset
    /// * `Err(DecodeError)` - File is not a readable PCM WAV
    pub fn load_window(&self, path: &Path) -> Result<Vec<f32>, DecodeError> {
        let mut reader = WavReader::open(path).map_err(|err| map_hound_error(path, err))?;
        let spec = reader.spec();
        let channels = spec.channels.max(1) as usize;
        let native_rate = spec.sample_rate;
        let total_frames = reader.duration();

        let start_frame = (self.offset_secs as f64 * native_rate as f64).round() as u32;
        if start_frame >= total_frames {
            return Err(DecodeError::EmptyWindow {
                offset_secs: self.offset_secs,
            });
        }

        let wanted_frames = (self.duration_secs as f64 * native_rate as f64).round() as u32;
        let frames = wanted_frames.min(total_frames - start_frame) as usize;

        reader
            .seek(start_frame)
            .map_err(|err| map_hound_error(path, hound::Error::IoError(err)))?;
        let interleaved = read_samples(&mut reader, spec, frames * channels, path)?;
        let mono = downmix(&interleaved, channels);
        if mono.is_empty() {
            return Err(DecodeError::EmptyWindow {
                offset_secs: self.offset_secs,
            });
        }

        resample(&mono, native_rate, self.target_sample_rate)
    }
}

/// True when `path` opens as a WAV whose sample layout `AudioLoader` reads
pub fn is_pcm_wav(path: &Path) -> bool {
    match WavReader::open(path) {
        Ok(reader) => {
            let spec = reader.spec();
            match spec.sample_format {
                SampleFormat::Float => spec.bits_per_sample == 32,
                SampleFormat::Int => matches!(spec.bits_per_sample, 8 | 16 | 24 | 32),
            }
        }
        Err(_) => false,
    }
}

/// Write mono samples as a 32-bit float WAV
pub fn write_mono_wav(path: &Path, samples: &[f32], sample_rate: u32) -> Result<(), DecodeError> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };
    let mut writer = WavWriter::create(path, spec).map_err(|err| map_hound_error(path, err))?;
    for &sample in samples {
        writer
            .write_sample(sample)
            .map_err(|err| map_hound_error(path, err))?;
    }
    writer.finalize().map_err(|err| map_hound_error(path, err))
}

fn read_samples<R: std::io::Read>(
    reader: &mut WavReader<R>,
    spec: WavSpec,
    count: usize,
    path: &Path,
) -> Result<Vec<f32>, DecodeError> {
    match spec.sample_format {
        SampleFormat::Float => {
            if spec.bits_per_sample != 32 {
                return Err(DecodeError::UnsupportedSampleFormat {
                    bits_per_sample: spec.bits_per_sample,
                });
            }
            reader
                .samples::<f32>()
                .take(count)
                .map(|sample| sample.map_err(|err| map_hound_error(path, err)))
                .collect()
        }
        SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
            match spec.bits_per_sample {
                8 => reader
                    .samples::<i8>()
                    .take(count)
                    .map(|sample| {
                        sample
                            .map(|value| value as f32 / scale)
                            .map_err(|err| map_hound_error(path, err))
                    })
                    .collect(),
                16 => reader
                    .samples::<i16>()
                    .take(count)
                    .map(|sample| {
                        sample
                            .map(|value| value as f32 / scale)
                            .map_err(|err| map_hound_error(path, err))
                    })
                    .collect(),
                24 | 32 => reader
                    .samples::<i32>()
                    .take(count)
                    .map(|sample| {
                        sample
                            .map(|value| value as f32 / scale)
                            .map_err(|err| map_hound_error(path, err))
                    })
                    .collect(),
                other => Err(DecodeError::UnsupportedSampleFormat {
                    bits_per_sample: other,
                }),
            }
        }
    }
}

fn map_hound_error(path: &Path, err: hound::Error) -> DecodeError {
    match err {
        hound::Error::IoError(io) if io.kind() == std::io::ErrorKind::NotFound => {
            DecodeError::Open {
                path: path.to_path_buf(),
                reason: io.to_string(),
            }
        }
        // Header promised more samples than the file holds
        hound::Error::IoError(io)
            if matches!(
                io.kind(),
                std::io::ErrorKind::UnexpectedEof | std::io::ErrorKind::InvalidData
            ) =>
        {
            DecodeError::Open {
                path: path.to_path_buf(),
                reason: format!("truncated or corrupt sample data: {}", io),
            }
        }
        hound::Error::IoError(io) => io.into(),
        hound::Error::Unsupported => DecodeError::UnsupportedFormat {
            reason: format!("{} uses a WAV variant hound cannot read", path.display()),
        },
        other => DecodeError::Open {
            path: path.to_path_buf(),
            reason: other.to_string(),
        },
    }
}
