// Resample module - sample rate conversion to the analysis rate
//
// Wraps rubato's FFT resampler for whole-clip conversion. The resampler
// works in fixed input chunks and introduces a constant output delay, so the
// tail is flushed with partial chunks and the delay is trimmed off the front.

use rubato::{FftFixedIn, Resampler};

use crate::error::DecodeError;

/// Input chunk size handed to the FFT resampler
const CHUNK_SIZE: usize = 1024;

/// Convert a mono signal from `from_rate` to `to_rate`
///
/// The output length is `round(input.len() * to_rate / from_rate)`.
pub fn resample(input: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>, DecodeError> {
    if from_rate == to_rate || input.is_empty() {
        return Ok(input.to_vec());
    }
    if from_rate == 0 || to_rate == 0 {
        return Err(DecodeError::Resample {
            reason: format!("invalid sample rate conversion {} -> {}", from_rate, to_rate),
        });
    }

    let expected_len =
        ((input.len() as f64) * to_rate as f64 / from_rate as f64).round() as usize;

    let mut resampler =
        FftFixedIn::<f32>::new(from_rate as usize, to_rate as usize, CHUNK_SIZE, 2, 1)?;
    let delay = resampler.output_delay();
    let mut output = Vec::with_capacity(expected_len + delay + CHUNK_SIZE);

    let mut position = 0;
    while input.len() - position >= resampler.input_frames_next() {
        let needed = resampler.input_frames_next();
        let frame: &[f32] = &input[position..position + needed];
        let chunk = resampler.process(&[frame][..], None)?;
        output.extend_from_slice(&chunk[0]);
        position += needed;
    }

    if position < input.len() {
        let tail: &[f32] = &input[position..];
        let chunk = resampler.process_partial(Some(&[tail][..]), None)?;
        output.extend_from_slice(&chunk[0]);
    }

    while output.len() < expected_len + delay {
        let chunk = resampler.process_partial::<&[f32]>(None, None)?;
        if chunk[0].is_empty() {
            break;
        }
        output.extend_from_slice(&chunk[0]);
    }

    let skip = delay.min(output.len());
    output.drain(..skip);
    output.truncate(expected_len);
    Ok(output)
}
