// Audio module - decoding clips into analysis-ready mono PCM
//
// The feature extractor only ever reads PCM WAV. Anything else an upload
// arrives as (mp3, flac, ogg, m4a...) is transcoded to a mono float WAV
// first, so training and inference share a single loading path.

pub mod resample;
pub mod transcode;
pub mod wav;

pub use resample::resample;
pub use transcode::{transcode_to_wav, TranscodeSummary};
pub use wav::{is_pcm_wav, write_mono_wav, AudioLoader};

/// Average interleaved frames down to a single channel
pub fn downmix(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }

    interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}
