// Transcode module - normalizing arbitrary uploads to PCM WAV
//
// Uploads can arrive in any container the browser or client produced.
// Symphonia probes and decodes the first audio track; the result is
// downmixed and written as a mono 32-bit float WAV that `AudioLoader` reads.

use std::fs::File;
use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use super::{downmix, write_mono_wav};
use crate::error::DecodeError;

/// What a transcode produced
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TranscodeSummary {
    pub sample_rate: u32,
    pub source_channels: usize,
    pub frames: usize,
}

/// Decode `source` with symphonia and write it to `dest` as mono PCM WAV
///
/// # Arguments
/// * `source` - Audio file in any container/codec symphonia supports
/// * `dest` - Destination WAV path (overwritten)
///
/// # Returns
/// * `Ok(TranscodeSummary)` - Decoded audio was written
/// * `Err(DecodeError)` - Unknown container, no audio track, or zero samples
pub fn transcode_to_wav(source: &Path, dest: &Path) -> Result<TranscodeSummary, DecodeError> {
    let file = File::open(source).map_err(|err| DecodeError::Open {
        path: source.to_path_buf(),
        reason: err.to_string(),
    })?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = source.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|err| DecodeError::UnsupportedFormat {
            reason: err.to_string(),
        })?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or(DecodeError::NoAudioTrack)?;
    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| DecodeError::UnsupportedFormat {
            reason: "unknown sample rate".to_string(),
        })?;
    let mut channels = track
        .codec_params
        .channels
        .map(|c| c.count())
        .unwrap_or(1);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|err| DecodeError::UnsupportedFormat {
            reason: err.to_string(),
        })?;

    let mut interleaved: Vec<f32> = Vec::new();
    let mut sample_buf: Option<SampleBuffer<f32>> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(err))
                if err.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(err) => {
                tracing::warn!("[Transcode] Error reading packet: {}", err);
                break;
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(err)) => {
                tracing::debug!("[Transcode] Skipping corrupt packet: {}", err);
                continue;
            }
            Err(err) => {
                return Err(DecodeError::UnsupportedFormat {
                    reason: err.to_string(),
                })
            }
        };

        if sample_buf.is_none() {
            let spec = *decoded.spec();
            channels = spec.channels.count();
            sample_buf = Some(SampleBuffer::new(decoded.capacity() as u64, spec));
        }

        if let Some(buf) = sample_buf.as_mut() {
            buf.copy_interleaved_ref(decoded);
            interleaved.extend_from_slice(buf.samples());
        }
    }

    let mono = downmix(&interleaved, channels);
    if mono.is_empty() {
        return Err(DecodeError::NoAudioTrack);
    }

    write_mono_wav(dest, &mono, sample_rate)?;
    tracing::debug!(
        "[Transcode] {} -> {} ({} frames @ {} Hz, {} source channels)",
        source.display(),
        dest.display(),
        mono.len(),
        sample_rate,
        channels
    );

    Ok(TranscodeSummary {
        sample_rate,
        source_channels: channels,
        frames: mono.len(),
    })
}
