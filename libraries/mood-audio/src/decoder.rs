//! Asset decoding using Symphonia
//!
//! Turns fetched bytes into a [`SampleBlock`] at the session's sample rate:
//! probe the container, decode every packet of the default audio track, fold
//! anything wider than stereo down to two channels and resample when the
//! asset's rate differs from the device's.

use crate::buffer::SampleBlock;
use crate::error::{EngineError, Result};
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use std::io::Cursor;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, trace};

/// -3 dB, used when folding extra channels into L/R
const SIDE_MIX: f32 = 0.707;

/// Decode `bytes` and convert to `target_rate`
///
/// `extension` is a container hint (`"mp3"`, `"ogg"`, ...), usually taken
/// from the asset URL.
pub fn decode(bytes: Vec<u8>, extension: Option<&str>, target_rate: u32) -> Result<SampleBlock> {
    let decoded = decode_interleaved(bytes, extension)?;
    let (samples, channels) = fold_to_stereo(decoded.samples, decoded.channels);

    if decoded.sample_rate == target_rate {
        return Ok(SampleBlock::new(samples, channels, target_rate));
    }

    debug!(
        from = decoded.sample_rate,
        to = target_rate,
        channels,
        "Resampling decoded asset"
    );
    let resampled = resample(&samples, channels as usize, decoded.sample_rate, target_rate)?;
    Ok(SampleBlock::new(resampled, channels, target_rate))
}

struct Decoded {
    samples: Vec<f32>,
    channels: usize,
    sample_rate: u32,
}

fn decode_interleaved(bytes: Vec<u8>, extension: Option<&str>) -> Result<Decoded> {
    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = extension {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe().format(
        &hint,
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;
    let mut format = probed.format;

    let (track_id, codec_params) = {
        let track = format
            .tracks()
            .iter()
            .find(|track| track.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| EngineError::Decode("no audio track found".to_string()))?;
        (track.id, track.codec_params.clone())
    };

    let mut decoder =
        symphonia::default::get_codecs().make(&codec_params, &DecoderOptions::default())?;

    let mut sample_rate = codec_params.sample_rate.unwrap_or(0);
    let mut channels = codec_params.channels.map_or(0, |c| c.count());
    let mut samples = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(e.into()),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let audio = match decoder.decode(&packet) {
            Ok(audio) => audio,
            Err(SymphoniaError::DecodeError(msg)) => {
                // Corrupt packet: skip it and keep going
                trace!(error = %msg, "Skipping undecodable packet");
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        let spec = *audio.spec();
        sample_rate = spec.rate;
        channels = spec.channels.count();

        let mut buffer = SampleBuffer::<f32>::new(audio.capacity() as u64, spec);
        buffer.copy_interleaved_ref(audio);
        samples.extend_from_slice(buffer.samples());
    }

    if samples.is_empty() || channels == 0 || sample_rate == 0 {
        return Err(EngineError::Decode("no audio frames decoded".to_string()));
    }

    Ok(Decoded {
        samples,
        channels,
        sample_rate,
    })
}

/// Keep mono and stereo as they are; fold wider layouts into L/R
fn fold_to_stereo(samples: Vec<f32>, channels: usize) -> (Vec<f32>, u16) {
    match channels {
        1 => (samples, 1),
        2 => (samples, 2),
        _ => {
            let mut stereo = Vec::with_capacity(samples.len() / channels * 2);
            for frame in samples.chunks_exact(channels) {
                let side: f32 = frame[2..].iter().sum::<f32>() * SIDE_MIX;
                stereo.push((frame[0] + side).clamp(-1.0, 1.0));
                stereo.push((frame[1] + side).clamp(-1.0, 1.0));
            }
            (stereo, 2)
        }
    }
}

/// Resample interleaved audio with a sinc resampler
///
/// The output is aligned with the input: the filter delay is trimmed from the
/// front and the tail is flushed, so looped assets stay gapless.
fn resample(samples: &[f32], channels: usize, from: u32, to: u32) -> Result<Vec<f32>> {
    let frames = samples.len() / channels;
    let ratio = f64::from(to) / f64::from(from);
    let expected = (frames as f64 * ratio).round() as usize;

    let params = SincInterpolationParameters {
        sinc_len: 128,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Cubic,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let mut resampler = SincFixedIn::<f32>::new(
        ratio,
        2.0,
        params,
        frames,
        channels,
    )
    .map_err(|e| EngineError::Resample(e.to_string()))?;

    let mut planar = vec![Vec::with_capacity(frames); channels];
    for frame in samples.chunks_exact(channels) {
        for (channel, sample) in planar.iter_mut().zip(frame) {
            channel.push(*sample);
        }
    }

    let delay = resampler.output_delay();
    let mut resampled = resampler
        .process(&planar, None)
        .map_err(|e| EngineError::Resample(e.to_string()))?;

    // Flush the filter until the delayed tail is out
    while resampled.first().map_or(0, Vec::len) < delay + expected {
        let tail = resampler
            .process_partial(None::<&[Vec<f32>]>, None)
            .map_err(|e| EngineError::Resample(e.to_string()))?;
        if tail.first().map_or(true, Vec::is_empty) {
            break;
        }
        for (channel, more) in resampled.iter_mut().zip(tail) {
            channel.extend(more);
        }
    }

    let available = resampled.first().map_or(0, Vec::len).saturating_sub(delay);
    let out_frames = expected.min(available);
    if out_frames == 0 {
        return Err(EngineError::Resample("resampler produced no frames".to_string()));
    }

    trace!(delay, frames = out_frames, "Resampled");
    let mut interleaved = Vec::with_capacity(out_frames * channels);
    for i in delay..delay + out_frames {
        for channel in &resampled {
            interleaved.push(channel[i]);
        }
    }
    Ok(interleaved)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wav_bytes(sample_rate: u32, channels: u16, frames: usize) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for i in 0..frames {
                let t = i as f32 / sample_rate as f32;
                let sample = (2.0 * std::f32::consts::PI * 440.0 * t).sin() * 0.5;
                for _ in 0..channels {
                    writer.write_sample((sample * i16::MAX as f32) as i16).unwrap();
                }
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn decodes_wav_at_native_rate() {
        let block = decode(wav_bytes(44100, 2, 4410), Some("wav"), 44100).unwrap();
        assert_eq!(block.channels(), 2);
        assert_eq!(block.sample_rate(), 44100);
        assert_eq!(block.frames(), 4410);
        assert!(block.peak() > 0.4 && block.peak() <= 0.5);
    }

    #[test]
    fn decodes_without_hint() {
        let block = decode(wav_bytes(22050, 1, 2205), None, 22050).unwrap();
        assert_eq!(block.channels(), 1);
        assert_eq!(block.frames(), 2205);
    }

    #[test]
    fn resamples_to_target_rate() {
        let block = decode(wav_bytes(22050, 1, 22050), Some("wav"), 44100).unwrap();
        assert_eq!(block.sample_rate(), 44100);
        assert_eq!(block.channels(), 1);
        assert_eq!(block.frames(), 44100);
    }

    #[test]
    fn resampling_keeps_timing() {
        let mut samples = vec![0.0; 4000];
        samples[1000] = 1.0;
        samples[3990] = 1.0;

        let out = resample(&samples, 1, 8000, 16000).unwrap();
        assert_eq!(out.len(), 8000);

        let peak_near = |around: usize| {
            (around - 8..around + 8)
                .max_by(|a, b| out[*a].abs().total_cmp(&out[*b].abs()))
                .unwrap()
        };
        assert!(peak_near(2000).abs_diff(2000) <= 1);
        // Tail is flushed, not cut
        assert!(peak_near(7980).abs_diff(7980) <= 1);
        assert!(out[..16].iter().all(|s| s.abs() < 0.05));
    }

    #[test]
    fn resampling_stereo_stays_interleaved() {
        let samples: Vec<f32> = (0..2000).flat_map(|_| [0.25, -0.25]).collect();
        let out = resample(&samples, 2, 22050, 44100).unwrap();
        assert_eq!(out.len(), 4000 * 2);
        // Away from the edges each channel holds its own level
        for frame in out[400..7600].chunks_exact(2) {
            assert!((frame[0] - 0.25).abs() < 0.02);
            assert!((frame[1] + 0.25).abs() < 0.02);
        }
    }

    #[test]
    fn rejects_garbage() {
        let result = decode(b"definitely not audio".to_vec(), Some("mp3"), 44100);
        assert!(matches!(result, Err(EngineError::Decode(_))));
    }

    #[test]
    fn folds_surround_into_stereo() {
        // One 4-channel frame: L, R, SL, SR
        let (stereo, channels) = fold_to_stereo(vec![0.1, 0.2, 0.1, 0.1], 4);
        assert_eq!(channels, 2);
        assert!((stereo[0] - (0.1 + 0.2 * SIDE_MIX)).abs() < 1e-6);
        assert!((stereo[1] - (0.2 + 0.2 * SIDE_MIX)).abs() < 1e-6);
    }
}
