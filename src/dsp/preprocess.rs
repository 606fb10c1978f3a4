//! Stage 1: downmix, resample, and normalize arbitrary PCM into the
//! canonical mono 11025 Hz `f32` buffer every later stage assumes.

use crate::error::{EngineError, Result};
use crate::params::SAMPLE_RATE;
use rubato::{Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction};

/// Decoded-but-unprocessed audio, as produced by `audio::loader`.
#[derive(Debug, Clone)]
pub struct RawAudio {
    /// Interleaved samples, already converted to `f32` in \[-1, 1\]
    /// from whatever integer/float format the source used.
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

/// Run the full preprocessing contract (spec.md §4.1) and return a mono
/// buffer at [`SAMPLE_RATE`].
pub fn preprocess(raw: &RawAudio) -> Result<Vec<f32>> {
    if raw.sample_rate == 0 {
        return Err(EngineError::InvalidInput("sample rate must be > 0".into()));
    }
    if raw.channels == 0 {
        return Err(EngineError::InvalidInput("channel count must be > 0".into()));
    }
    if raw.samples.is_empty() {
        return Err(EngineError::InvalidInput("audio buffer is empty".into()));
    }

    let mono = downmix(&raw.samples, raw.channels as usize);
    let resampled = resample_to_canonical_rate(&mono, raw.sample_rate)?;
    Ok(normalize_peak(resampled))
}

/// Average interleaved channel samples down to mono.
fn downmix(interleaved: &[f32], channels: usize) -> Vec<f32> {
    if channels == 1 {
        return interleaved.to_vec();
    }
    interleaved
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}

/// Deterministic, linear-phase sinc resampling to [`SAMPLE_RATE`].
///
/// Uses `rubato`'s windowed-sinc interpolator, the same configuration
/// used across the wider example pack's audio-fingerprinting services:
/// a fixed kernel length and oversampling factor make the result
/// reproducible for identical input, which the whole pipeline's
/// bit-exactness invariant depends on.
fn resample_to_canonical_rate(mono: &[f32], source_rate: u32) -> Result<Vec<f32>> {
    if source_rate == SAMPLE_RATE {
        return Ok(mono.to_vec());
    }
    if mono.is_empty() {
        return Ok(Vec::new());
    }

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let ratio = SAMPLE_RATE as f64 / source_rate as f64;
    let mut resampler = SincFixedIn::<f32>::new(ratio, 2.0, params, mono.len(), 1)
        .map_err(|e| EngineError::InternalNumeric(format!("resampler setup failed: {e}")))?;

    let waves_in = vec![mono.to_vec()];
    let waves_out = resampler
        .process(&waves_in, None)
        .map_err(|e| EngineError::InternalNumeric(format!("resampling failed: {e}")))?;

    Ok(waves_out.into_iter().next().unwrap_or_default())
}

/// Scale down so the maximum absolute sample is at most 1.0. A no-op
/// for audio that is already within range (the common case once the
/// decoder's own per-format normalization has run).
fn normalize_peak(samples: Vec<f32>) -> Vec<f32> {
    let peak = samples.iter().fold(0.0f32, |acc, s| acc.max(s.abs()));
    if peak <= 1.0 || peak == 0.0 {
        return samples;
    }
    samples.into_iter().map(|s| s / peak).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_buffer() {
        let raw = RawAudio { samples: vec![], sample_rate: 44100, channels: 1 };
        assert!(preprocess(&raw).is_err());
    }

    #[test]
    fn rejects_zero_sample_rate() {
        let raw = RawAudio { samples: vec![0.1, 0.2], sample_rate: 0, channels: 1 };
        assert!(preprocess(&raw).is_err());
    }

    #[test]
    fn rejects_zero_channels() {
        let raw = RawAudio { samples: vec![0.1, 0.2], sample_rate: 44100, channels: 0 };
        assert!(preprocess(&raw).is_err());
    }

    #[test]
    fn downmix_averages_stereo_frames() {
        let stereo = vec![1.0, -1.0, 0.5, 0.5];
        let mono = downmix(&stereo, 2);
        assert_eq!(mono, vec![0.0, 0.5]);
    }

    #[test]
    fn skips_resample_when_already_canonical() {
        let mono = vec![0.1_f32; SAMPLE_RATE as usize];
        let out = resample_to_canonical_rate(&mono, SAMPLE_RATE).unwrap();
        assert_eq!(out, mono);
    }

    #[test]
    fn normalize_clamps_overshoot_peak() {
        let samples = vec![0.5, -2.0, 1.0];
        let normalized = normalize_peak(samples);
        assert!((normalized[1] + 1.0).abs() < 1e-6);
    }

    #[test]
    fn normalize_is_noop_within_range() {
        let samples = vec![0.5, -0.9, 0.2];
        let normalized = normalize_peak(samples.clone());
        assert_eq!(normalized, samples);
    }

    #[test]
    fn idempotent_once_canonical() {
        let raw = RawAudio {
            samples: vec![0.2, -0.2, 0.3, -0.3],
            sample_rate: SAMPLE_RATE,
            channels: 1,
        };
        let once = preprocess(&raw).unwrap();
        let twice_raw = RawAudio { samples: once.clone(), sample_rate: SAMPLE_RATE, channels: 1 };
        let twice = preprocess(&twice_raw).unwrap();
        assert_eq!(once, twice);
    }
}
