pub mod hasher;
pub mod peaks;
pub mod preprocess;
pub mod spectrogram;

use crate::error::Result;

/// Run stages 1-4 end to end: canonical PCM in, fingerprints out.
///
/// A buffer too short to fill one STFT window (or containing no peaks
/// above the amplitude floor) returns an empty fingerprint list rather
/// than an error — the boundary behavior spec.md calls for.
pub fn fingerprint(raw: &preprocess::RawAudio) -> Result<Vec<hasher::Fingerprint>> {
    let canonical = preprocess::preprocess(raw)?;
    let spectrogram = spectrogram::compute(&canonical);
    let peaks = peaks::find_peaks(&spectrogram);
    Ok(hasher::hash_peaks(&peaks))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::SAMPLE_RATE;
    use std::f32::consts::PI;

    fn sine_wave(freq: f32, seconds: f32) -> preprocess::RawAudio {
        let n = (SAMPLE_RATE as f32 * seconds) as usize;
        let samples: Vec<f32> = (0..n)
            .map(|i| 0.6 * (2.0 * PI * freq * i as f32 / SAMPLE_RATE as f32).sin())
            .collect();
        preprocess::RawAudio { samples, sample_rate: SAMPLE_RATE, channels: 1 }
    }

    #[test]
    fn determinism_same_input_same_fingerprints() {
        let raw = sine_wave(440.0, 2.0);
        let a = fingerprint(&raw).unwrap();
        let b = fingerprint(&raw).unwrap();
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b.iter()) {
            assert_eq!(x.hash, y.hash);
            assert_eq!(x.anchor_t_idx, y.anchor_t_idx);
        }
    }

    #[test]
    fn too_short_audio_yields_no_fingerprints() {
        let raw = preprocess::RawAudio {
            samples: vec![0.1; 1000],
            sample_rate: SAMPLE_RATE,
            channels: 1,
        };
        assert!(fingerprint(&raw).unwrap().is_empty());
    }

    #[test]
    fn silence_yields_no_fingerprints() {
        let raw = preprocess::RawAudio {
            samples: vec![0.0; SAMPLE_RATE as usize * 3],
            sample_rate: SAMPLE_RATE,
            channels: 1,
        };
        assert!(fingerprint(&raw).unwrap().is_empty());
    }

    #[test]
    fn tonal_audio_yields_fingerprints() {
        let raw = sine_wave(440.0, 3.0);
        assert!(!fingerprint(&raw).unwrap().is_empty());
    }
}
