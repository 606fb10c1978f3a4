//! Stage 2: short-time Fourier transform into a dB-scaled magnitude
//! surface.

use crate::params::{DB_EPSILON, HOP_SIZE, NUM_FREQ_BINS, SAMPLE_RATE, WINDOW_SIZE};
use ndarray::Array2;
use rayon::prelude::*;
use realfft::RealFftPlanner;
use std::f32::consts::PI;
use std::sync::Arc;

/// `T x F` dB-magnitude matrix. Row `t` is frame `t`'s spectrum;
/// column `f` is frequency bin `f`.
#[derive(Debug, Clone)]
pub struct Spectrogram {
    pub frames: Array2<f32>,
}

impl Spectrogram {
    pub fn num_frames(&self) -> usize {
        self.frames.nrows()
    }

    pub fn num_bins(&self) -> usize {
        self.frames.ncols()
    }

    pub fn get(&self, t: usize, f: usize) -> f32 {
        self.frames[[t, f]]
    }
}

fn hann_window(size: usize) -> Vec<f32> {
    if size <= 1 {
        return vec![1.0; size];
    }
    (0..size)
        .map(|n| 0.5 * (1.0 - (2.0 * PI * n as f32 / (size - 1) as f32).cos()))
        .collect()
}

fn num_frames(num_samples: usize) -> usize {
    if num_samples < WINDOW_SIZE {
        return 0;
    }
    1 + (num_samples - WINDOW_SIZE) / HOP_SIZE
}

/// Compute the dB magnitude spectrogram of a canonical mono buffer
/// (11025 Hz `f32`, per `dsp::preprocess`).
///
/// Empty input or input shorter than one window yields a zero-frame
/// spectrogram (`T = 0`) rather than an error — this is how a too-short
/// query shortcuts to `no_match` per spec.md's boundary behaviors.
pub fn compute(samples: &[f32]) -> Spectrogram {
    let t = num_frames(samples.len());
    if t == 0 {
        return Spectrogram { frames: Array2::zeros((0, NUM_FREQ_BINS)) };
    }

    let window = hann_window(WINDOW_SIZE);
    let mut planner = RealFftPlanner::<f32>::new();
    let fft: Arc<dyn realfft::RealToComplex<f32>> = planner.plan_fft_forward(WINDOW_SIZE);

    let rows: Vec<Vec<f32>> = (0..t)
        .into_par_iter()
        .map(|frame_idx| {
            let start = frame_idx * HOP_SIZE;
            let mut input = fft.make_input_vec();
            for (i, slot) in input.iter_mut().enumerate() {
                *slot = samples[start + i] * window[i];
            }
            let mut spectrum = fft.make_output_vec();
            fft.process(&mut input, &mut spectrum)
                .expect("real FFT of a fixed-size buffer cannot fail");

            spectrum
                .iter()
                .map(|c| 20.0 * c.norm().max(DB_EPSILON).log10())
                .collect()
        })
        .collect();

    let mut frames = Array2::zeros((t, NUM_FREQ_BINS));
    for (row_idx, row) in rows.into_iter().enumerate() {
        for (col_idx, value) in row.into_iter().enumerate() {
            frames[[row_idx, col_idx]] = value;
        }
    }

    Spectrogram { frames }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn too_short_buffer_yields_zero_frames() {
        let samples = vec![0.0_f32; WINDOW_SIZE - 1];
        let spec = compute(&samples);
        assert_eq!(spec.num_frames(), 0);
    }

    #[test]
    fn empty_buffer_yields_zero_frames() {
        let spec = compute(&[]);
        assert_eq!(spec.num_frames(), 0);
    }

    #[test]
    fn frame_count_matches_formula() {
        let n = WINDOW_SIZE + 3 * HOP_SIZE;
        let samples = vec![0.0_f32; n];
        let spec = compute(&samples);
        assert_eq!(spec.num_frames(), 1 + (n - WINDOW_SIZE) / HOP_SIZE);
        assert_eq!(spec.num_bins(), NUM_FREQ_BINS);
    }

    #[test]
    fn silence_has_no_output_above_floor() {
        let samples = vec![0.0_f32; WINDOW_SIZE * 2];
        let spec = compute(&samples);
        for t in 0..spec.num_frames() {
            for f in 0..spec.num_bins() {
                assert!(spec.get(t, f) <= crate::params::MIN_AMPLITUDE_DB);
            }
        }
    }

    #[test]
    fn pure_tone_produces_a_strong_bin() {
        let freq = 1000.0_f32;
        let n = WINDOW_SIZE * 2;
        let samples: Vec<f32> = (0..n)
            .map(|i| (2.0 * PI * freq * i as f32 / SAMPLE_RATE as f32).sin())
            .collect();
        let spec = compute(&samples);
        let max_db = spec.frames.iter().cloned().fold(f32::MIN, f32::max);
        assert!(max_db > MIN_AMPLITUDE_DB_FOR_TEST);
    }

    const MIN_AMPLITUDE_DB_FOR_TEST: f32 = -40.0;
}
