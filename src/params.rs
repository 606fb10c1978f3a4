//! The system's bit-exact parameter block (spec.md §6).
//!
//! Ingestion and query paths must share these constants verbatim —
//! changing any one of them invalidates every previously stored
//! fingerprint.

/// Canonical sample rate all audio is resampled to before analysis.
pub const SAMPLE_RATE: u32 = 11_025;

/// STFT window length, in samples.
pub const WINDOW_SIZE: usize = 4096;

/// STFT hop length, in samples.
pub const HOP_SIZE: usize = 1024;

/// Number of retained frequency bins: `WINDOW_SIZE / 2 + 1`.
pub const NUM_FREQ_BINS: usize = WINDOW_SIZE / 2 + 1;

/// Floor applied before taking `log10` of a magnitude, to avoid `-inf`.
pub const DB_EPSILON: f32 = 1e-10;

/// Peak neighborhood half-size along the time axis (frames).
pub const NEIGHBORHOOD_TIME_RADIUS: usize = 10;

/// Peak neighborhood half-size along the frequency axis (bins).
pub const NEIGHBORHOOD_FREQ_RADIUS: usize = 10;

/// Peaks quieter than this (dB) are discarded.
pub const MIN_AMPLITUDE_DB: f32 = -70.0;

/// Earliest valid anchor-to-target frame delta.
pub const TARGET_ZONE_T_START: u32 = 1;

/// Width, in frames, of the anchor's target zone.
pub const TARGET_ZONE_T_LEN: u32 = 100;

/// Maximum number of targets paired with a single anchor.
pub const FAN_VALUE: usize = 15;

/// Default number of ranked candidates a match request returns.
pub const DEFAULT_TOP_K: usize = 1;

/// Minimum histogram score for a candidate to be reported at all.
pub const MIN_ABSOLUTE_MATCHES: u32 = 2;

/// Hash field widths (spec.md §4.4): `f1:12 | f2:10 | dt:10`.
pub const F1_BITS: u32 = 12;
pub const F2_BITS: u32 = 10;
pub const DT_BITS: u32 = 10;

pub const F1_MASK: u32 = (1 << F1_BITS) - 1;
pub const F2_MASK: u32 = (1 << F2_BITS) - 1;
pub const DT_MASK: u32 = (1 << DT_BITS) - 1;

/// Convert a frame-domain delta to seconds, per spec.md §4.6 step 6.
pub fn frames_to_seconds(delta_frames: i64) -> f64 {
    delta_frames as f64 * HOP_SIZE as f64 / SAMPLE_RATE as f64
}
