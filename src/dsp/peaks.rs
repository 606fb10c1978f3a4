//! Stage 3: reduce the spectrogram to a sparse, reproducible set of
//! spectral peaks.

use crate::dsp::spectrogram::Spectrogram;
use crate::params::{MIN_AMPLITUDE_DB, NEIGHBORHOOD_FREQ_RADIUS, NEIGHBORHOOD_TIME_RADIUS};
use rayon::prelude::*;

/// A local maximum of the spectrogram surviving the amplitude floor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Peak {
    pub t_idx: u32,
    pub f_idx: u16,
}

/// Extract peaks from `spec`, ordered by `t_idx` ascending then
/// `f_idx` ascending (required for deterministic hashing downstream).
///
/// The spectrogram is read-only for the whole scan, so rows are
/// processed independently and in parallel with `rayon`; each row's
/// peaks come out already `f_idx`-ascending, and collecting rows in
/// order yields the full `t_idx`-then-`f_idx` ordering with no extra
/// sort pass.
pub fn find_peaks(spec: &Spectrogram) -> Vec<Peak> {
    if spec.num_frames() == 0 || spec.num_bins() == 0 {
        return Vec::new();
    }

    let t_count = spec.num_frames();
    let f_count = spec.num_bins();

    let rows: Vec<Vec<Peak>> = (0..t_count)
        .into_par_iter()
        .map(|t| {
            let mut row_peaks = Vec::new();
            for f in 0..f_count {
                let value = spec.get(t, f);
                if value < MIN_AMPLITUDE_DB {
                    continue;
                }
                if is_local_max(spec, t, f, t_count, f_count, value) {
                    row_peaks.push(Peak { t_idx: t as u32, f_idx: f as u16 });
                }
            }
            row_peaks
        })
        .collect();

    rows.into_iter().flatten().collect()
}

/// Is `(t, f)` the lexicographically-smallest maximum in its
/// neighborhood? Ties are broken in favor of the earlier `(t, f)`
/// (spec.md §4.3, open question pinned), which keeps peak extraction
/// deterministic under exact floating-point equality.
fn is_local_max(
    spec: &Spectrogram,
    t: usize,
    f: usize,
    t_count: usize,
    f_count: usize,
    value: f32,
) -> bool {
    let t_start = t.saturating_sub(NEIGHBORHOOD_TIME_RADIUS);
    let t_end = (t + NEIGHBORHOOD_TIME_RADIUS + 1).min(t_count);
    let f_start = f.saturating_sub(NEIGHBORHOOD_FREQ_RADIUS);
    let f_end = (f + NEIGHBORHOOD_FREQ_RADIUS + 1).min(f_count);

    for nt in t_start..t_end {
        for nf in f_start..f_end {
            if nt == t && nf == f {
                continue;
            }
            let neighbor = spec.get(nt, nf);
            if neighbor > value {
                return false;
            }
            if neighbor == value && (nt, nf) < (t, f) {
                return false;
            }
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::Array2;

    fn spec_from_rows(rows: Vec<Vec<f32>>) -> Spectrogram {
        let t = rows.len();
        let f = rows.first().map_or(0, |r| r.len());
        let mut frames = Array2::zeros((t, f));
        for (i, row) in rows.into_iter().enumerate() {
            for (j, v) in row.into_iter().enumerate() {
                frames[[i, j]] = v;
            }
        }
        Spectrogram { frames }
    }

    #[test]
    fn empty_spectrogram_has_no_peaks() {
        let spec = spec_from_rows(vec![]);
        assert!(find_peaks(&spec).is_empty());
    }

    #[test]
    fn below_floor_is_discarded() {
        let spec = spec_from_rows(vec![vec![MIN_AMPLITUDE_DB - 1.0; 5]; 5]);
        assert!(find_peaks(&spec).is_empty());
    }

    #[test]
    fn single_spike_is_a_peak() {
        let mut rows = vec![vec![-80.0_f32; 5]; 5];
        rows[2][2] = 0.0;
        let spec = spec_from_rows(rows);
        let peaks = find_peaks(&spec);
        assert_eq!(peaks.len(), 1);
        assert_eq!(peaks[0], Peak { t_idx: 2, f_idx: 2 });
    }

    #[test]
    fn ties_resolve_to_smallest_position() {
        let mut rows = vec![vec![-80.0_f32; 5]; 5];
        rows[1][1] = 0.0;
        rows[1][3] = 0.0; // equal magnitude, later in lexicographic order
        let spec = spec_from_rows(rows);
        let peaks = find_peaks(&spec);
        assert_eq!(peaks, vec![Peak { t_idx: 1, f_idx: 1 }]);
    }

    #[test]
    fn ordering_is_t_then_f_ascending() {
        let mut rows = vec![vec![-80.0_f32; 5]; 5];
        rows[0][4] = 0.0;
        rows[3][0] = 0.0;
        let spec = spec_from_rows(rows);
        let peaks = find_peaks(&spec);
        assert_eq!(
            peaks,
            vec![Peak { t_idx: 0, f_idx: 4 }, Peak { t_idx: 3, f_idx: 0 }]
        );
    }
}
