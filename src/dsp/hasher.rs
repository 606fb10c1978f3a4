//! Stage 4: combinatorial pairing of peaks into compact,
//! location-invariant hashes.

use crate::dsp::peaks::Peak;
use crate::params::{
    DT_MASK, F1_MASK, F2_MASK, FAN_VALUE, TARGET_ZONE_T_LEN, TARGET_ZONE_T_START,
};

/// One hashed peak pair, annotated with its anchor's time index (not
/// packed into the hash — it identifies alignment, not identity).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fingerprint {
    pub hash: u32,
    pub anchor_t_idx: u32,
}

/// Pack `(f1, f2, dt)` into the 32-bit hash exactly as spec.md §4.4
/// defines: `f1:12 | f2:10 | dt:10`. Overflowing field widths mask
/// rather than panic.
pub fn pack_hash(f1: u32, f2: u32, dt: u32) -> u32 {
    let f1 = f1 & F1_MASK;
    let f2 = f2 & F2_MASK;
    let dt = dt & DT_MASK;
    (f1 << 20) | (f2 << 10) | dt
}

/// Unpack a hash back into its `(f1, f2, dt)` triple, for round-trip
/// property testing.
pub fn unpack_hash(hash: u32) -> (u32, u32, u32) {
    let dt = hash & DT_MASK;
    let f2 = (hash >> 10) & F2_MASK;
    let f1 = (hash >> 20) & F1_MASK;
    (f1, f2, dt)
}

/// Hash every anchor/target pair in `peaks` whose time delta falls in
/// the target zone, fanning out at most [`FAN_VALUE`] targets per
/// anchor. `peaks` must already be ordered by `t_idx` ascending (the
/// contract `dsp::peaks::find_peaks` guarantees).
pub fn hash_peaks(peaks: &[Peak]) -> Vec<Fingerprint> {
    let zone_start = TARGET_ZONE_T_START;
    let zone_end = TARGET_ZONE_T_START + TARGET_ZONE_T_LEN;

    let mut fingerprints = Vec::new();
    for (i, anchor) in peaks.iter().enumerate() {
        let mut fanned = 0;
        for target in &peaks[i + 1..] {
            if fanned >= FAN_VALUE {
                break;
            }
            let delta_t = target.t_idx - anchor.t_idx;
            if delta_t >= zone_end {
                // peaks are t_idx-ascending, so every later target is
                // at least this far away: nothing more can qualify.
                break;
            }
            if delta_t < zone_start {
                continue;
            }

            let hash = pack_hash(anchor.f_idx as u32, target.f_idx as u32, delta_t);
            fingerprints.push(Fingerprint { hash, anchor_t_idx: anchor.t_idx });
            fanned += 1;
        }
    }
    fingerprints
}
