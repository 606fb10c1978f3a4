use serde::{Deserialize, Serialize};

/// A hashed peak pair as stored in, or retrieved from, the index.
///
/// `song_id` is `0` for a query-side fingerprint that has not yet been
/// matched against any track (spec.md §3's `Fingerprint` entity); it is
/// always a real track id for anything durable in the `Index`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredFingerprint {
    pub hash: u32,
    pub song_id: u64,
    pub anchor_t_idx: u32,
}
