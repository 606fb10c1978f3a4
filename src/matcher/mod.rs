//! Stage 5 (query side): histogram alignment over the index's lookup
//! results, as specified in spec.md §4.6.

use crate::dsp::hasher::Fingerprint;
use crate::index::Index;
use crate::params::{frames_to_seconds, MIN_ABSOLUTE_MATCHES};
use crate::error::Result;
use std::collections::HashMap;

/// A single ranked outcome of matching a query against the index.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchCandidate {
    pub song_id: u64,
    pub score: u32,
    pub offset_seconds: f64,
}

/// Score `query` against every track in `index`, returning up to
/// `top_k` candidates sorted by descending score.
///
/// For each stored `(hash, song_id, anchor_t_idx)` row matching one of
/// `query`'s hashes, the delta between the stored anchor and the
/// query's anchor is bucketed per `song_id`. The bucket with the
/// highest count is that song's alignment; songs whose best bucket
/// falls below [`MIN_ABSOLUTE_MATCHES`] are dropped entirely. Ties
/// break first on smaller `|delta|`, then on smaller `song_id`.
pub fn match_query(index: &Index, query: &[Fingerprint], top_k: usize) -> Result<Vec<MatchCandidate>> {
    if query.is_empty() {
        return Ok(Vec::new());
    }

    let mut query_by_hash: HashMap<u32, Vec<u32>> = HashMap::new();
    for fp in query {
        query_by_hash.entry(fp.hash).or_default().push(fp.anchor_t_idx);
    }
    let hashes: Vec<u32> = query_by_hash.keys().copied().collect();

    let rows = index.lookup(&hashes)?;

    // (song_id, delta_frames) -> count
    let mut histograms: HashMap<(u64, i64), u32> = HashMap::new();
    for (hash, song_id, stored_anchor_t_idx) in rows {
        let Some(query_anchors) = query_by_hash.get(&hash) else { continue };
        for &query_anchor_t_idx in query_anchors {
            let delta = stored_anchor_t_idx as i64 - query_anchor_t_idx as i64;
            *histograms.entry((song_id, delta)).or_insert(0) += 1;
        }
    }

    // song_id -> best (delta, score), picked by the tie-break rule.
    let mut best_per_song: HashMap<u64, (i64, u32)> = HashMap::new();
    for (&(song_id, delta), &score) in &histograms {
        best_per_song
            .entry(song_id)
            .and_modify(|(best_delta, best_score)| {
                if is_better(score, delta, *best_score, *best_delta) {
                    *best_delta = delta;
                    *best_score = score;
                }
            })
            .or_insert((delta, score));
    }

    let mut candidates: Vec<MatchCandidate> = best_per_song
        .into_iter()
        .filter(|(_, (_, score))| *score >= MIN_ABSOLUTE_MATCHES)
        .map(|(song_id, (delta, score))| MatchCandidate {
            song_id,
            score,
            offset_seconds: frames_to_seconds(delta),
        })
        .collect();

    candidates.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| a.offset_seconds.abs().partial_cmp(&b.offset_seconds.abs()).unwrap())
            .then_with(|| a.song_id.cmp(&b.song_id))
    });
    candidates.truncate(top_k);

    Ok(candidates)
}

/// `true` if `(score, delta)` should replace `(best_score, best_delta)`
/// as a song's winning bucket: higher score wins outright; a tied
/// score prefers the smaller `|delta|`.
fn is_better(score: u32, delta: i64, best_score: u32, best_delta: i64) -> bool {
    if score != best_score {
        return score > best_score;
    }
    delta.abs() < best_delta.abs()
}
