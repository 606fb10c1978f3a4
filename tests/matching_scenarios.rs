//! End-to-end seed scenarios over the full preprocess -> spectrogram ->
//! peaks -> hash -> store -> match pipeline, per the system's testable
//! properties.

use landmark_server::dsp;
use landmark_server::dsp::preprocess::RawAudio;
use landmark_server::index::Index;
use landmark_server::matcher::match_query;
use landmark_server::models::{StoredFingerprint, TrackMetadata};
use landmark_server::params::SAMPLE_RATE;
use std::f32::consts::PI;

fn metadata(source_id: &str, title: &str) -> TrackMetadata {
    TrackMetadata {
        title: title.to_string(),
        artist: None,
        album: None,
        duration_ms: None,
        source_type: "test".to_string(),
        source_id: source_id.to_string(),
        cover_url: None,
        release_date: None,
        spotify_url: None,
        youtube_url: None,
        youtube_id: None,
    }
}

fn temp_index() -> (tempfile::TempDir, Index) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("fp.sqlite3");
    let index = Index::open(path.to_str().unwrap()).unwrap();
    (dir, index)
}

/// A deterministic "tonal sweep": several superimposed tones so the
/// spectrogram has distinct, stable peaks rather than a single ridge.
fn tonal_clip(base_freq: f32, seconds: f32, seed_offset: usize) -> RawAudio {
    let n = (SAMPLE_RATE as f32 * seconds) as usize;
    let samples: Vec<f32> = (0..n)
        .map(|i| {
            let t = (i + seed_offset) as f32 / SAMPLE_RATE as f32;
            0.5 * (2.0 * PI * base_freq * t).sin()
                + 0.3 * (2.0 * PI * base_freq * 2.3 * t).sin()
                + 0.2 * (2.0 * PI * base_freq * 3.7 * t).sin()
        })
        .collect();
    RawAudio { samples, sample_rate: SAMPLE_RATE, channels: 1 }
}

fn add_noise(mut clip: RawAudio, amplitude: f32) -> RawAudio {
    let mut state: u32 = 0x1234_5678;
    for sample in clip.samples.iter_mut() {
        // xorshift32: deterministic, no external RNG dependency.
        state ^= state << 13;
        state ^= state >> 17;
        state ^= state << 5;
        let noise = (state as f32 / u32::MAX as f32 - 0.5) * 2.0 * amplitude;
        *sample += noise;
    }
    clip
}

fn fingerprints_of(raw: &RawAudio) -> Vec<dsp::hasher::Fingerprint> {
    dsp::fingerprint(raw).unwrap()
}

fn stored_from(fps: &[dsp::hasher::Fingerprint]) -> Vec<StoredFingerprint> {
    fps.iter()
        .map(|fp| StoredFingerprint { hash: fp.hash, song_id: 0, anchor_t_idx: fp.anchor_t_idx })
        .collect()
}

#[test]
fn query_excerpt_matches_full_track_with_offset() {
    let (_dir, index) = temp_index();

    let full_track = tonal_clip(330.0, 20.0, 0);
    let full_fps = fingerprints_of(&full_track);
    let song_id = index.put_track(&metadata("sweep", "Sweep"), &stored_from(&full_fps)).unwrap();

    // A 5s excerpt starting 8s into the track.
    let offset_samples = (SAMPLE_RATE as f32 * 8.0) as usize;
    let excerpt = tonal_clip(330.0, 5.0, offset_samples);
    let query_fps = fingerprints_of(&excerpt);

    let candidates = match_query(&index, &query_fps, 1).unwrap();
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].song_id, song_id);
    // Offset should land near +8s; histogram alignment is frame-quantized.
    assert!((candidates[0].offset_seconds - 8.0).abs() < 0.5);
}

#[test]
fn two_tracks_are_discriminated_by_frequency_content() {
    let (_dir, index) = temp_index();

    let low = tonal_clip(220.0, 10.0, 0);
    let high = tonal_clip(880.0, 10.0, 0);

    let low_id = index.put_track(&metadata("low", "Low"), &stored_from(&fingerprints_of(&low))).unwrap();
    let high_id = index.put_track(&metadata("high", "High"), &stored_from(&fingerprints_of(&high))).unwrap();

    let low_query = tonal_clip(220.0, 5.0, 1000);
    let candidates = match_query(&index, &fingerprints_of(&low_query), 1).unwrap();
    assert_eq!(candidates[0].song_id, low_id);
    assert_ne!(candidates[0].song_id, high_id);
}

#[test]
fn noisy_query_still_matches() {
    let (_dir, index) = temp_index();

    let clean = tonal_clip(440.0, 10.0, 0);
    let song_id = index.put_track(&metadata("noisy", "Noisy"), &stored_from(&fingerprints_of(&clean))).unwrap();

    let noisy_excerpt = add_noise(tonal_clip(440.0, 5.0, 2000), 0.05);
    let candidates = match_query(&index, &fingerprints_of(&noisy_excerpt), 1).unwrap();
    assert_eq!(candidates.len(), 1);
    assert_eq!(candidates[0].song_id, song_id);
}

#[test]
fn empty_library_never_matches() {
    let (_dir, index) = temp_index();
    let query = tonal_clip(550.0, 5.0, 0);
    let candidates = match_query(&index, &fingerprints_of(&query), 1).unwrap();
    assert!(candidates.is_empty());
}

#[test]
fn reinserting_the_same_source_is_rejected_not_duplicated() {
    let (_dir, index) = temp_index();
    let track = tonal_clip(660.0, 8.0, 0);
    let fps = stored_from(&fingerprints_of(&track));

    index.put_track(&metadata("dup-src", "Dup"), &fps).unwrap();
    let err = index.put_track(&metadata("dup-src", "Dup"), &fps).unwrap_err();
    assert!(matches!(err, landmark_server::error::EngineError::DuplicateTrack));
    assert_eq!(index.song_count().unwrap(), 1);
}

#[test]
fn concurrent_ingestion_and_queries_see_a_consistent_index() {
    use std::sync::Arc;
    use std::thread;

    let (_dir, index) = temp_index();
    let index = Arc::new(index);

    let mut handles = Vec::new();
    for i in 0..4u32 {
        let index = index.clone();
        handles.push(thread::spawn(move || {
            let freq = 200.0 + i as f32 * 150.0;
            let track = tonal_clip(freq, 8.0, i as usize * 37);
            let fps = stored_from(&fingerprints_of(&track));
            index.put_track(&metadata(&format!("concurrent-{i}"), "Concurrent"), &fps).unwrap()
        }));
    }
    let song_ids: Vec<u64> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(index.song_count().unwrap(), 4);

    for (i, &song_id) in song_ids.iter().enumerate() {
        let freq = 200.0 + i as f32 * 150.0;
        let query = tonal_clip(freq, 4.0, 500);
        let candidates = match_query(&index, &fingerprints_of(&query), 1).unwrap();
        assert_eq!(candidates[0].song_id, song_id);
    }
}
