use super::AppState;
use crate::audio::loader;
use crate::dsp;
use crate::error::{EngineError, Result};
use crate::models::MatchResponse;
use crate::params::DEFAULT_TOP_K;
use axum::extract::{Multipart, State};
use axum::Json;

/// `POST /match`: take a short audio excerpt, return the best-matching
/// track or `match_found: false`.
///
/// Internal numeric failures (e.g. the excerpt decodes to silence and
/// yields no fingerprints) resolve to `no_match` rather than an HTTP
/// error — only genuinely bad requests or infrastructure faults are
/// surfaced as errors. A run that exceeds `match_timeout` is reported
/// as [`EngineError::Timeout`].
pub async fn match_handler(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<MatchResponse>> {
    let mut audio_bytes: Option<Vec<u8>> = None;
    let mut hint_ext: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| EngineError::InvalidInput(format!("malformed multipart body: {e}")))?
    {
        if field.name() == Some("audio_data") {
            hint_ext = field.file_name().and_then(|name| {
                std::path::Path::new(name).extension().map(|e| e.to_string_lossy().into_owned())
            });
            let bytes = field
                .bytes()
                .await
                .map_err(|e| EngineError::InvalidInput(format!("failed to read upload: {e}")))?;
            audio_bytes = Some(bytes.to_vec());
        }
    }

    let audio_bytes = audio_bytes
        .ok_or_else(|| EngineError::InvalidInput("missing 'audio_data' field".to_string()))?;

    let result = tokio::time::timeout(state.match_timeout, run_match(&state, audio_bytes, hint_ext))
        .await
        .map_err(|_| EngineError::Timeout)??;

    Ok(Json(result))
}

async fn run_match(
    state: &AppState,
    audio_bytes: Vec<u8>,
    hint_ext: Option<String>,
) -> Result<MatchResponse> {
    let raw = loader::load_audio_bytes(audio_bytes, hint_ext).await?;

    let fingerprints = match tokio::task::spawn_blocking(move || dsp::fingerprint(&raw))
        .await
        .map_err(|e| EngineError::Internal(format!("fingerprint task join error: {e}")))?
    {
        Ok(fps) => fps,
        Err(EngineError::InternalNumeric(reason)) => {
            tracing::warn!(reason, "query fingerprinting hit a numeric failure, reporting no_match");
            return Ok(MatchResponse::no_match());
        }
        Err(e) => return Err(e),
    };

    if fingerprints.is_empty() {
        return Ok(MatchResponse::no_match());
    }

    let candidates = crate::matcher::match_query(&state.index, &fingerprints, DEFAULT_TOP_K)?;
    let Some(best) = candidates.into_iter().next() else {
        return Ok(MatchResponse::no_match());
    };

    let track = state.index.get_track(best.song_id)?;

    Ok(MatchResponse {
        success: true,
        match_found: true,
        song_id: Some(best.song_id),
        score: Some(best.score),
        timestamp: Some(best.offset_seconds.floor().max(0.0) as u64),
        title: Some(track.metadata.title),
        artist: track.metadata.artist,
        album: track.metadata.album,
        cover_art: track.metadata.cover_url,
        youtube_id: track.metadata.youtube_id,
    })
}
