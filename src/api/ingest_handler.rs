use super::AppState;
use crate::error::{EngineError, Result};
use crate::models::{IngestAccepted, IngestRequest, IngestStatusResponse};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;

/// `POST /tracks`: enqueue a track for background ingestion.
pub async fn ingest_handler(
    State(state): State<AppState>,
    Json(req): Json<IngestRequest>,
) -> Result<(StatusCode, Json<IngestAccepted>)> {
    let task_id = state.ingestor.submit(req.source_locator, req.metadata).await?;
    Ok((StatusCode::ACCEPTED, Json(IngestAccepted { task_id })))
}

/// `GET /tracks/ingest/{task_id}`: poll an ingestion task's progress.
pub async fn ingest_status_handler(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<Json<IngestStatusResponse>> {
    state
        .ingestor
        .status(&task_id)
        .map(Json)
        .ok_or_else(|| EngineError::InvalidInput(format!("unknown ingest task: {task_id}")))
}

/// `DELETE /tracks/{song_id}`: cascade-delete a track and its
/// fingerprints.
pub async fn delete_track_handler(
    State(state): State<AppState>,
    Path(song_id): Path<u64>,
) -> Result<StatusCode> {
    state.index.delete_track(song_id)?;
    Ok(StatusCode::NO_CONTENT)
}
