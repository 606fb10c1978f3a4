use super::AppState;
use crate::error::Result;
use crate::models::StatsResponse;
use axum::extract::State;
use axum::Json;

/// `GET /stats`: how many tracks the index currently holds.
pub async fn stats_handler(State(state): State<AppState>) -> Result<Json<StatsResponse>> {
    let song_count = state.index.song_count()?;
    Ok(Json(StatsResponse { song_count }))
}
