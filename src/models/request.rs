use serde::{Deserialize, Serialize};
use super::TrackMetadata;

/// `POST /tracks` request body. `source_locator` is a filesystem path
/// to already-materialized audio bytes; resolving an external id to
/// bytes is a collaborator's job, not this crate's.
#[derive(Debug, Serialize, Deserialize)]
pub struct IngestRequest {
    pub source_locator: String,
    #[serde(flatten)]
    pub metadata: TrackMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestState {
    Queued,
    Processing,
    Done,
    Failed,
    Duplicate,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IngestAccepted {
    pub task_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestStatusResponse {
    pub task_id: String,
    pub state: IngestState,
    pub song_id: Option<u64>,
    pub error: Option<String>,
}

/// `POST /match` response body, shaped exactly as spec.md §6 specifies.
#[derive(Debug, Serialize, Deserialize)]
pub struct MatchResponse {
    pub success: bool,
    pub match_found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub song_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    #[serde(rename = "coverArt", skip_serializing_if = "Option::is_none")]
    pub cover_art: Option<String>,
    #[serde(rename = "youtubeId", skip_serializing_if = "Option::is_none")]
    pub youtube_id: Option<String>,
}

impl MatchResponse {
    pub fn no_match() -> Self {
        Self {
            success: true,
            match_found: false,
            song_id: None,
            score: None,
            timestamp: None,
            title: None,
            artist: None,
            album: None,
            cover_art: None,
            youtube_id: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatsResponse {
    pub song_count: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_sec: u64,
}
