use serde::{Deserialize, Serialize};

/// Metadata owned by the external metadata-enrichment collaborator;
/// the core stores it opaquely alongside each track's fingerprints.
/// Column names follow the `tracks` table of spec.md §6.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackMetadata {
    pub title: String,
    pub artist: Option<String>,
    pub album: Option<String>,
    pub duration_ms: Option<i64>,
    /// Together with `source_id`, uniquely identifies this track to
    /// whichever upstream collaborator supplied it (e.g. `"spotify"`).
    pub source_type: String,
    pub source_id: String,
    pub cover_url: Option<String>,
    pub release_date: Option<String>,
    pub spotify_url: Option<String>,
    pub youtube_url: Option<String>,
    pub youtube_id: Option<String>,
}

/// A fully-resolved track row, as returned by the index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    pub song_id: u64,
    #[serde(flatten)]
    pub metadata: TrackMetadata,
    pub created_at: String,
}
