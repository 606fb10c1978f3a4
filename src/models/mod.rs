pub mod fingerprint;
pub mod request;
pub mod track;

pub use fingerprint::StoredFingerprint;
pub use request::{
    HealthResponse, IngestAccepted, IngestRequest, IngestState, IngestStatusResponse,
    MatchResponse, StatsResponse,
};
pub use track::{Track, TrackMetadata};
