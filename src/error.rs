use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// The error taxonomy for the fingerprinting core.
///
/// Queries translate `InternalNumeric` into a `no_match` result instead
/// of surfacing it (see `api::match_handler`); ingestion surfaces the
/// same condition as `InvalidInput`.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("audio file not found: {0}")]
    FileNotFound(String),

    #[error("unsupported audio format: {0}")]
    UnsupportedFormat(String),

    #[error("failed to decode audio: {0}")]
    DecodeFailure(String),

    #[error("match exceeded its deadline")]
    Timeout,

    #[error("track already present for this source")]
    DuplicateTrack,

    #[error("track not found: {0}")]
    NotFound(u64),

    #[error("index unavailable: {0}")]
    IndexUnavailable(String),

    #[error("internal numeric failure: {0}")]
    InternalNumeric(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for EngineError {
    fn into_response(self) -> Response {
        let status = match self {
            EngineError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            EngineError::FileNotFound(_) => StatusCode::NOT_FOUND,
            EngineError::UnsupportedFormat(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            EngineError::DecodeFailure(_) => StatusCode::BAD_REQUEST,
            EngineError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            EngineError::DuplicateTrack => StatusCode::CONFLICT,
            EngineError::NotFound(_) => StatusCode::NOT_FOUND,
            EngineError::IndexUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            EngineError::InternalNumeric(_) => StatusCode::INTERNAL_SERVER_ERROR,
            EngineError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            EngineError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
