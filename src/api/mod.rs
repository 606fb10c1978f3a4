pub mod health;
pub mod ingest_handler;
pub mod match_handler;
pub mod stats;

use crate::index::Index;
use crate::ingest::Ingestor;
use std::sync::Arc;
use std::time::Duration;

/// Shared state every handler reaches into: the durable index and the
/// ingestion worker pool, plus the per-request match deadline.
#[derive(Clone)]
pub struct AppState {
    pub index: Arc<Index>,
    pub ingestor: Ingestor,
    pub match_timeout: Duration,
}
