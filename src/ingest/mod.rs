//! Ingestion: decode, fingerprint, and commit a track without blocking
//! the HTTP layer, per spec.md §5's "(asynchronous... non-blocking)"
//! pipeline requirement.
//!
//! Submissions land on a bounded `mpsc` channel drained by a fixed pool
//! of worker tasks (one track in flight per worker slot at a time).
//! Callers poll `status` with the returned task id rather than holding
//! the HTTP connection open for the whole pipeline.

use crate::audio::loader;
use crate::dsp;
use crate::error::EngineError;
use crate::index::Index;
use crate::models::{IngestState, IngestStatusResponse, TrackMetadata};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

struct IngestJob {
    task_id: String,
    source_locator: String,
    metadata: TrackMetadata,
}

/// Shared handle for submitting ingestion work and polling its status.
/// Cloning is cheap; every clone talks to the same worker pool.
#[derive(Clone)]
pub struct Ingestor {
    sender: mpsc::Sender<IngestJob>,
    statuses: Arc<RwLock<HashMap<String, IngestStatusResponse>>>,
    shutdown: CancellationToken,
}

impl Ingestor {
    /// Spawn `worker_count` background tasks draining a bounded queue
    /// of depth `queue_capacity`, each committing finished tracks to
    /// `index`. Dropping the returned `Ingestor`'s shutdown token (via
    /// `shutdown()`) lets in-flight jobs stop at their next stage
    /// boundary instead of being killed mid-stage.
    pub fn spawn(index: Arc<Index>, worker_count: usize, queue_capacity: usize) -> Self {
        let (sender, receiver) = mpsc::channel(queue_capacity);
        let statuses: Arc<RwLock<HashMap<String, IngestStatusResponse>>> =
            Arc::new(RwLock::new(HashMap::new()));
        let shutdown = CancellationToken::new();

        let receiver = Arc::new(tokio::sync::Mutex::new(receiver));
        for worker_id in 0..worker_count {
            let receiver = receiver.clone();
            let index = index.clone();
            let statuses = statuses.clone();
            let shutdown = shutdown.clone();
            tokio::spawn(async move {
                loop {
                    let job = {
                        let mut rx = receiver.lock().await;
                        rx.recv().await
                    };
                    let Some(job) = job else { break };
                    tracing::debug!(worker_id, task_id = %job.task_id, "ingest worker picked up job");
                    run_job(job, &index, &statuses, &shutdown).await;
                }
            });
        }

        Self { sender, statuses, shutdown }
    }

    /// Enqueue a track for ingestion, returning its task id immediately.
    /// Blocks briefly if the queue is momentarily full; returns
    /// `IndexUnavailable` if every worker has shut down.
    pub async fn submit(&self, source_locator: String, metadata: TrackMetadata) -> crate::error::Result<String> {
        let task_id = uuid_like_id();
        self.statuses.write().insert(
            task_id.clone(),
            IngestStatusResponse {
                task_id: task_id.clone(),
                state: IngestState::Queued,
                song_id: None,
                error: None,
            },
        );

        let job = IngestJob { task_id: task_id.clone(), source_locator, metadata };
        self.sender
            .send(job)
            .await
            .map_err(|_| EngineError::IndexUnavailable("ingest workers not running".into()))?;

        Ok(task_id)
    }

    pub fn status(&self, task_id: &str) -> Option<IngestStatusResponse> {
        self.statuses.read().get(task_id).cloned()
    }

    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}

async fn run_job(
    job: IngestJob,
    index: &Index,
    statuses: &RwLock<HashMap<String, IngestStatusResponse>>,
    shutdown: &CancellationToken,
) {
    set_state(statuses, &job.task_id, IngestState::Processing, None, None);

    let outcome = ingest_one(job.source_locator, job.metadata, index, shutdown).await;
    match outcome {
        Ok(song_id) => set_state(statuses, &job.task_id, IngestState::Done, Some(song_id), None),
        Err(EngineError::DuplicateTrack) => {
            set_state(statuses, &job.task_id, IngestState::Duplicate, None, None)
        }
        Err(e) => {
            tracing::warn!(task_id = %job.task_id, error = %e, "ingest job failed");
            set_state(statuses, &job.task_id, IngestState::Failed, None, Some(e.to_string()))
        }
    }
}

async fn ingest_one(
    source_locator: String,
    metadata: TrackMetadata,
    index: &Index,
    shutdown: &CancellationToken,
) -> crate::error::Result<u64> {
    let raw = loader::load_audio(&source_locator).await?;

    if shutdown.is_cancelled() {
        return Err(EngineError::Internal("ingestion cancelled before hashing".into()));
    }

    let fingerprints = tokio::task::spawn_blocking(move || dsp::fingerprint(&raw))
        .await
        .map_err(|e| EngineError::Internal(format!("fingerprint task join error: {e}")))??;

    if shutdown.is_cancelled() {
        return Err(EngineError::Internal("ingestion cancelled before commit".into()));
    }

    let stored: Vec<crate::models::StoredFingerprint> = fingerprints
        .iter()
        .map(|fp| crate::models::StoredFingerprint { hash: fp.hash, song_id: 0, anchor_t_idx: fp.anchor_t_idx })
        .collect();

    index.put_track(&metadata, &stored)
}

fn set_state(
    statuses: &RwLock<HashMap<String, IngestStatusResponse>>,
    task_id: &str,
    state: IngestState,
    song_id: Option<u64>,
    error: Option<String>,
) {
    if let Some(entry) = statuses.write().get_mut(task_id) {
        entry.state = state;
        entry.song_id = song_id;
        entry.error = error;
    }
}

/// A process-local unique id, good enough for an in-memory task-status
/// key; no collision resistance beyond a single server's lifetime is
/// required.
fn uuid_like_id() -> String {
    use std::sync::atomic::{AtomicU64, Ordering};
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let n = COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("ingest-{n:016x}")
}
