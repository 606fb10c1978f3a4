use axum::{
    routing::{delete, get, post},
    Router,
};
use landmark_server::api::{self, AppState};
use landmark_server::index::Index;
use landmark_server::ingest::Ingestor;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    tracing::info!("Starting landmark-server v0.1.0");

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8766".to_string());
    let db_path = std::env::var("DB_PATH").unwrap_or_else(|_| "./fingerprints.sqlite3".to_string());
    let match_timeout_secs: u64 = std::env::var("MATCH_TIMEOUT_SECS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(10);
    let ingest_workers: usize = std::env::var("INGEST_WORKERS")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(4);

    let index = Arc::new(Index::open(&db_path).expect("failed to open fingerprint index"));
    let ingestor = Ingestor::spawn(index.clone(), ingest_workers, ingest_workers * 4);

    let state = AppState {
        index,
        ingestor,
        match_timeout: Duration::from_secs(match_timeout_secs),
    };

    let app = Router::new()
        .route("/health", get(api::health::health_handler))
        .route("/match", post(api::match_handler::match_handler))
        .route("/tracks", post(api::ingest_handler::ingest_handler))
        .route("/tracks/ingest/:task_id", get(api::ingest_handler::ingest_status_handler))
        .route("/tracks/:song_id", delete(api::ingest_handler::delete_track_handler))
        .route("/stats", get(api::stats::stats_handler))
        .layer(CorsLayer::permissive())
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state);

    let addr: SocketAddr = bind_addr.parse().expect("invalid BIND_ADDR");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind to {addr}: {e}"));

    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await.expect("server error");
}
