//! audiofilter-server library
//!
//! Accepts audio uploads, keeps the bytes in an object store and the
//! metadata in SQLite, and hands each upload to the external processing
//! service in the background.

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::Method;
use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use audiofilter_common::config::UploadPolicy;

pub mod api;
pub mod db;
pub mod error;
pub mod services;
pub mod storage;

pub use error::{ApiError, ApiResult};

use services::{ProcessingClient, ProcessingNotifier, UploadOrchestrator};
use storage::ObjectStore;

/// Room for multipart boundaries and part headers on top of the file itself
const MULTIPART_OVERHEAD: u64 = 64 * 1024;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Metadata database
    pub db: SqlitePool,
    /// Audio and stem storage
    pub store: Arc<dyn ObjectStore>,
    /// Upload workflow
    pub orchestrator: Arc<UploadOrchestrator>,
    /// Server start, for health uptime
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    /// Create new application state
    pub fn new(
        db: SqlitePool,
        store: Arc<dyn ObjectStore>,
        processing_client: Arc<dyn ProcessingClient>,
        policy: UploadPolicy,
    ) -> Self {
        let notifier = ProcessingNotifier::new(db.clone(), processing_client);
        let orchestrator = UploadOrchestrator::new(db.clone(), store.clone(), notifier, policy);

        Self {
            db,
            store,
            orchestrator: Arc::new(orchestrator),
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let body_limit = match state.orchestrator.policy().max_file_size {
        Some(max) => {
            let limit = max.saturating_add(MULTIPART_OVERHEAD);
            DefaultBodyLimit::max(usize::try_from(limit).unwrap_or(usize::MAX))
        }
        None => DefaultBodyLimit::disable(),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Router::new()
        .merge(api::audio_routes())
        .merge(api::track_routes())
        .merge(api::health_routes())
        .layer(body_limit)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
