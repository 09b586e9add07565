//! slush-vaporizer library interface
//!
//! Audio "vaporization" as asynchronous jobs: an uploaded file goes through a
//! configurable SoX effect chain, optionally steered by a reference track's
//! tempo, brightness and loudness.

pub mod analysis;
pub mod api;
pub mod audio;
pub mod config;
pub mod effects;
pub mod error;
pub mod jobs;
pub mod loops;
pub mod options;
pub mod pipeline;
pub mod planner;
pub mod retention;
pub mod style;
pub mod types;

pub use crate::error::{ApiError, ApiResult, Result, VaporError};

use axum::Router;
use chrono::{DateTime, Utc};
use slush_common::events::EventBus;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::jobs::JobOrchestrator;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Job submission, status and preset lookup
    pub orchestrator: JobOrchestrator,
    /// Event bus for SSE broadcasting
    pub event_bus: EventBus,
    /// Where multipart uploads are saved
    pub uploads_dir: PathBuf,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last server-side error for diagnostics
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(orchestrator: JobOrchestrator, event_bus: EventBus, uploads_dir: PathBuf) -> Self {
        Self {
            orchestrator,
            event_bus,
            uploads_dir,
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::get;

    let outputs = ServeDir::new(state.orchestrator.output_dir());

    Router::new()
        .merge(api::health_routes())
        .merge(api::preset_routes())
        .merge(api::job_routes())
        .route("/api/events", get(api::event_stream))
        .nest_service("/api/outputs", outputs)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
