//! wba-analyzer library interface
//!
//! Exposes the fusion engine, classifier clients, session store and HTTP
//! router so the binary and the integration tests share one code path.

pub mod api;
pub mod classifiers;
pub mod db;
pub mod error;
pub mod fusion;
pub mod orchestrator;

pub use crate::error::{ApiError, ApiResult};
pub use crate::orchestrator::{AnalysisResponse, SessionInput, SessionOrchestrator};

use axum::http::HeaderValue;
use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Analysis pipeline with its classifiers and session store
    pub orchestrator: Arc<SessionOrchestrator>,
    /// CORS origins; "*" allows any
    pub allowed_origins: Vec<String>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last error for diagnostic purposes
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(db: SqlitePool, orchestrator: SessionOrchestrator) -> Self {
        let last_error = Arc::new(RwLock::new(None));
        Self {
            db,
            orchestrator: Arc::new(orchestrator.with_last_error(last_error.clone())),
            allowed_origins: vec!["*".to_string()],
            startup_time: Utc::now(),
            last_error,
        }
    }

    pub fn with_allowed_origins(mut self, origins: Vec<String>) -> Self {
        self.allowed_origins = origins;
        self
    }
}

/// CORS layer for the configured origins
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if origins.iter().any(|o| o == "*") {
        return base.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    base.allow_origin(AllowOrigin::list(allowed))
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.allowed_origins);

    Router::new()
        .merge(api::root_routes())
        .merge(api::analyze_routes())
        .merge(api::history_routes())
        .merge(api::health_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
