//! Health check endpoint
//!
//! Reports uptime, classifier wiring and the last recorded error.

use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;
use wba_common::Modality;

use crate::AppState;

/// Classifier wiring for one modality
#[derive(Debug, Serialize)]
pub struct ClassifierHealth {
    pub modality: Modality,
    pub configured: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub available: bool,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// "ok", or "degraded" when the database doesn't answer
    pub status: String,
    /// Module name ("wba-analyzer")
    pub module: String,
    /// Crate version from Cargo.toml
    pub version: String,
    /// Seconds since service started
    pub uptime_seconds: u64,
    pub classifiers: Vec<ClassifierHealth>,
    /// Last error message if any (for diagnostics)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime = Utc::now().signed_duration_since(state.startup_time);
    let uptime_seconds = uptime.num_seconds().max(0) as u64;

    let db_ok = sqlx::query("SELECT 1").execute(&state.db).await.is_ok();

    let classifiers = Modality::ALL
        .into_iter()
        .map(|modality| match state.orchestrator.classifiers().get(modality) {
            Some(classifier) => ClassifierHealth {
                modality,
                configured: true,
                name: Some(classifier.name().to_string()),
                available: classifier.is_available(),
            },
            None => ClassifierHealth {
                modality,
                configured: false,
                name: None,
                available: false,
            },
        })
        .collect();

    let last_error = state.last_error.read().await.clone();

    Json(HealthResponse {
        status: if db_ok { "ok" } else { "degraded" }.to_string(),
        module: "wba-analyzer".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds,
        classifiers,
        last_error,
    })
}

/// Build health check routes
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
