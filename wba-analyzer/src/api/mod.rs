//! HTTP API handlers for wba-analyzer

pub mod analyze;
pub mod health;
pub mod history;

pub use analyze::analyze_routes;
pub use health::health_routes;
pub use history::history_routes;

use axum::{routing::get, Json, Router};
use serde_json::{json, Value};

use crate::AppState;

/// GET /
pub async fn service_banner() -> Json<Value> {
    Json(json!({
        "message": "Emotion-Wellbeing Assistant analyzer is running",
        "module": "wba-analyzer",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

pub fn root_routes() -> Router<AppState> {
    Router::new().route("/", get(service_banner))
}
