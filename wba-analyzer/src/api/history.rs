//! Session history endpoint
//!
//! Read-only view of persisted sessions, newest first.

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use crate::db::SessionRecord;
use crate::{ApiError, ApiResult, AppState};

pub const DEFAULT_HISTORY_LIMIT: u32 = 50;
pub const MAX_HISTORY_LIMIT: u32 = 500;

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub user_id: Option<String>,
    pub limit: Option<u32>,
}

/// GET /history?user_id=..&limit=..
pub async fn get_history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> ApiResult<Json<Vec<SessionRecord>>> {
    let user_id = query
        .user_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("user_id is required".to_string()))?;

    let limit = query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    if !(1..=MAX_HISTORY_LIMIT).contains(&limit) {
        return Err(ApiError::BadRequest(format!(
            "limit must be between 1 and {}, got {}",
            MAX_HISTORY_LIMIT, limit
        )));
    }

    let records = state.orchestrator.store().history(&user_id, limit).await?;
    tracing::debug!("History for {}: {} records", user_id, records.len());

    Ok(Json(records))
}

pub fn history_routes() -> Router<AppState> {
    Router::new().route("/history", get(get_history))
}
