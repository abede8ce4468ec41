//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};

use crate::ui::state::AppState;

/// Body of `GET /api/health`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthDto {
    /// `"ok"` or `"draining"`
    pub status: String,
    pub worker: usize,
    pub pid: u32,
    pub connections: usize,
}

/// Health check endpoint
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthDto> {
    let status = if state.is_draining() { "draining" } else { "ok" };
    Json(HealthDto {
        status: status.to_string(),
        worker: state.worker_index,
        pid: std::process::id(),
        connections: state.repository.count().await,
    })
}
