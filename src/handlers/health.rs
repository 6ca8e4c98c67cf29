use std::sync::Arc;

use axum::{extract::State, Json};
use chrono::Utc;
use tracing::debug;

use crate::models::{HealthResponse, RootResponse};
use crate::AppState;

/// Root endpoint
pub async fn root_check() -> Json<RootResponse> {
    Json(RootResponse {
        message: "CollabWrite Realtime Server is running".to_string(),
    })
}

/// Health check endpoint
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    debug!("Health check requested");
    Json(HealthResponse {
        status: "ok".to_string(),
        timestamp: Utc::now().to_rfc3339(),
        connections: state.registry.connection_count().await,
    })
}
