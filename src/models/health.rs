use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// API response for the root endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct RootResponse {
    pub message: String,
}

/// API response for health check
#[derive(Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    /// Number of live WebSocket connections
    pub connections: usize,
}

/// API response for diagnostics
#[derive(Serialize, Deserialize, ToSchema)]
pub struct DiagnosticsResponse {
    pub connections: usize,
    pub document_groups: usize,
    pub call_rooms: usize,
    pub cpu_usage: f32,
    pub memory_used: u64,
    pub memory_total: u64,
}
