use utoipa::OpenApi;

use crate::models::*;

/// Root endpoint
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Server is running", body = RootResponse)
    )
)]
#[allow(dead_code)]
pub async fn root_check_doc() {}

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
#[allow(dead_code)]
pub async fn health_check_doc() {}

/// Presence diagnostics endpoint
#[utoipa::path(
    get,
    path = "/diagnostics",
    responses(
        (status = 200, description = "Presence and process diagnostics", body = DiagnosticsResponse)
    )
)]
#[allow(dead_code)]
pub async fn diagnostics_doc() {}

#[derive(OpenApi)]
#[openapi(
    paths(
        root_check_doc,
        health_check_doc,
        diagnostics_doc,
    ),
    components(
        schemas(RootResponse, HealthResponse, DiagnosticsResponse)
    ),
    tags(
        (name = "realtime", description = "CollabWrite realtime signaling endpoints")
    )
)]
pub struct ApiDoc;
