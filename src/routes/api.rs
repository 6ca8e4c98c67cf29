use std::sync::Arc;

use axum::http::{header, HeaderValue, Method};
use axum::{routing::get, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::Config;
use crate::docs::ApiDoc;
use crate::handlers::{diagnostics, health_check, root_check};
use crate::ws::handler::ws_handler;
use crate::AppState;

/// Create API routes
pub fn create_api_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root_check))
        .route("/health", get(health_check))
        .route("/diagnostics", get(diagnostics))
        .route("/ws", get(ws_handler))
        .with_state(state)
}

/// Assemble the full application router: API routes, Swagger UI, CORS
/// for the frontend origin and request tracing.
pub fn create_app(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config);

    Router::new()
        .merge(create_api_routes(state))
        .merge(SwaggerUi::new("/swagger").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(config: &Config) -> CorsLayer {
    let origin = config
        .frontend_url
        .parse::<HeaderValue>()
        .unwrap_or_else(|_| {
            warn!(
                "Invalid FRONTEND_URL '{}', falling back to http://localhost:5173",
                config.frontend_url
            );
            HeaderValue::from_static("http://localhost:5173")
        });

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
}
