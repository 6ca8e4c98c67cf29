use std::panic;
use std::sync::Arc;

use collabwrite_realtime::clients::api_client::{ApiBackend, CrudApiClient};
use collabwrite_realtime::config::Config;
use collabwrite_realtime::routes::create_app;
use collabwrite_realtime::AppState;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Set panic hook for better error messages
    panic::set_hook(Box::new(|info| {
        eprintln!("PANIC: {info}");
    }));

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            // Default to info level, but allow debug for our app
            "collabwrite_realtime=debug,tower_http=debug,axum::rejection=trace,info".into()
        }))
        .init();

    info!("Starting CollabWrite realtime server...");

    // Load configuration
    let config = Config::load().unwrap_or_else(|e| {
        error!("Failed to load configuration: {}", e);
        warn!("Using default configuration");
        Config::default()
    });

    // Client for the external CRUD API (authentication + message persistence)
    let api = ApiBackend::Http(Arc::new(CrudApiClient::new(config.api_url.clone())));

    let state = Arc::new(AppState::new(config.clone(), api));
    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(config.server_address())
        .await
        .unwrap_or_else(|_| panic!("Failed to bind to {}", config.server_address()));

    info!("🚀 Realtime server running on http://{}", config.server_address());
    info!("📡 WebSocket available at ws://{}/ws", config.server_address());
    info!("📚 Swagger UI available at http://{}/swagger", config.server_address());
    info!("CORS enabled for: {}", config.frontend_url);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server failed to start");

    info!("Server stopped");
}

/// Resolves on SIGTERM or ctrl-c so in-flight connections can drain.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("ctrl-c received: shutting down"),
        _ = terminate => info!("SIGTERM received: shutting down"),
    }
}
