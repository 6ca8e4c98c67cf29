pub mod clients;
pub mod config;
pub mod docs;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod ws;

use clients::api_client::ApiBackend;
use config::Config;
use ws::registry::SessionRegistry;

/// Shared state for the whole service: configuration, the presence
/// registry and the client for the external CRUD API.
pub struct AppState {
    pub config: Config,
    pub registry: SessionRegistry,
    pub api: ApiBackend,
}

impl AppState {
    pub fn new(config: Config, api: ApiBackend) -> Self {
        Self {
            config,
            registry: SessionRegistry::default(),
            api,
        }
    }
}
