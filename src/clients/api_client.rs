use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::models::AuthedUser;

/// Failures observed while calling the external CRUD API.
#[derive(Debug)]
pub enum ApiError {
    /// The API rejected the supplied credential (401)
    Unauthorized,
    /// The API answered with a non-success status other than 401
    Upstream(StatusCode),
    /// The request never completed (network error, timeout)
    Request(reqwest::Error),
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::Unauthorized => write!(f, "credential rejected by the API"),
            ApiError::Upstream(status) => write!(f, "API returned status {}", status),
            ApiError::Request(e) => write!(f, "API request failed: {}", e),
        }
    }
}

impl std::error::Error for ApiError {}

/// HTTP client for the external CRUD API.
#[derive(Debug)]
pub struct CrudApiClient {
    client: Client,
    base_url: String,
}

impl CrudApiClient {
    pub fn new(base_url: String) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .expect("Failed to build reqwest client");

        Self { client, base_url }
    }

    /// `GET /auth/me`: resolve a bearer token into an identity.
    pub async fn me(&self, token: &str) -> Result<AuthedUser, ApiError> {
        let url = format!("{}/auth/me", self.base_url);
        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", token))
            .send()
            .await
            .map_err(ApiError::Request)?;

        match response.status() {
            status if status.is_success() => response.json().await.map_err(ApiError::Request),
            StatusCode::UNAUTHORIZED => Err(ApiError::Unauthorized),
            status => Err(ApiError::Upstream(status)),
        }
    }

    /// `POST /messages/{documentId}`: persist a chat message and return
    /// the API's representation of it.
    pub async fn create_message(
        &self,
        document_id: &str,
        token: &str,
        content: &str,
    ) -> Result<Value, ApiError> {
        let url = format!("{}/messages/{}", self.base_url, document_id);
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", token))
            .json(&json!({ "content": content }))
            .send()
            .await
            .map_err(ApiError::Request)?;

        match response.status() {
            status if status.is_success() => response.json().await.map_err(ApiError::Request),
            StatusCode::UNAUTHORIZED => Err(ApiError::Unauthorized),
            status => Err(ApiError::Upstream(status)),
        }
    }
}

/// In-memory stand-in for the CRUD API, used by tests.
#[derive(Debug, Default)]
pub struct MemoryApi {
    tokens: Mutex<HashMap<String, AuthedUser>>,
    fail_messages: AtomicBool,
}

impl MemoryApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept `token` as the credential of `user`.
    pub fn grant(&self, token: &str, user: AuthedUser) {
        self.tokens
            .lock()
            .expect("token map poisoned")
            .insert(token.to_string(), user);
    }

    /// Make subsequent `create_message` calls fail with a server error.
    pub fn set_fail_messages(&self, fail: bool) {
        self.fail_messages.store(fail, Ordering::SeqCst);
    }

    fn me(&self, token: &str) -> Result<AuthedUser, ApiError> {
        self.tokens
            .lock()
            .expect("token map poisoned")
            .get(token)
            .cloned()
            .ok_or(ApiError::Unauthorized)
    }

    fn create_message(
        &self,
        document_id: &str,
        token: &str,
        content: &str,
    ) -> Result<Value, ApiError> {
        let user = self.me(token)?;
        if self.fail_messages.load(Ordering::SeqCst) {
            return Err(ApiError::Upstream(StatusCode::INTERNAL_SERVER_ERROR));
        }
        Ok(json!({
            "id": Uuid::new_v4().to_string(),
            "documentId": document_id,
            "content": content,
            "userId": user.id,
            "userFullName": user.full_name,
            "createdAt": chrono::Utc::now().to_rfc3339(),
        }))
    }
}

/// The CRUD API as seen by the relays: real HTTP in production, an
/// in-memory map in tests.
#[derive(Clone)]
pub enum ApiBackend {
    Http(Arc<CrudApiClient>),
    Memory(Arc<MemoryApi>),
}

impl ApiBackend {
    pub async fn me(&self, token: &str) -> Result<AuthedUser, ApiError> {
        match self {
            Self::Http(client) => client.me(token).await,
            Self::Memory(api) => api.me(token),
        }
    }

    pub async fn create_message(
        &self,
        document_id: &str,
        token: &str,
        content: &str,
    ) -> Result<Value, ApiError> {
        match self {
            Self::Http(client) => client.create_message(document_id, token, content).await,
            Self::Memory(api) => api.create_message(document_id, token, content),
        }
    }
}
