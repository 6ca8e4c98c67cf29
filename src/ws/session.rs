use uuid::Uuid;

use crate::models::AuthedUser;

/// Per-connection state owned by the transport endpoint. Created on
/// connect, populated by the join handlers, torn down on disconnect.
#[derive(Debug)]
pub struct SessionCtx {
    /// Connection id, stable for the lifetime of the connection.
    pub id: Uuid,
    /// Identity recorded after a successful `join:document` authentication.
    pub user: Option<AuthedUser>,
    /// Document group this session is currently a member of, if any.
    pub current_document: Option<String>,
    /// Call room this session is currently a participant of, if any.
    pub current_room: Option<String>,
}

impl SessionCtx {
    pub fn new(id: Uuid) -> Self {
        Self {
            id,
            user: None,
            current_document: None,
            current_room: None,
        }
    }
}
