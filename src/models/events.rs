use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::models::ConnectedUser;

/// Named events received from clients, carried as a
/// `{"event": ..., "data": ...}` envelope over the WebSocket.
#[derive(Deserialize, Debug)]
#[serde(tag = "event", content = "data")]
pub enum ClientEvent {
    #[serde(rename = "join:document")]
    JoinDocument(JoinDocumentData),
    #[serde(rename = "leave:document")]
    LeaveDocument(DocumentRef),
    #[serde(rename = "message:send")]
    SendMessage(SendMessageData),
    #[serde(rename = "document:update-content")]
    UpdateContent(UpdateContentData),
    #[serde(rename = "typing:start")]
    TypingStart(DocumentRef),
    #[serde(rename = "typing:stop")]
    TypingStop(DocumentRef),
    #[serde(rename = "cursor:move")]
    CursorMove(CursorMoveData),
    #[serde(rename = "editor:change")]
    EditorChange(EditorChangeData),
    #[serde(rename = "request:sync")]
    RequestSync(DocumentRef),
    #[serde(rename = "sync:response")]
    SyncResponse(SyncResponseData),
    #[serde(rename = "join-room")]
    JoinRoom(JoinRoomData),
    #[serde(rename = "leave-room")]
    LeaveRoom(LeaveRoomData),
    #[serde(rename = "offer")]
    Offer(SignalData),
    #[serde(rename = "answer")]
    Answer(SignalData),
    #[serde(rename = "ice-candidate")]
    IceCandidate(CandidateData),
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct JoinDocumentData {
    #[serde(default)]
    pub document_id: String,
    #[serde(default)]
    pub token: String,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRef {
    pub document_id: String,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageData {
    pub document_id: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub token: String,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UpdateContentData {
    pub document_id: String,
    pub content: String,
    /// Claimed sender id; the relay substitutes the session identity.
    #[serde(default)]
    pub user_id: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CursorMoveData {
    pub document_id: String,
    pub position: u64,
    #[serde(default)]
    pub selection: Option<Selection>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Selection {
    pub start: u64,
    pub end: u64,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct EditorChangeData {
    pub document_id: String,
    pub content: String,
    #[serde(default)]
    pub version: Option<i64>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SyncResponseData {
    pub document_id: String,
    pub target_socket_id: Uuid,
    pub content: String,
    #[serde(default)]
    pub version: Option<i64>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct JoinRoomData {
    pub room_id: String,
    pub user_id: String,
    pub user_name: String,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct LeaveRoomData {
    pub room_id: String,
    #[serde(default)]
    pub user_id: Option<String>,
}

/// WebRTC offer/answer payload. `signal` is opaque to the relay and
/// `from` is discarded in favor of the actual connection id.
#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct SignalData {
    pub to: Uuid,
    #[serde(default)]
    pub from: Option<Value>,
    pub signal: Value,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CandidateData {
    pub to: Uuid,
    #[serde(default)]
    pub from: Option<Value>,
    pub candidate: Value,
}

/// Named events emitted to clients, using the same envelope as
/// [`ClientEvent`].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    #[serde(rename = "joined:document")]
    #[serde(rename_all = "camelCase")]
    JoinedDocument { document_id: String, message: String },
    #[serde(rename = "users:list")]
    UsersList(Vec<ConnectedUser>),
    #[serde(rename = "user:joined")]
    UserJoined(ConnectedUser),
    #[serde(rename = "user:left")]
    #[serde(rename_all = "camelCase")]
    UserLeft {
        user_id: String,
        user_full_name: String,
    },
    /// The persisted message exactly as the external API returned it.
    #[serde(rename = "message:new")]
    MessageNew(Value),
    #[serde(rename = "document:content-updated")]
    #[serde(rename_all = "camelCase")]
    ContentUpdated {
        document_id: String,
        content: String,
        user_id: String,
    },
    #[serde(rename = "user:typing")]
    #[serde(rename_all = "camelCase")]
    UserTyping {
        user_id: String,
        user_full_name: String,
    },
    #[serde(rename = "user:stopped-typing")]
    #[serde(rename_all = "camelCase")]
    UserStoppedTyping { user_id: String },
    #[serde(rename = "cursor:update")]
    #[serde(rename_all = "camelCase")]
    CursorUpdate {
        user_id: String,
        user_full_name: String,
        user_email: String,
        position: u64,
        #[serde(skip_serializing_if = "Option::is_none")]
        selection: Option<Selection>,
        timestamp: String,
    },
    #[serde(rename = "editor:update")]
    #[serde(rename_all = "camelCase")]
    EditorUpdate {
        content: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        version: Option<i64>,
        user_id: String,
        user_full_name: String,
        timestamp: String,
    },
    #[serde(rename = "sync:requested")]
    #[serde(rename_all = "camelCase")]
    SyncRequested { user_id: String, socket_id: Uuid },
    #[serde(rename = "sync:data")]
    #[serde(rename_all = "camelCase")]
    SyncData {
        content: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        version: Option<i64>,
        from_user_id: String,
    },
    /// Audio call membership; `user_id` is the peer's connection id.
    #[serde(rename = "user-joined")]
    #[serde(rename_all = "camelCase")]
    PeerJoined { user_id: Uuid, user_name: String },
    #[serde(rename = "user-left")]
    #[serde(rename_all = "camelCase")]
    PeerLeft { user_id: Uuid },
    #[serde(rename = "offer")]
    Offer { from: Uuid, signal: Value },
    #[serde(rename = "answer")]
    Answer { from: Uuid, signal: Value },
    #[serde(rename = "ice-candidate")]
    IceCandidate { from: Uuid, candidate: Value },
    #[serde(rename = "error")]
    Error { message: String },
}

impl ServerEvent {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}
