use chrono::Utc;
use tracing::{info, warn};

use crate::models::{
    AuthedUser, ConnectedUser, CursorMoveData, DocumentRef, EditorChangeData, JoinDocumentData,
    SendMessageData, ServerEvent, SyncResponseData, UpdateContentData,
};
use crate::ws::session::SessionCtx;
use crate::AppState;

pub const MAX_MESSAGE_CHARS: usize = 2000;

pub const ERR_MISSING_FIELDS: &str = "Document ID et token requis";
pub const ERR_AUTH_FAILED: &str = "Authentification échouée";
pub const ERR_NOT_AUTHENTICATED: &str = "Non authentifié";
pub const ERR_EMPTY_MESSAGE: &str = "Le message ne peut pas être vide";
pub const ERR_MESSAGE_TOO_LONG: &str = "Le message est trop long (max 2000 caractères)";
pub const ERR_MESSAGE_NOT_SAVED: &str = "Impossible de sauvegarder le message";

const JOINED_MESSAGE: &str = "Connecté au document avec succès";

/// Authenticate against the external API and enter the document's
/// broadcast group. No registry state is touched until the credential
/// check has resolved.
pub async fn handle_join_document(
    state: &AppState,
    session: &mut SessionCtx,
    data: JoinDocumentData,
) {
    if data.document_id.is_empty() || data.token.is_empty() {
        state
            .registry
            .send_to(session.id, ServerEvent::error(ERR_MISSING_FIELDS))
            .await;
        return;
    }

    let user = match state.api.me(&data.token).await {
        Ok(user) => user,
        Err(e) => {
            warn!(
                "Authentication failed for connection {}: {}",
                session.id, e
            );
            state
                .registry
                .send_to(session.id, ServerEvent::error(ERR_AUTH_FAILED))
                .await;
            return;
        }
    };

    // A session is a member of at most one document group at a time.
    if let Some(previous) = session.current_document.take() {
        if previous != data.document_id {
            leave_group(state, session, &previous).await;
        }
    }

    info!(
        "User {} joined document {} (connection {})",
        user.id, data.document_id, session.id
    );

    state
        .registry
        .join_document(&data.document_id, session.id)
        .await;
    state.registry.set_identity(session.id, user.clone()).await;
    session.user = Some(user.clone());
    session.current_document = Some(data.document_id.clone());

    state
        .registry
        .broadcast_to_document(
            &data.document_id,
            ServerEvent::UserJoined(ConnectedUser::from(&user)),
            Some(session.id),
        )
        .await;
    state
        .registry
        .send_to(
            session.id,
            ServerEvent::JoinedDocument {
                document_id: data.document_id.clone(),
                message: JOINED_MESSAGE.to_string(),
            },
        )
        .await;

    let users = state.registry.document_members(&data.document_id).await;
    state
        .registry
        .broadcast_to_document(&data.document_id, ServerEvent::UsersList(users), None)
        .await;
}

/// Leave a document group explicitly. Safe to call for a group the
/// session never joined.
pub async fn handle_leave_document(state: &AppState, session: &mut SessionCtx, data: DocumentRef) {
    if session.current_document.as_deref() == Some(data.document_id.as_str()) {
        session.current_document = None;
    }
    leave_group(state, session, &data.document_id).await;
}

/// Cleanup half of the transport's disconnect path. Idempotent.
pub async fn handle_disconnect(state: &AppState, session: &mut SessionCtx) {
    if let Some(document_id) = session.current_document.take() {
        leave_group(state, session, &document_id).await;
    }
}

async fn leave_group(state: &AppState, session: &SessionCtx, document_id: &str) {
    state.registry.leave_document(document_id, session.id).await;

    // Sessions that never authenticated leave silently.
    if let Some(user) = &session.user {
        info!(
            "User {} left document {} (connection {})",
            user.id, document_id, session.id
        );
        state
            .registry
            .broadcast_to_document(
                document_id,
                ServerEvent::UserLeft {
                    user_id: user.id.clone(),
                    user_full_name: user.full_name.clone(),
                },
                Some(session.id),
            )
            .await;

        let users = state.registry.document_members(document_id).await;
        state
            .registry
            .broadcast_to_document(document_id, ServerEvent::UsersList(users), None)
            .await;
    }
}

/// Persist a chat message through the external API, then fan the
/// persisted representation out to the whole group (sender included).
pub async fn handle_send_message(state: &AppState, session: &SessionCtx, data: SendMessageData) {
    let Some(_user) = member_of(session, &data.document_id) else {
        state
            .registry
            .send_to(session.id, ServerEvent::error(ERR_NOT_AUTHENTICATED))
            .await;
        return;
    };

    let content = data.content.trim();
    if content.is_empty() {
        state
            .registry
            .send_to(session.id, ServerEvent::error(ERR_EMPTY_MESSAGE))
            .await;
        return;
    }
    if content.chars().count() > MAX_MESSAGE_CHARS {
        state
            .registry
            .send_to(session.id, ServerEvent::error(ERR_MESSAGE_TOO_LONG))
            .await;
        return;
    }

    match state
        .api
        .create_message(&data.document_id, &data.token, content)
        .await
    {
        Ok(saved) => {
            state
                .registry
                .broadcast_to_document(&data.document_id, ServerEvent::MessageNew(saved), None)
                .await;
        }
        Err(e) => {
            warn!(
                "Failed to persist message for document {}: {}",
                data.document_id, e
            );
            state
                .registry
                .send_to(session.id, ServerEvent::error(ERR_MESSAGE_NOT_SAVED))
                .await;
        }
    }
}

/// Relay the latest document content to the other members. Pure fan-out:
/// no storage, no diffing, receivers reconcile last-write-wins.
pub async fn handle_content_update(
    state: &AppState,
    session: &SessionCtx,
    data: UpdateContentData,
) {
    let Some(user) = require_member(state, session, &data.document_id).await else {
        return;
    };

    state
        .registry
        .broadcast_to_document(
            &data.document_id,
            ServerEvent::ContentUpdated {
                document_id: data.document_id.clone(),
                content: data.content,
                // the claimed user_id in the payload is ignored
                user_id: user.id,
            },
            Some(session.id),
        )
        .await;
}

pub async fn handle_typing_start(state: &AppState, session: &SessionCtx, data: DocumentRef) {
    let Some(user) = require_member(state, session, &data.document_id).await else {
        return;
    };

    state
        .registry
        .broadcast_to_document(
            &data.document_id,
            ServerEvent::UserTyping {
                user_id: user.id,
                user_full_name: user.full_name,
            },
            Some(session.id),
        )
        .await;
}

pub async fn handle_typing_stop(state: &AppState, session: &SessionCtx, data: DocumentRef) {
    let Some(user) = require_member(state, session, &data.document_id).await else {
        return;
    };

    state
        .registry
        .broadcast_to_document(
            &data.document_id,
            ServerEvent::UserStoppedTyping { user_id: user.id },
            Some(session.id),
        )
        .await;
}

pub async fn handle_cursor_move(state: &AppState, session: &SessionCtx, data: CursorMoveData) {
    let Some(user) = require_member(state, session, &data.document_id).await else {
        return;
    };

    state
        .registry
        .broadcast_to_document(
            &data.document_id,
            ServerEvent::CursorUpdate {
                user_id: user.id,
                user_full_name: user.full_name,
                user_email: user.email,
                position: data.position,
                selection: data.selection,
                timestamp: Utc::now().to_rfc3339(),
            },
            Some(session.id),
        )
        .await;
}

pub async fn handle_editor_change(state: &AppState, session: &SessionCtx, data: EditorChangeData) {
    let Some(user) = require_member(state, session, &data.document_id).await else {
        return;
    };

    state
        .registry
        .broadcast_to_document(
            &data.document_id,
            ServerEvent::EditorUpdate {
                content: data.content,
                version: data.version,
                user_id: user.id,
                user_full_name: user.full_name,
                timestamp: Utc::now().to_rfc3339(),
            },
            Some(session.id),
        )
        .await;
}

/// Ask the other members for the current editor state.
pub async fn handle_request_sync(state: &AppState, session: &SessionCtx, data: DocumentRef) {
    let Some(user) = require_member(state, session, &data.document_id).await else {
        return;
    };

    state
        .registry
        .broadcast_to_document(
            &data.document_id,
            ServerEvent::SyncRequested {
                user_id: user.id,
                socket_id: session.id,
            },
            Some(session.id),
        )
        .await;
}

/// Answer a sync request with a targeted send to the requesting
/// connection.
pub async fn handle_sync_response(state: &AppState, session: &SessionCtx, data: SyncResponseData) {
    let Some(user) = require_member(state, session, &data.document_id).await else {
        return;
    };

    state
        .registry
        .send_to(
            data.target_socket_id,
            ServerEvent::SyncData {
                content: data.content,
                version: data.version,
                from_user_id: user.id,
            },
        )
        .await;
}

fn member_of<'a>(session: &'a SessionCtx, document_id: &str) -> Option<&'a AuthedUser> {
    if session.current_document.as_deref() == Some(document_id) {
        session.user.as_ref()
    } else {
        None
    }
}

async fn require_member(
    state: &AppState,
    session: &SessionCtx,
    document_id: &str,
) -> Option<AuthedUser> {
    match member_of(session, document_id) {
        Some(user) => Some(user.clone()),
        None => {
            state
                .registry
                .send_to(session.id, ServerEvent::error(ERR_NOT_AUTHENTICATED))
                .await;
            None
        }
    }
}
