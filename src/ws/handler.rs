use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::models::{ClientEvent, ServerEvent};
use crate::ws::{collab, rtc, session::SessionCtx};
use crate::AppState;

/// WebSocket handler
pub async fn ws_handler(State(state): State<Arc<AppState>>, ws: WebSocketUpgrade) -> Response {
    info!("New WebSocket connection attempt");
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle one WebSocket connection: assign a connection id, pump
/// outbound events, dispatch inbound events, and run cleanup exactly
/// once when the connection goes away.
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let connection_id = Uuid::new_v4();
    let mut session = SessionCtx::new(connection_id);

    info!("WebSocket connection established: {}", connection_id);

    let (mut sink, mut stream) = socket.split();
    let (sender, mut outbound) = mpsc::unbounded_channel::<ServerEvent>();
    state.registry.register_connection(connection_id, sender).await;

    // Forward queued events to the socket. A single writer task keeps
    // per-connection send order intact.
    let mut send_task = tokio::spawn(async move {
        while let Some(event) = outbound.recv().await {
            let payload = match serde_json::to_string(&event) {
                Ok(payload) => payload,
                Err(e) => {
                    error!("Failed to serialize event: {}", e);
                    continue;
                }
            };
            if sink.send(Message::Text(payload)).await.is_err() {
                break;
            }
        }
    });

    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Text(raw)) => {
                let event: ClientEvent = match serde_json::from_str(&raw) {
                    Ok(event) => event,
                    Err(e) => {
                        error!("Failed to parse event from {}: {}", connection_id, e);
                        continue;
                    }
                };
                dispatch(&state, &mut session, event).await;
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                debug!("WebSocket error on {}: {}", connection_id, e);
                break;
            }
        }
    }

    // A session may have joined one subsystem, both, or neither; both
    // cleanups are idempotent and never raise.
    collab::handle_disconnect(&state, &mut session).await;
    rtc::handle_disconnect(&state, &mut session).await;
    state.registry.unregister_connection(connection_id).await;
    send_task.abort();

    info!("WebSocket connection terminated: {}", connection_id);
}

async fn dispatch(state: &AppState, session: &mut SessionCtx, event: ClientEvent) {
    match event {
        ClientEvent::JoinDocument(data) => collab::handle_join_document(state, session, data).await,
        ClientEvent::LeaveDocument(data) => {
            collab::handle_leave_document(state, session, data).await
        }
        ClientEvent::SendMessage(data) => collab::handle_send_message(state, session, data).await,
        ClientEvent::UpdateContent(data) => {
            collab::handle_content_update(state, session, data).await
        }
        ClientEvent::TypingStart(data) => collab::handle_typing_start(state, session, data).await,
        ClientEvent::TypingStop(data) => collab::handle_typing_stop(state, session, data).await,
        ClientEvent::CursorMove(data) => collab::handle_cursor_move(state, session, data).await,
        ClientEvent::EditorChange(data) => collab::handle_editor_change(state, session, data).await,
        ClientEvent::RequestSync(data) => collab::handle_request_sync(state, session, data).await,
        ClientEvent::SyncResponse(data) => collab::handle_sync_response(state, session, data).await,
        ClientEvent::JoinRoom(data) => rtc::handle_join_room(state, session, data).await,
        ClientEvent::LeaveRoom(data) => rtc::handle_leave_room(state, session, data).await,
        ClientEvent::Offer(data) => rtc::handle_offer(state, session, data).await,
        ClientEvent::Answer(data) => rtc::handle_answer(state, session, data).await,
        ClientEvent::IceCandidate(data) => rtc::handle_ice_candidate(state, session, data).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::api_client::{ApiBackend, MemoryApi};
    use crate::config::Config;
    use crate::models::{AuthedUser, JoinDocumentData, JoinRoomData};
    use tokio::sync::mpsc::UnboundedReceiver;

    fn user(n: u32) -> AuthedUser {
        AuthedUser {
            id: format!("u{n}"),
            full_name: format!("User {n}"),
            email: format!("u{n}@example.com"),
        }
    }

    async fn connect(state: &AppState) -> (SessionCtx, UnboundedReceiver<ServerEvent>) {
        let id = Uuid::new_v4();
        let (tx, rx) = mpsc::unbounded_channel();
        state.registry.register_connection(id, tx).await;
        (SessionCtx::new(id), rx)
    }

    fn drain(rx: &mut UnboundedReceiver<ServerEvent>) -> Vec<ServerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn disconnect_cleans_up_both_subsystems_exactly_once() {
        let api = std::sync::Arc::new(MemoryApi::new());
        api.grant("tok-1", user(1));
        api.grant("tok-2", user(2));
        let state = std::sync::Arc::new(AppState::new(
            Config::default(),
            ApiBackend::Memory(api),
        ));

        let (mut s1, mut rx1) = connect(&state).await;
        let (mut s2, mut rx2) = connect(&state).await;

        for (session, token, name) in [(&mut s1, "tok-1", "alice"), (&mut s2, "tok-2", "bob")] {
            dispatch(
                &state,
                session,
                ClientEvent::JoinDocument(JoinDocumentData {
                    document_id: "doc-42".into(),
                    token: token.into(),
                }),
            )
            .await;
            dispatch(
                &state,
                session,
                ClientEvent::JoinRoom(JoinRoomData {
                    room_id: "call-42".into(),
                    user_id: name.into(),
                    user_name: name.into(),
                }),
            )
            .await;
        }
        drain(&mut rx1);
        drain(&mut rx2);

        // what handle_socket runs when s2 drops
        collab::handle_disconnect(&state, &mut s2).await;
        rtc::handle_disconnect(&state, &mut s2).await;
        state.registry.unregister_connection(s2.id).await;

        let events = drain(&mut rx1);
        let left = events
            .iter()
            .filter(|e| matches!(e, ServerEvent::UserLeft { .. }))
            .count();
        let peer_left = events
            .iter()
            .filter(|e| matches!(e, ServerEvent::PeerLeft { .. }))
            .count();
        assert_eq!(left, 1);
        assert_eq!(peer_left, 1);
        assert_eq!(state.registry.connection_count().await, 1);
    }
}
