use tracing::info;

use crate::models::{CandidateData, JoinRoomData, LeaveRoomData, ServerEvent, SignalData};
use crate::ws::registry::CallParticipant;
use crate::ws::session::SessionCtx;
use crate::AppState;

/// Enter an audio call room. The joiner is told about every participant
/// already present through individual `user-joined` events, then a
/// single `user-joined` for the newcomer is broadcast to the rest.
pub async fn handle_join_room(state: &AppState, session: &mut SessionCtx, data: JoinRoomData) {
    // A session participates in at most one call room at a time.
    if let Some(previous) = session.current_room.take() {
        leave_room(state, session, &previous).await;
    }

    info!(
        "User {} ({}) joining audio room {}",
        data.user_name, session.id, data.room_id
    );

    let existing = state
        .registry
        .join_call_room(
            &data.room_id,
            CallParticipant {
                connection_id: session.id,
                user_id: data.user_id,
                user_name: data.user_name.clone(),
            },
        )
        .await;
    session.current_room = Some(data.room_id.clone());

    for participant in existing {
        state
            .registry
            .send_to(
                session.id,
                ServerEvent::PeerJoined {
                    // peers are addressed by connection id, not account id
                    user_id: participant.connection_id,
                    user_name: participant.user_name,
                },
            )
            .await;
    }

    state
        .registry
        .broadcast_to_call_room(
            &data.room_id,
            ServerEvent::PeerJoined {
                user_id: session.id,
                user_name: data.user_name,
            },
            Some(session.id),
        )
        .await;
}

pub async fn handle_leave_room(state: &AppState, session: &mut SessionCtx, data: LeaveRoomData) {
    if session.current_room.as_deref() == Some(data.room_id.as_str()) {
        session.current_room = None;
    }
    leave_room(state, session, &data.room_id).await;
}

/// Cleanup half of the transport's disconnect path. Idempotent.
pub async fn handle_disconnect(state: &AppState, session: &mut SessionCtx) {
    if let Some(room_id) = session.current_room.take() {
        leave_room(state, session, &room_id).await;
    }
}

async fn leave_room(state: &AppState, session: &SessionCtx, room_id: &str) {
    if state.registry.leave_call_room(room_id, session.id).await {
        info!("Connection {} left audio room {}", session.id, room_id);
        state
            .registry
            .broadcast_to_call_room(
                room_id,
                ServerEvent::PeerLeft {
                    user_id: session.id,
                },
                Some(session.id),
            )
            .await;
    }
}

/// Relay a WebRTC offer verbatim. The signal payload is opaque; the
/// claimed sender is replaced with the relaying connection's id.
pub async fn handle_offer(state: &AppState, session: &SessionCtx, data: SignalData) {
    state
        .registry
        .send_to(
            data.to,
            ServerEvent::Offer {
                from: session.id,
                signal: data.signal,
            },
        )
        .await;
}

pub async fn handle_answer(state: &AppState, session: &SessionCtx, data: SignalData) {
    state
        .registry
        .send_to(
            data.to,
            ServerEvent::Answer {
                from: session.id,
                signal: data.signal,
            },
        )
        .await;
}

pub async fn handle_ice_candidate(state: &AppState, session: &SessionCtx, data: CandidateData) {
    state
        .registry
        .send_to(
            data.to,
            ServerEvent::IceCandidate {
                from: session.id,
                candidate: data.candidate,
            },
        )
        .await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clients::api_client::{ApiBackend, MemoryApi};
    use crate::config::Config;
    use serde_json::json;
    use std::sync::Arc;
    use tokio::sync::mpsc::{self, UnboundedReceiver};
    use uuid::Uuid;

    fn test_state() -> Arc<AppState> {
        Arc::new(AppState::new(
            Config::default(),
            ApiBackend::Memory(Arc::new(MemoryApi::new())),
        ))
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

    async fn join(state: &AppState, session: &mut SessionCtx, room_id: &str, name: &str) {
        handle_join_room(
            state,
            session,
            JoinRoomData {
                room_id: room_id.to_string(),
                user_id: format!("account-{name}"),
                user_name: name.to_string(),
            },
        )
        .await;
    }

    #[tokio::test]
    async fn late_joiner_learns_about_each_existing_participant() {
        let state = test_state();
        let (mut a, mut rx_a) = connect(&state).await;
        let (mut b, mut rx_b) = connect(&state).await;
        let (mut c, mut rx_c) = connect(&state).await;

        join(&state, &mut a, "room-1", "alice").await;
        join(&state, &mut b, "room-1", "bob").await;
        drain(&mut rx_a);
        drain(&mut rx_b);

        join(&state, &mut c, "room-1", "carol").await;

        // C receives one individually addressed user-joined per existing peer
        let mut seen: Vec<Uuid> = drain(&mut rx_c)
            .into_iter()
            .map(|event| match event {
                ServerEvent::PeerJoined { user_id, .. } => user_id,
                other => panic!("expected user-joined, got {other:?}"),
            })
            .collect();
        seen.sort();
        let mut expected = vec![a.id, b.id];
        expected.sort();
        assert_eq!(seen, expected);

        // A and B each receive exactly one user-joined for C
        for rx in [&mut rx_a, &mut rx_b] {
            let events = drain(rx);
            assert_eq!(
                events,
                vec![ServerEvent::PeerJoined {
                    user_id: c.id,
                    user_name: "carol".into(),
                }]
            );
        }
    }

    #[tokio::test]
    async fn leaving_last_participant_deletes_the_room() {
        let state = test_state();
        let (mut a, mut rx_a) = connect(&state).await;
        let (mut b, mut rx_b) = connect(&state).await;

        join(&state, &mut a, "room-1", "alice").await;
        join(&state, &mut b, "room-1", "bob").await;
        drain(&mut rx_a);
        drain(&mut rx_b);

        handle_leave_room(
            &state,
            &mut a,
            LeaveRoomData {
                room_id: "room-1".into(),
                user_id: None,
            },
        )
        .await;
        assert_eq!(
            drain(&mut rx_b),
            vec![ServerEvent::PeerLeft { user_id: a.id }]
        );

        handle_leave_room(
            &state,
            &mut b,
            LeaveRoomData {
                room_id: "room-1".into(),
                user_id: None,
            },
        )
        .await;
        assert_eq!(state.registry.call_room_count().await, 0);

        // a rejoin starts from an empty participant list
        join(&state, &mut a, "room-1", "alice").await;
        assert!(drain(&mut rx_a).is_empty());
    }

    #[tokio::test]
    async fn leaving_a_room_never_joined_is_a_no_op() {
        let state = test_state();
        let (mut a, mut rx_a) = connect(&state).await;
        let (mut b, mut rx_b) = connect(&state).await;
        join(&state, &mut a, "room-1", "alice").await;
        drain(&mut rx_a);

        handle_leave_room(
            &state,
            &mut b,
            LeaveRoomData {
                room_id: "room-1".into(),
                user_id: None,
            },
        )
        .await;

        assert!(drain(&mut rx_a).is_empty());
        assert!(drain(&mut rx_b).is_empty());
        assert_eq!(state.registry.call_room_participants("room-1").await.len(), 1);
    }

    #[tokio::test]
    async fn relayed_offer_carries_the_real_sender_id() {
        let state = test_state();
        let (mut a, mut rx_a) = connect(&state).await;
        let (mut b, mut rx_b) = connect(&state).await;
        join(&state, &mut a, "room-1", "alice").await;
        join(&state, &mut b, "room-1", "bob").await;
        drain(&mut rx_a);
        drain(&mut rx_b);

        handle_offer(
            &state,
            &a,
            SignalData {
                to: b.id,
                // spoofed sender claim is discarded
                from: Some(json!("not-alice")),
                signal: json!({"type": "offer", "sdp": "v=0"}),
            },
        )
        .await;

        assert_eq!(
            drain(&mut rx_b),
            vec![ServerEvent::Offer {
                from: a.id,
                signal: json!({"type": "offer", "sdp": "v=0"}),
            }]
        );
    }

    #[tokio::test]
    async fn signaling_to_a_dead_connection_is_silently_dropped() {
        let state = test_state();
        let (mut a, mut rx_a) = connect(&state).await;
        join(&state, &mut a, "room-1", "alice").await;
        drain(&mut rx_a);

        handle_ice_candidate(
            &state,
            &a,
            CandidateData {
                to: Uuid::new_v4(),
                from: None,
                candidate: json!({"candidate": "candidate:0"}),
            },
        )
        .await;

        // no error event comes back to the sender
        assert!(drain(&mut rx_a).is_empty());
    }

    #[tokio::test]
    async fn joining_a_second_room_leaves_the_first() {
        let state = test_state();
        let (mut a, mut rx_a) = connect(&state).await;
        let (mut b, mut rx_b) = connect(&state).await;
        join(&state, &mut a, "room-1", "alice").await;
        join(&state, &mut b, "room-1", "bob").await;
        drain(&mut rx_a);
        drain(&mut rx_b);

        join(&state, &mut b, "room-2", "bob").await;

        assert_eq!(
            drain(&mut rx_a),
            vec![ServerEvent::PeerLeft { user_id: b.id }]
        );
        assert_eq!(session_room(&b), Some("room-2"));
        assert_eq!(state.registry.call_room_participants("room-1").await.len(), 1);
    }

    fn session_room(session: &SessionCtx) -> Option<&str> {
        session.current_room.as_deref()
    }

    #[tokio::test]
    async fn disconnect_broadcasts_one_departure() {
        let state = test_state();
        let (mut a, mut rx_a) = connect(&state).await;
        let (mut b, mut rx_b) = connect(&state).await;
        join(&state, &mut a, "room-1", "alice").await;
        join(&state, &mut b, "room-1", "bob").await;
        drain(&mut rx_a);
        drain(&mut rx_b);

        handle_disconnect(&state, &mut b).await;
        // idempotent: a second run has nothing left to clean up
        handle_disconnect(&state, &mut b).await;

        assert_eq!(
            drain(&mut rx_a),
            vec![ServerEvent::PeerLeft { user_id: b.id }]
        );
    }
}
