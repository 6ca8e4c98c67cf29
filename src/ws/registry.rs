use std::collections::{HashMap, HashSet};

use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use crate::models::{AuthedUser, ConnectedUser, ServerEvent};

/// A participant of an audio call room, addressed by connection id.
#[derive(Debug, Clone, PartialEq)]
pub struct CallParticipant {
    pub connection_id: Uuid,
    pub user_id: String,
    pub user_name: String,
}

#[derive(Debug)]
struct ConnectionEntry {
    sender: mpsc::UnboundedSender<ServerEvent>,
    identity: Option<AuthedUser>,
}

/// Single source of truth for transient presence state: live connections,
/// document-group membership and call-room participation. All state is
/// process-local and lost on restart.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    connections: RwLock<HashMap<Uuid, ConnectionEntry>>,
    document_groups: RwLock<HashMap<String, HashSet<Uuid>>>,
    call_rooms: RwLock<HashMap<String, HashMap<Uuid, CallParticipant>>>,
}

impl SessionRegistry {
    /// Register a freshly accepted connection and its outbound channel.
    pub async fn register_connection(&self, id: Uuid, sender: mpsc::UnboundedSender<ServerEvent>) {
        self.connections.write().await.insert(
            id,
            ConnectionEntry {
                sender,
                identity: None,
            },
        );
    }

    /// Drop a connection entirely. Group/room cleanup happens separately.
    pub async fn unregister_connection(&self, id: Uuid) {
        self.connections.write().await.remove(&id);
    }

    /// Record the authenticated identity of a connection.
    pub async fn set_identity(&self, id: Uuid, user: AuthedUser) {
        if let Some(entry) = self.connections.write().await.get_mut(&id) {
            entry.identity = Some(user);
        }
    }

    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    pub async fn document_group_count(&self) -> usize {
        self.document_groups.read().await.len()
    }

    pub async fn call_room_count(&self) -> usize {
        self.call_rooms.read().await.len()
    }

    /// Add a connection to a document group. Idempotent.
    pub async fn join_document(&self, document_id: &str, connection_id: Uuid) {
        self.document_groups
            .write()
            .await
            .entry(document_id.to_string())
            .or_default()
            .insert(connection_id);
    }

    /// Remove a connection from a document group, pruning the key once
    /// the member set is empty. Idempotent.
    pub async fn leave_document(&self, document_id: &str, connection_id: Uuid) {
        let mut groups = self.document_groups.write().await;
        if let Some(members) = groups.get_mut(document_id) {
            members.remove(&connection_id);
            if members.is_empty() {
                groups.remove(document_id);
            }
        }
    }

    /// Snapshot of a document group's members that have completed
    /// authentication. Sessions without an identity are excluded.
    pub async fn document_members(&self, document_id: &str) -> Vec<ConnectedUser> {
        let groups = self.document_groups.read().await;
        let Some(members) = groups.get(document_id) else {
            return Vec::new();
        };

        let connections = self.connections.read().await;
        members
            .iter()
            .filter_map(|id| connections.get(id))
            .filter_map(|entry| entry.identity.as_ref().map(ConnectedUser::from))
            .collect()
    }

    /// Add a participant to a call room, returning a snapshot of the
    /// participants that were already present (captured before the
    /// insert, so the new joiner is never in it).
    pub async fn join_call_room(
        &self,
        room_id: &str,
        participant: CallParticipant,
    ) -> Vec<CallParticipant> {
        let mut rooms = self.call_rooms.write().await;
        let room = rooms.entry(room_id.to_string()).or_default();
        let existing = room.values().cloned().collect();
        room.insert(participant.connection_id, participant);
        existing
    }

    /// Remove a participant from a call room. Deletes the room entry as
    /// soon as it is empty. Returns true when the participant was
    /// actually present.
    pub async fn leave_call_room(&self, room_id: &str, connection_id: Uuid) -> bool {
        let mut rooms = self.call_rooms.write().await;
        let Some(room) = rooms.get_mut(room_id) else {
            return false;
        };
        let removed = room.remove(&connection_id).is_some();
        if room.is_empty() {
            rooms.remove(room_id);
        }
        removed
    }

    pub async fn call_room_participants(&self, room_id: &str) -> Vec<CallParticipant> {
        self.call_rooms
            .read()
            .await
            .get(room_id)
            .map(|room| room.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Deliver an event to one connection. Unknown or already-closed
    /// connection ids are silently dropped.
    pub async fn send_to(&self, connection_id: Uuid, event: ServerEvent) {
        if let Some(entry) = self.connections.read().await.get(&connection_id) {
            let _ = entry.sender.send(event);
        }
    }

    /// Fan an event out to every member of a document group, optionally
    /// excluding the originating connection.
    pub async fn broadcast_to_document(
        &self,
        document_id: &str,
        event: ServerEvent,
        exclude: Option<Uuid>,
    ) {
        let recipients: Vec<Uuid> = {
            let groups = self.document_groups.read().await;
            match groups.get(document_id) {
                Some(members) => members
                    .iter()
                    .copied()
                    .filter(|id| Some(*id) != exclude)
                    .collect(),
                None => return,
            }
        };

        let connections = self.connections.read().await;
        for id in recipients {
            if let Some(entry) = connections.get(&id) {
                let _ = entry.sender.send(event.clone());
            }
        }
    }

    /// Fan an event out to every participant of a call room, optionally
    /// excluding the originating connection.
    pub async fn broadcast_to_call_room(
        &self,
        room_id: &str,
        event: ServerEvent,
        exclude: Option<Uuid>,
    ) {
        let recipients: Vec<Uuid> = {
            let rooms = self.call_rooms.read().await;
            match rooms.get(room_id) {
                Some(room) => room
                    .keys()
                    .copied()
                    .filter(|id| Some(*id) != exclude)
                    .collect(),
                None => return,
            }
        };

        let connections = self.connections.read().await;
        for id in recipients {
            if let Some(entry) = connections.get(&id) {
                let _ = entry.sender.send(event.clone());
            }
        }
    }
}
