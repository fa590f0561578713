//! Room struct definition
//!
//! A room owns the authoritative membership set for one chat scope. Each room
//! guards its members with its own lock, so rooms never contend with each
//! other and listing can read counts while the hub loop mutates membership.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, RwLock};

use crate::message::{ChatEvent, RoomInfo, RoomStatus};
use crate::participant::Participant;
use crate::types::{ClientId, RoomId};

/// Capacity of the per-room relay queue
pub const RELAY_CAPACITY: usize = 256;

/// Multi-participant chat room
#[derive(Debug)]
pub struct Room {
    /// Room identifier, unique within a hub
    pub id: RoomId,
    /// Display name
    pub name: String,
    pub description: String,
    pub status: RoomStatus,
    /// Room creation time
    pub created_at: DateTime<Utc>,
    /// Currently attached participants
    members: RwLock<HashMap<ClientId, Participant>>,
    /// Events published here are relayed into the hub's broadcast queue
    relay: mpsc::Sender<ChatEvent>,
}

impl Room {
    /// Create an empty room
    ///
    /// Returns the room together with the receiving end of its relay queue;
    /// the hub spawns the task that drains it.
    pub fn new(
        id: RoomId,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> (Self, mpsc::Receiver<ChatEvent>) {
        let (relay, relay_rx) = mpsc::channel(RELAY_CAPACITY);
        let room = Self {
            id,
            name: name.into(),
            description: description.into(),
            status: RoomStatus::Active,
            created_at: Utc::now(),
            members: RwLock::new(HashMap::new()),
            relay,
        };
        (room, relay_rx)
    }

    /// Attach a participant
    pub async fn add(&self, participant: Participant) {
        self.members
            .write()
            .await
            .insert(participant.id(), participant);
    }

    /// Detach a participant, closing its outbound queue
    ///
    /// Returns false if the participant was not in the room.
    pub async fn remove(&self, client_id: ClientId) -> bool {
        let removed = self.members.write().await.remove(&client_id);
        // Dropping the handle drops its sender; the writer sees the queue end
        // once any in-flight snapshot copies are gone as well.
        removed.is_some()
    }

    /// Point-in-time copy of the member handles
    pub async fn snapshot(&self) -> Vec<Participant> {
        self.members.read().await.values().cloned().collect()
    }

    /// Get the number of participants in the room
    pub async fn member_count(&self) -> usize {
        self.members.read().await.len()
    }

    /// Sender side of the relay queue
    pub fn relay(&self) -> mpsc::Sender<ChatEvent> {
        self.relay.clone()
    }

    pub async fn info(&self) -> RoomInfo {
        RoomInfo {
            id: self.id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            status: self.status,
            user_count: self.member_count().await,
            created_at: self.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_room() -> Room {
        let (room, _relay_rx) = Room::new(RoomId::from("general"), "General", "General chat room");
        room
    }

    #[tokio::test]
    async fn test_room_creation() {
        let room = test_room();

        assert_eq!(room.id.as_str(), "general");
        assert_eq!(room.name, "General");
        assert_eq!(room.status, RoomStatus::Active);
        assert_eq!(room.member_count().await, 0);
        assert!(room.snapshot().await.is_empty());
    }

    #[tokio::test]
    async fn test_room_add_and_count() {
        let room = test_room();
        let mut receivers = Vec::new();

        for name in ["Alice", "Bob", "Carol"] {
            let (participant, rx) = Participant::new(name, room.id.clone());
            receivers.push(rx);
            room.add(participant).await;
        }

        assert_eq!(room.member_count().await, 3);
        assert_eq!(room.snapshot().await.len(), 3);
    }

    #[tokio::test]
    async fn test_room_remove_closes_queue() {
        let room = test_room();
        let (alice, mut alice_rx) = Participant::new("Alice", room.id.clone());
        let alice_id = alice.id();
        room.add(alice).await;

        assert_eq!(room.member_count().await, 1);
        assert!(room.remove(alice_id).await);
        assert_eq!(room.member_count().await, 0);
        assert!(alice_rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_room_remove_unknown_participant() {
        let room = test_room();
        assert!(!room.remove(ClientId::new()).await);
    }

    #[tokio::test]
    async fn test_snapshot_is_a_copy() {
        let room = test_room();
        let (alice, _alice_rx) = Participant::new("Alice", room.id.clone());
        let alice_id = alice.id();
        room.add(alice).await;

        let snapshot = room.snapshot().await;
        room.remove(alice_id).await;

        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].username(), "Alice");
        assert_eq!(room.member_count().await, 0);
    }

    #[tokio::test]
    async fn test_room_info_reports_member_count() {
        let room = test_room();
        let (alice, _alice_rx) = Participant::new("Alice", room.id.clone());
        room.add(alice).await;

        let info = room.info().await;
        assert_eq!(info.id.as_str(), "general");
        assert_eq!(info.user_count, 1);
        assert_eq!(info.created_at, room.created_at);
    }

    #[tokio::test]
    async fn test_relay_delivers_to_receiver() {
        let (room, mut relay_rx) = Room::new(RoomId::from("r"), "R", "");
        room.relay()
            .send(ChatEvent::system(room.id.clone(), "maintenance at noon"))
            .await
            .unwrap();

        let event = relay_rx.recv().await.unwrap();
        assert_eq!(event.content, "maintenance at noon");
    }
}
