//! Message protocol definitions
//!
//! JSON shapes shared by the live WebSocket stream and history retrieval.
//! Clients only ever send `{"content": "..."}`; room and username are bound
//! when the connection is accepted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{EventId, RoomId};

/// Sender name used for hub-synthesized notices
pub const SYSTEM_SENDER: &str = "Sistema";

/// Kind of a chat event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// Message typed by a participant
    Text,
    /// Participant entered the room
    Join,
    /// Participant left or was evicted
    Leave,
    /// Announcement injected through a room relay
    System,
}

/// Unit of communication fanned out by the hub
///
/// Immutable once constructed; cloned per recipient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatEvent {
    pub id: EventId,
    pub room_id: RoomId,
    pub username: String,
    pub content: String,
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub created_at: DateTime<Utc>,
}

impl ChatEvent {
    fn new(room_id: RoomId, username: String, content: String, kind: EventKind) -> Self {
        Self {
            id: EventId::new(),
            room_id,
            username,
            content,
            kind,
            created_at: Utc::now(),
        }
    }

    /// Text message from a participant
    pub fn text(room_id: RoomId, username: impl Into<String>, content: impl Into<String>) -> Self {
        Self::new(room_id, username.into(), content.into(), EventKind::Text)
    }

    /// Join notice for `username`
    pub fn join(room_id: RoomId, username: &str) -> Self {
        Self::new(
            room_id,
            SYSTEM_SENDER.to_string(),
            format!("{} joined the room", username),
            EventKind::Join,
        )
    }

    /// Leave notice for `username`
    pub fn leave(room_id: RoomId, username: &str) -> Self {
        Self::new(
            room_id,
            SYSTEM_SENDER.to_string(),
            format!("{} left the room", username),
            EventKind::Leave,
        )
    }

    /// System announcement
    pub fn system(room_id: RoomId, content: impl Into<String>) -> Self {
        Self::new(room_id, SYSTEM_SENDER.to_string(), content.into(), EventKind::System)
    }

    /// Only text events are persisted
    pub fn is_persistent(&self) -> bool {
        self.kind == EventKind::Text
    }
}

/// Client → Server frame
#[derive(Debug, Deserialize)]
pub struct ClientFrame {
    pub content: String,
}

/// Room lifecycle status
///
/// Rooms are never archived in normal operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomStatus {
    Active,
    Archived,
}

/// Point-in-time description of a room returned by `list_rooms`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoomInfo {
    pub id: RoomId,
    pub name: String,
    pub description: String,
    pub status: RoomStatus,
    pub user_count: usize,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_frame_deserialize() {
        let json = r#"{"content": "hello"}"#;
        let frame: ClientFrame = serde_json::from_str(json).unwrap();
        assert_eq!(frame.content, "hello");
    }

    #[test]
    fn test_client_frame_ignores_room_and_username() {
        let json = r#"{"content": "hi", "room_id": "other", "username": "Mallory"}"#;
        let frame: ClientFrame = serde_json::from_str(json).unwrap();
        assert_eq!(frame.content, "hi");
    }

    #[test]
    fn test_chat_event_wire_shape() {
        let event = ChatEvent::text(RoomId::from("general"), "Alice", "hello");
        let value = serde_json::to_value(&event).unwrap();

        assert_eq!(value["room_id"], "general");
        assert_eq!(value["username"], "Alice");
        assert_eq!(value["content"], "hello");
        assert_eq!(value["type"], "text");
        assert!(value["id"].is_string());

        let created_at = value["created_at"].as_str().unwrap();
        assert!(DateTime::parse_from_rfc3339(created_at).is_ok());
    }

    #[test]
    fn test_join_notice_names_participant() {
        let event = ChatEvent::join(RoomId::from("general"), "Alice");
        assert_eq!(event.kind, EventKind::Join);
        assert_eq!(event.username, SYSTEM_SENDER);
        assert!(event.content.contains("Alice"));
        assert!(!event.is_persistent());
    }

    #[test]
    fn test_event_ids_unique() {
        let a = ChatEvent::text(RoomId::from("r"), "u", "x");
        let b = ChatEvent::text(RoomId::from("r"), "u", "x");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_room_status_serialize() {
        let json = serde_json::to_string(&RoomStatus::Archived).unwrap();
        assert_eq!(json, "\"archived\"");
    }
}
