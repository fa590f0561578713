//! Participant handle definition
//!
//! Represents one connected participant as seen by the hub: an identity plus
//! the sending half of a bounded outbound queue. The receiving half belongs to
//! the connection's writer task.

use tokio::sync::mpsc;

use crate::error::DeliveryError;
use crate::message::ChatEvent;
use crate::types::{ClientId, RoomId};

/// Capacity of each participant's outbound queue
pub const OUTBOUND_CAPACITY: usize = 256;

/// Identity of a participant
///
/// Carries the room id rather than a reference to the room; lookups always
/// go through the hub. This is what the reader task keeps around to request
/// its own unregistration without holding the outbound queue open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantInfo {
    /// Unique identifier for this participant
    pub id: ClientId,
    /// Display name, fixed at connect time
    pub username: String,
    /// Room the participant was assigned to at connect time
    pub room_id: RoomId,
}

/// Hub-side participant handle
///
/// Clones share the same outbound queue. The queue closes once the last
/// clone is dropped, which is how removal from a room ends the writer task.
#[derive(Debug, Clone)]
pub struct Participant {
    info: ParticipantInfo,
    /// Hub → connection event channel
    sender: mpsc::Sender<ChatEvent>,
}

impl Participant {
    /// Create a participant with the default outbound capacity
    pub fn new(
        username: impl Into<String>,
        room_id: RoomId,
    ) -> (Self, mpsc::Receiver<ChatEvent>) {
        Self::with_capacity(username, room_id, OUTBOUND_CAPACITY)
    }

    /// Create a participant whose outbound queue holds `capacity` events
    pub fn with_capacity(
        username: impl Into<String>,
        room_id: RoomId,
        capacity: usize,
    ) -> (Self, mpsc::Receiver<ChatEvent>) {
        let (sender, receiver) = mpsc::channel(capacity);
        let info = ParticipantInfo {
            id: ClientId::new(),
            username: username.into(),
            room_id,
        };
        (Self { info, sender }, receiver)
    }

    pub fn id(&self) -> ClientId {
        self.info.id
    }

    pub fn username(&self) -> &str {
        &self.info.username
    }

    pub fn room_id(&self) -> &RoomId {
        &self.info.room_id
    }

    pub fn info(&self) -> &ParticipantInfo {
        &self.info
    }

    /// Enqueue an event without waiting
    ///
    /// A full queue means the writer is not keeping up; the hub evicts on it.
    pub fn try_deliver(&self, event: ChatEvent) -> Result<(), DeliveryError> {
        self.sender.try_send(event).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => DeliveryError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => DeliveryError::ChannelClosed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_participant_creation() {
        let (participant, _rx) = Participant::new("Alice", RoomId::from("general"));

        assert_eq!(participant.username(), "Alice");
        assert_eq!(participant.room_id().as_str(), "general");
        assert_eq!(participant.info().id, participant.id());
    }

    #[tokio::test]
    async fn test_try_deliver_reports_full_queue() {
        let (participant, mut rx) = Participant::with_capacity("Alice", RoomId::from("r"), 1);
        let event = ChatEvent::text(RoomId::from("r"), "Bob", "one");

        assert_eq!(participant.try_deliver(event.clone()), Ok(()));
        assert_eq!(
            participant.try_deliver(event.clone()),
            Err(DeliveryError::QueueFull)
        );

        assert_eq!(rx.recv().await.unwrap().content, "one");
        assert_eq!(participant.try_deliver(event), Ok(()));
    }

    #[tokio::test]
    async fn test_try_deliver_reports_closed_queue() {
        let (participant, rx) = Participant::new("Alice", RoomId::from("r"));
        drop(rx);

        let event = ChatEvent::text(RoomId::from("r"), "Bob", "hi");
        assert_eq!(
            participant.try_deliver(event),
            Err(DeliveryError::ChannelClosed)
        );
    }

    #[tokio::test]
    async fn test_queue_closes_when_last_handle_dropped() {
        let (participant, mut rx) = Participant::new("Alice", RoomId::from("r"));
        let copy = participant.clone();

        drop(participant);
        assert!(copy
            .try_deliver(ChatEvent::system(RoomId::from("r"), "still open"))
            .is_ok());
        drop(copy);

        assert_eq!(rx.recv().await.unwrap().content, "still open");
        assert!(rx.recv().await.is_none());
    }
}
