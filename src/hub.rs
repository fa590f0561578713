//! Hub actor implementation
//!
//! The central actor that serializes every membership change and every fan-out
//! decision. Register, unregister and broadcast requests all travel through one
//! command channel, so the loop sees them in a single arrival order and handles
//! them one at a time.
//!
//! The loop never awaits a participant: delivery is `try_send` and a full queue
//! gets the participant evicted.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, warn};

use crate::error::{AppError, DeliveryError};
use crate::message::{ChatEvent, RoomInfo};
use crate::participant::{Participant, ParticipantInfo};
use crate::room::Room;
use crate::store::{MessageStore, DEFAULT_HISTORY_LIMIT};
use crate::types::RoomId;

/// Buffer size of the hub command channel
pub const HUB_CHANNEL_CAPACITY: usize = 256;

/// Commands sent from connections, relays and admin callers to the Hub actor
#[derive(Debug)]
pub enum HubCommand {
    /// Attach a participant to its room
    Register(Participant),
    /// Detach a participant from its room
    Unregister(ParticipantInfo),
    /// Fan an event out to its room
    Broadcast(ChatEvent),
}

type RoomMap = Arc<RwLock<HashMap<RoomId, Arc<Room>>>>;

/// The Hub actor
///
/// Owns the receiving end of the command channel. Spawn `run` once per hub.
pub struct Hub {
    /// All rooms: RoomId -> Room
    rooms: RoomMap,
    store: Arc<dyn MessageStore>,
    /// Command receiver channel
    receiver: mpsc::Receiver<HubCommand>,
}

/// Cloneable handle used by everything outside the hub loop
#[derive(Clone)]
pub struct HubHandle {
    rooms: RoomMap,
    store: Arc<dyn MessageStore>,
    sender: mpsc::Sender<HubCommand>,
}

impl Hub {
    /// Create a hub and the handle that feeds it
    pub fn new(store: Arc<dyn MessageStore>) -> (Self, HubHandle) {
        let (sender, receiver) = mpsc::channel(HUB_CHANNEL_CAPACITY);
        let rooms: RoomMap = Arc::new(RwLock::new(HashMap::new()));

        let hub = Self {
            rooms: Arc::clone(&rooms),
            store: Arc::clone(&store),
            receiver,
        };
        let handle = HubHandle {
            rooms,
            store,
            sender,
        };
        (hub, handle)
    }

    /// Run the Hub event loop
    ///
    /// Continuously receives and processes commands until every handle is dropped.
    pub async fn run(mut self) {
        info!("Hub started");

        while let Some(cmd) = self.receiver.recv().await {
            self.handle_command(cmd).await;
        }

        info!("Hub shutting down");
    }

    /// Process a single command and everything it triggers
    ///
    /// Join/leave notices and evictions are queued locally and drained before
    /// the next command is received, so they keep their place in the order.
    async fn handle_command(&mut self, cmd: HubCommand) {
        let mut pending = VecDeque::from([cmd]);

        while let Some(cmd) = pending.pop_front() {
            match cmd {
                HubCommand::Register(participant) => {
                    self.handle_register(participant, &mut pending).await;
                }
                HubCommand::Unregister(info) => {
                    self.handle_unregister(info, &mut pending).await;
                }
                HubCommand::Broadcast(event) => {
                    self.handle_broadcast(event, &mut pending).await;
                }
            }
        }
    }

    /// Handle participant registration
    async fn handle_register(
        &mut self,
        participant: Participant,
        pending: &mut VecDeque<HubCommand>,
    ) {
        let Some(room) = self.get_room(participant.room_id()).await else {
            // Dropping the only handle closes the outbound queue
            warn!(
                "Rejected {} ({}): {}",
                participant.username(),
                participant.id(),
                AppError::RoomNotFound(participant.room_id().clone())
            );
            return;
        };

        let join = ChatEvent::join(room.id.clone(), participant.username());
        info!("{} joined room {}", participant.username(), room.id);

        room.add(participant).await;
        debug!("Room {} now has {} members", room.id, room.member_count().await);

        pending.push_back(HubCommand::Broadcast(join));
    }

    /// Handle participant unregistration (disconnect or eviction)
    async fn handle_unregister(&mut self, info: ParticipantInfo, pending: &mut VecDeque<HubCommand>) {
        let Some(room) = self.get_room(&info.room_id).await else {
            return;
        };

        if !room.remove(info.id).await {
            debug!("{} already left room {}", info.id, room.id);
            return;
        }

        info!("{} left room {}", info.username, room.id);
        pending.push_back(HubCommand::Broadcast(ChatEvent::leave(
            room.id.clone(),
            &info.username,
        )));
    }

    /// Handle event fan-out
    async fn handle_broadcast(&mut self, event: ChatEvent, pending: &mut VecDeque<HubCommand>) {
        if event.is_persistent() {
            self.persist_detached(event.clone());
        }

        let Some(room) = self.get_room(&event.room_id).await else {
            debug!("Dropping event for unknown room {}", event.room_id);
            return;
        };

        for participant in room.snapshot().await {
            match participant.try_deliver(event.clone()) {
                Ok(()) => {}
                Err(DeliveryError::QueueFull) => {
                    warn!(
                        "Evicting slow consumer {} ({}) from room {}",
                        participant.username(),
                        participant.id(),
                        room.id
                    );
                    pending.push_back(HubCommand::Unregister(participant.info().clone()));
                }
                Err(DeliveryError::ChannelClosed) => {
                    debug!("Outbound queue of {} already closed", participant.id());
                    pending.push_back(HubCommand::Unregister(participant.info().clone()));
                }
            }
        }
    }

    /// Hand an event to the store without waiting for it
    fn persist_detached(&self, event: ChatEvent) {
        let store = Arc::clone(&self.store);
        tokio::spawn(async move {
            let room_id = event.room_id.clone();
            let event_id = event.id;
            if let Err(e) = store.save(&room_id, event).await {
                warn!("Failed to persist event {} in room {}: {}", event_id, room_id, e);
            }
        });
    }

    async fn get_room(&self, room_id: &RoomId) -> Option<Arc<Room>> {
        self.rooms.read().await.get(room_id).cloned()
    }
}

impl HubHandle {
    /// Queue a participant for registration
    pub async fn register(&self, participant: Participant) -> Result<(), AppError> {
        self.send(HubCommand::Register(participant)).await
    }

    /// Queue a participant for removal; a no-op if it already left
    pub async fn unregister(&self, info: ParticipantInfo) -> Result<(), AppError> {
        self.send(HubCommand::Unregister(info)).await
    }

    /// Queue an event for fan-out to its room
    pub async fn broadcast(&self, event: ChatEvent) -> Result<(), AppError> {
        self.send(HubCommand::Broadcast(event)).await
    }

    async fn send(&self, cmd: HubCommand) -> Result<(), AppError> {
        self.sender.send(cmd).await.map_err(|_| AppError::ChannelSend)
    }

    /// Create a room, or return the existing one with the same id
    ///
    /// New rooms get a relay task that forwards anything published on the
    /// room's relay queue into the hub's broadcast path.
    pub async fn create_room(
        &self,
        id: RoomId,
        name: impl Into<String>,
        description: impl Into<String>,
    ) -> Arc<Room> {
        let mut rooms = self.rooms.write().await;
        if let Some(room) = rooms.get(&id) {
            return Arc::clone(room);
        }

        let (room, relay_rx) = Room::new(id.clone(), name, description);
        let room = Arc::new(room);
        rooms.insert(id, Arc::clone(&room));
        tokio::spawn(relay_room(room.id.clone(), relay_rx, self.sender.downgrade()));

        info!("Room created: {} ({})", room.name, room.id);
        room
    }

    /// Room lookup for synchronous callers such as the handshake callback
    ///
    /// Returns `None` while `create_room` holds the map.
    pub fn try_room_exists(&self, room_id: &RoomId) -> Option<bool> {
        self.rooms
            .try_read()
            .ok()
            .map(|rooms| rooms.contains_key(room_id))
    }

    pub async fn room(&self, room_id: &RoomId) -> Option<Arc<Room>> {
        self.rooms.read().await.get(room_id).cloned()
    }

    /// Current member count of a room, if it exists
    pub async fn member_count(&self, room_id: &RoomId) -> Option<usize> {
        match self.room(room_id).await {
            Some(room) => Some(room.member_count().await),
            None => None,
        }
    }

    /// Snapshot of every room, ordered by id
    pub async fn list_rooms(&self) -> Vec<RoomInfo> {
        let rooms: Vec<Arc<Room>> = self.rooms.read().await.values().cloned().collect();

        let mut infos = Vec::with_capacity(rooms.len());
        for room in rooms {
            infos.push(room.info().await);
        }
        infos.sort_by(|a, b| a.id.cmp(&b.id));
        infos
    }

    /// Publish a system notice through the room's relay
    pub async fn announce(&self, room_id: &RoomId, content: impl Into<String>) -> Result<(), AppError> {
        let room = self
            .room(room_id)
            .await
            .ok_or_else(|| AppError::RoomNotFound(room_id.clone()))?;

        room.relay()
            .send(ChatEvent::system(room.id.clone(), content))
            .await
            .map_err(|_| AppError::ChannelSend)
    }

    /// Most recent persisted messages of a room, oldest first
    ///
    /// `None` serves `DEFAULT_HISTORY_LIMIT` events.
    pub async fn recent_messages(
        &self,
        room_id: &RoomId,
        limit: Option<usize>,
    ) -> Result<Vec<ChatEvent>, AppError> {
        let limit = limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
        Ok(self.store.get_recent(room_id, limit).await?)
    }
}

/// Forward a room's relay queue into the hub
///
/// Holds only a weak sender so an idle relay never keeps the hub loop alive.
async fn relay_room(
    room_id: RoomId,
    mut relay_rx: mpsc::Receiver<ChatEvent>,
    hub: mpsc::WeakSender<HubCommand>,
) {
    while let Some(event) = relay_rx.recv().await {
        let Some(sender) = hub.upgrade() else {
            break;
        };
        if sender.send(HubCommand::Broadcast(event)).await.is_err() {
            break;
        }
    }
    debug!("Relay for room {} stopped", room_id);
}
