//! Multi-room WebSocket Chat Hub Library
//!
//! The real-time distribution core of a chat service: tracks which connected
//! participants are in which room and fans every chat event out to the
//! room's current members, evicting participants that cannot keep up.
//!
//! # Features
//! - Idempotent room creation, with a default room at startup
//! - Join/leave notices broadcast by the hub
//! - Per-room FIFO fan-out through a single hub actor
//! - Slow-consumer eviction instead of backpressure
//! - Best-effort message history in per-room JSON files
//! - System announcements through per-room relays
//!
//! # Architecture
//! Uses the Actor pattern with `mpsc` channels:
//! - `Hub` is the central actor; all membership changes and fan-out go
//!   through its loop
//! - Each connection has a reader and a writer task talking to the hub
//!   through a `HubHandle` and its own bounded outbound queue
//! - Each `Room` guards its member set with its own lock so listing can run
//!   next to the hub loop
//!
//! # Example
//! ```ignore
//! use std::sync::Arc;
//! use tokio::net::TcpListener;
//! use room_hub::{serve, FileMessageStore, Hub, RoomId};
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = Arc::new(FileMessageStore::open("./data").await.unwrap());
//!     let (hub, handle) = Hub::new(store);
//!     tokio::spawn(hub.run());
//!
//!     handle.create_room(RoomId::from("general"), "General", "General chat room").await;
//!
//!     let listener = TcpListener::bind("127.0.0.1:8080").await.unwrap();
//!     serve(listener, handle, RoomId::from("general")).await;
//! }
//! ```

pub mod config;
pub mod error;
pub mod handler;
pub mod hub;
pub mod message;
pub mod participant;
pub mod room;
pub mod store;
pub mod types;

// Re-export main types for convenience
pub use config::Config;
pub use error::{AppError, DeliveryError, StoreError};
pub use handler::{handle_connection, serve, ConnectParams};
pub use hub::{Hub, HubCommand, HubHandle};
pub use message::{ChatEvent, ClientFrame, EventKind, RoomInfo, RoomStatus};
pub use participant::{Participant, ParticipantInfo};
pub use room::Room;
pub use store::{FileMessageStore, MessageStore};
pub use types::{ClientId, EventId, RoomId};
