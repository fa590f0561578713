//! Error types for the room hub
//!
//! Defines connection-level errors, outbound delivery errors and
//! message store errors. Uses thiserror for ergonomic error definitions.

use thiserror::Error;

use crate::types::RoomId;

/// Application-level errors
///
/// Everything here ends a single connection; none of it reaches the hub loop.
#[derive(Debug, Error)]
pub enum AppError {
    /// WebSocket protocol error (fatal)
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Channel send error (fatal - hub loop is gone)
    #[error("Channel send error")]
    ChannelSend,

    /// Registration against a room that does not exist
    #[error("Room not found: {0}")]
    RoomNotFound(RoomId),

    /// Message store failure surfaced to an administrative caller
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Outbound delivery errors
///
/// Returned by the non-blocking enqueue onto a participant's queue.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DeliveryError {
    /// The queue is at capacity (slow consumer)
    #[error("Outbound queue full")]
    QueueFull,

    /// The receiving end of the channel has been closed
    #[error("Channel closed")]
    ChannelClosed,
}

/// Message store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Room id that cannot be used as a file name
    #[error("Invalid room id: {0}")]
    InvalidRoomId(RoomId),
}
