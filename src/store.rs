//! Message history storage
//!
//! The hub only needs an append/read service; `MessageStore` is that seam.
//! `FileMessageStore` keeps the most recent events of each room in memory and
//! mirrors every room to `<data_dir>/<room_id>.json`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::StoreError;
use crate::message::ChatEvent;
use crate::types::RoomId;

/// Events retained per room, in memory and on disk
pub const CACHE_LIMIT: usize = 100;

/// History length served when the caller does not ask for one
pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Append-only, best-effort chat history
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Append an event to the room's history
    async fn save(&self, room_id: &RoomId, event: ChatEvent) -> Result<(), StoreError>;

    /// At most `limit` of the room's latest events, oldest first
    async fn get_recent(&self, room_id: &RoomId, limit: usize)
        -> Result<Vec<ChatEvent>, StoreError>;
}

/// JSON file backed store with an in-memory recency window
pub struct FileMessageStore {
    data_dir: PathBuf,
    /// RoomId -> last `CACHE_LIMIT` events in append order
    messages: RwLock<HashMap<RoomId, Vec<ChatEvent>>>,
}

impl FileMessageStore {
    /// Open (creating if needed) a data directory and load every room file in it
    pub async fn open(data_dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let data_dir = data_dir.into();
        tokio::fs::create_dir_all(&data_dir).await?;

        let mut messages = HashMap::new();
        let mut entries = tokio::fs::read_dir(&data_dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };

            match read_events(&path).await {
                Ok(mut events) => {
                    trim_to_limit(&mut events);
                    debug!("Loaded {} events for room {}", events.len(), stem);
                    messages.insert(RoomId::new(stem), events);
                }
                Err(e) => {
                    warn!("Skipping unreadable history file {}: {}", path.display(), e);
                }
            }
        }

        info!(
            "Message store opened at {} ({} rooms)",
            data_dir.display(),
            messages.len()
        );

        Ok(Self {
            data_dir,
            messages: RwLock::new(messages),
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// File backing a room, rejecting ids that would escape the data directory
    fn room_path(&self, room_id: &RoomId) -> Result<PathBuf, StoreError> {
        let id = room_id.as_str();
        if id.is_empty() || id == "." || id == ".." || id.contains(['/', '\\', '\0']) {
            return Err(StoreError::InvalidRoomId(room_id.clone()));
        }
        Ok(self.data_dir.join(format!("{}.json", id)))
    }

    /// Read a room's file without touching the cache
    async fn load_room(&self, room_id: &RoomId) -> Result<Vec<ChatEvent>, StoreError> {
        let path = self.room_path(room_id)?;
        match read_events(&path).await {
            Ok(events) => Ok(events),
            Err(StoreError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl MessageStore for FileMessageStore {
    async fn save(&self, room_id: &RoomId, event: ChatEvent) -> Result<(), StoreError> {
        let path = self.room_path(room_id)?;

        // Held across the write so files are never written out of order
        let mut messages = self.messages.write().await;
        let events = messages.entry(room_id.clone()).or_default();
        events.push(event);
        trim_to_limit(events);

        let data = serde_json::to_vec_pretty(events)?;
        tokio::fs::write(&path, data).await?;
        Ok(())
    }

    async fn get_recent(
        &self,
        room_id: &RoomId,
        limit: usize,
    ) -> Result<Vec<ChatEvent>, StoreError> {
        let cached = {
            let messages = self.messages.read().await;
            messages.get(room_id).cloned().unwrap_or_default()
        };

        let events = if cached.is_empty() {
            self.load_room(room_id).await?
        } else {
            cached
        };

        Ok(recent_window(events, limit))
    }
}

async fn read_events(path: &Path) -> Result<Vec<ChatEvent>, StoreError> {
    let data = tokio::fs::read(path).await?;
    Ok(serde_json::from_slice(&data)?)
}

fn trim_to_limit(events: &mut Vec<ChatEvent>) {
    if events.len() > CACHE_LIMIT {
        events.drain(..events.len() - CACHE_LIMIT);
    }
}

/// Last `limit` events ordered oldest first
///
/// Saves are detached from fan-out and may land out of order, so the
/// window is re-sorted by timestamp. The sort is stable.
fn recent_window(mut events: Vec<ChatEvent>, limit: usize) -> Vec<ChatEvent> {
    if events.len() > limit {
        events.drain(..events.len() - limit);
    }
    events.sort_by_key(|event| event.created_at);
    events
}
