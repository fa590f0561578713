//! Server configuration
//!
//! Parsed from command line flags, with environment variable fallbacks for
//! the settings that usually differ between deployments.

use std::path::PathBuf;

use clap::Parser;

use crate::types::RoomId;

/// Default server address
pub const DEFAULT_ADDR: &str = "127.0.0.1:8080";

/// Default directory for room history files
pub const DEFAULT_DATA_DIR: &str = "./data";

/// Room that exists from startup and receives clients without a `room` query
pub const DEFAULT_ROOM_ID: &str = "general";

#[derive(Parser, Debug, Clone)]
#[command(name = "room_hub")]
#[command(about = "Multi-room WebSocket chat hub", long_about = None)]
pub struct Config {
    /// Address to bind the WebSocket listener to
    #[arg(short, long, env = "ROOM_HUB_ADDR", default_value = DEFAULT_ADDR)]
    pub addr: String,

    /// Directory holding one JSON history file per room
    #[arg(short, long, env = "ROOM_HUB_DATA_DIR", default_value = DEFAULT_DATA_DIR)]
    pub data_dir: PathBuf,

    /// Id of the room created at startup
    #[arg(long, default_value = DEFAULT_ROOM_ID)]
    pub default_room: String,

    /// Display name of the startup room
    #[arg(long, default_value = "General")]
    pub default_room_name: String,

    /// Description of the startup room
    #[arg(long, default_value = "General chat room")]
    pub default_room_description: String,
}

impl Config {
    pub fn default_room_id(&self) -> RoomId {
        RoomId::new(self.default_room.clone())
    }
}
