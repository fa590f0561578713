//! WebSocket connection handler
//!
//! Handles individual client connections: WebSocket handshake, binding the
//! connection to a room and username from the query string, and the reader
//! and writer tasks that bridge the socket to the hub.

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

use crate::error::AppError;
use crate::hub::HubHandle;
use crate::message::{ChatEvent, ClientFrame};
use crate::participant::Participant;
use crate::types::RoomId;

/// Largest inbound message or frame accepted before the connection is dropped
pub const MAX_FRAME_BYTES: usize = 512 * 1024;

/// Display name used when the client does not send one
pub const ANONYMOUS: &str = "Anonymous";

/// Room and username bound at connect time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectParams {
    pub room_id: RoomId,
    pub username: String,
}

impl ConnectParams {
    /// Parse `room` and `username` from a request query string
    ///
    /// Missing or empty values fall back to `default_room` and `ANONYMOUS`.
    pub fn from_query(query: Option<&str>, default_room: &RoomId) -> Self {
        let mut room_id = None;
        let mut username = None;

        for pair in query.unwrap_or("").split('&') {
            let mut it = pair.splitn(2, '=');
            let key = it.next().unwrap_or("");
            let value = percent_decode(it.next().unwrap_or(""));
            if value.is_empty() {
                continue;
            }
            match key {
                "room" => room_id = Some(RoomId::new(value)),
                "username" => username = Some(value),
                _ => {}
            }
        }

        Self {
            room_id: room_id.unwrap_or_else(|| default_room.clone()),
            username: username.unwrap_or_else(|| ANONYMOUS.to_string()),
        }
    }
}

/// Decode `%XX` escapes and `+` in a query component
fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'+' => out.push(b' '),
            b'%' if i + 2 < bytes.len() => {
                let (hi, lo) = (bytes[i + 1], bytes[i + 2]);
                if hi.is_ascii_hexdigit() && lo.is_ascii_hexdigit() {
                    out.push((hex_value(hi) << 4) | hex_value(lo));
                    i += 2;
                } else {
                    out.push(b'%');
                }
            }
            byte => out.push(byte),
        }
        i += 1;
    }

    String::from_utf8_lossy(&out).into_owned()
}

/// Value of one ASCII hex digit; callers check `is_ascii_hexdigit` first
fn hex_value(digit: u8) -> u8 {
    match digit {
        b'0'..=b'9' => digit - b'0',
        b'a'..=b'f' => digit - b'a' + 10,
        _ => digit - b'A' + 10,
    }
}

/// Handshake limits: oversized messages fail the read and end the connection
fn websocket_config() -> WebSocketConfig {
    let mut config = WebSocketConfig::default();
    config.max_message_size = Some(MAX_FRAME_BYTES);
    config.max_frame_size = Some(MAX_FRAME_BYTES);
    config
}

/// HTTP 404 sent instead of the upgrade when the room does not exist
fn room_not_found_response(room_id: &RoomId) -> ErrorResponse {
    let mut response = ErrorResponse::new(Some(format!("Room '{}' not found", room_id)));
    *response.status_mut() = StatusCode::NOT_FOUND;
    response
}

/// Accept connections forever, spawning a handler task for each one
pub async fn serve(listener: TcpListener, hub: HubHandle, default_room: RoomId) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                info!("New connection from {}", addr);
                let hub = hub.clone();
                let default_room = default_room.clone();

                tokio::spawn(async move {
                    if let Err(e) = handle_connection(stream, hub, default_room).await {
                        error!("Connection handler error: {}", e);
                    }
                });
            }
            Err(e) => {
                error!("Failed to accept connection: {}", e);
            }
        }
    }
}

/// Handle a new TCP connection
///
/// Performs the WebSocket handshake, registers a participant with the hub
/// and runs the reader and writer tasks until either ends.
pub async fn handle_connection(
    stream: TcpStream,
    hub: HubHandle,
    default_room: RoomId,
) -> Result<(), AppError> {
    let peer_addr = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    debug!("New TCP connection from {}", peer_addr);

    // WebSocket handshake, capturing the query string on the way.
    // Unknown rooms are refused before the upgrade.
    let mut params = None;
    let callback = |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
        let requested = ConnectParams::from_query(req.uri().query(), &default_room);
        // A busy room map leaves the decision to the hub
        let rejected = hub.try_room_exists(&requested.room_id) == Some(false);
        let response = if rejected {
            Err(room_not_found_response(&requested.room_id))
        } else {
            Ok(resp)
        };
        params = Some(requested);
        response
    };
    let handshake =
        tokio_tungstenite::accept_hdr_async_with_config(stream, callback, Some(websocket_config()))
            .await;
    let params = params.unwrap_or_else(|| ConnectParams::from_query(None, &default_room));
    let ws_stream = match handshake {
        Ok(ws_stream) => ws_stream,
        Err(tungstenite::Error::Http(response)) => {
            warn!(
                "Refused {} from {} with {}: {}",
                params.username,
                peer_addr,
                response.status(),
                AppError::RoomNotFound(params.room_id)
            );
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    // Create participant with its outbound queue
    let (participant, mut outbound) = Participant::new(params.username, params.room_id);
    let info = participant.info().clone();
    info!(
        "Client {} ({}) connecting to room {} from {}",
        info.id, info.username, info.room_id, peer_addr
    );

    // Register with the hub; an unknown room closes the queue right away
    if let Err(e) = hub.register(participant).await {
        error!("Failed to register client {} - hub closed", info.id);
        return Err(e);
    }

    let hub_read = hub.clone();
    let reader_info = info.clone();

    // Spawn read task (WebSocket -> Hub broadcast)
    let mut read_task = tokio::spawn(async move {
        let client_id = reader_info.id;
        while let Some(msg_result) = ws_receiver.next().await {
            match msg_result {
                Ok(Message::Text(text)) => {
                    match serde_json::from_str::<ClientFrame>(&text) {
                        Ok(frame) => {
                            let event = ChatEvent::text(
                                reader_info.room_id.clone(),
                                reader_info.username.clone(),
                                frame.content,
                            );
                            if hub_read.broadcast(event).await.is_err() {
                                debug!("Hub closed, ending read task for {}", client_id);
                                break;
                            }
                        }
                        Err(e) => {
                            warn!("Invalid JSON from {}: {}", client_id, e);
                        }
                    }
                }
                Ok(Message::Close(_)) => {
                    debug!("Client {} sent close frame", client_id);
                    break;
                }
                Ok(Message::Ping(_)) => {
                    // Pong is handled automatically by tungstenite
                    debug!("Ping from {}", client_id);
                }
                Ok(_) => {
                    // Binary and pong frames carry no chat content
                }
                Err(tungstenite::Error::Capacity(e)) => {
                    warn!("Oversized message from {}, closing: {}", client_id, e);
                    break;
                }
                Err(e) => {
                    debug!("WebSocket read error for {}: {}", client_id, e);
                    break;
                }
            }
        }
        debug!("Read task ended for {}", client_id);
    });

    // Spawn write task (outbound queue -> WebSocket)
    let writer_id = info.id;
    let mut write_task = tokio::spawn(async move {
        while let Some(event) = outbound.recv().await {
            match serde_json::to_string(&event) {
                Ok(json) => {
                    if ws_sender.send(Message::Text(json.into())).await.is_err() {
                        debug!("WebSocket send failed, ending write task");
                        break;
                    }
                }
                Err(e) => {
                    error!("Failed to serialize event {}: {}", event.id, e);
                }
            }
        }
        debug!("Write task ended for {}", writer_id);

        // Send close frame when done
        let _ = ws_sender.close().await;
    });

    // Wait for either task to complete
    tokio::select! {
        _ = &mut read_task => {
            debug!("Read task completed for {}", info.id);
            write_task.abort();
        }
        _ = &mut write_task => {
            debug!("Write task completed for {}", info.id);
            read_task.abort();
        }
    }

    // Idempotent if the hub already evicted or rejected this participant
    let client_id = info.id;
    let _ = hub.unregister(info).await;

    info!("Client {} disconnected", client_id);

    Ok(())
}
