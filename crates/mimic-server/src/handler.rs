//! Per-connection handler: path parsing, join, and message routing.
//!
//! Each accepted connection gets its own Tokio task running this
//! handler. The flow is:
//!   1. Parse `/ws/{room_code}/{player_name}` from the request path
//!   2. Join the room (rejecting duplicate names before any state moves)
//!   3. Spawn a writer task draining the room's outbound channel
//!   4. Loop: decode client actions, forward them to the room actor
//!   5. On close: leave the room, dropping it if it emptied

use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use mimic_protocol::{
    ClientAction, Codec, JsonCodec, PlayerName, RoomCode, ServerMessage,
};
use mimic_room::{GameConfig, RoomError, RoomRegistry};
use tokio::sync::{mpsc, Mutex};
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

use crate::error::ServerError;
use crate::transport::Incoming;

/// Shared server state, cheaply cloned into each connection task.
pub struct ServerState {
    /// The registry lock is held across lookup-and-join and across
    /// leave-and-remove, so racing connections on one code always agree
    /// on a single actor.
    pub registry: Mutex<RoomRegistry>,
    pub codec: JsonCodec,
}

impl ServerState {
    pub fn new(config: GameConfig) -> Arc<Self> {
        Arc::new(Self {
            registry: Mutex::new(RoomRegistry::new(config)),
            codec: JsonCodec,
        })
    }
}

/// Extracts the room code and player name from a request path of the
/// form `/ws/{room_code}/{player_name}`.
fn parse_path(path: &str) -> Option<(RoomCode, PlayerName)> {
    let mut parts = path.trim_start_matches('/').splitn(3, '/');
    if parts.next()? != "ws" {
        return None;
    }
    let code = RoomCode::new(parts.next()?);
    let name = PlayerName::new(parts.next()?);
    if code.as_str().is_empty() || name.as_str().is_empty() {
        return None;
    }
    Some((code, name))
}

/// Handles a single connection from upgrade to close.
pub async fn handle_connection(
    incoming: Incoming,
    state: Arc<ServerState>,
) -> Result<(), ServerError> {
    let Incoming { ws, path, peer } = incoming;
    let (mut sink, mut stream) = ws.split();

    let Some((code, name)) = parse_path(&path) else {
        let reject = state.codec.encode(&ServerMessage::Error {
            message: "expected path /ws/{room_code}/{player_name}".to_string(),
        })?;
        let _ = sink.send(Message::Text(reject.into())).await;
        let _ = sink.close().await;
        return Err(ServerError::BadPath(path));
    };

    let (tx, mut rx) = mpsc::unbounded_channel();
    let join_result = {
        let mut registry = state.registry.lock().await;
        let handle = registry.get_or_create(&code);
        handle.join(name.clone(), tx.clone()).await.map(|()| handle)
    };

    let handle = match join_result {
        Ok(handle) => handle,
        Err(err @ RoomError::NameTaken(..)) => {
            // The duplicate is turned away; the room never saw it.
            let reject = state.codec.encode(&ServerMessage::Error {
                message: err.to_string(),
            })?;
            let _ = sink.send(Message::Text(reject.into())).await;
            let _ = sink.close().await;
            info!(room = %code, player = %name, %peer, "rejected duplicate name");
            return Ok(());
        }
        Err(err) => return Err(err.into()),
    };

    info!(room = %code, player = %name, %peer, "player connected");

    // Writer task: drains the room's broadcasts into the socket. The
    // room actor never blocks on a slow client; if this sink stalls or
    // dies, messages pile up in the channel until the read loop notices
    // the closed connection.
    let codec = state.codec;
    let writer = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let text = match codec.encode(&msg) {
                Ok(text) => text,
                Err(e) => {
                    warn!(error = %e, "dropping unencodable message");
                    continue;
                }
            };
            if sink.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    // Read loop: every inbound frame is a client action for the room.
    while let Some(frame) = stream.next().await {
        let text = match frame {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue, // ping/pong/binary
            Err(e) => {
                debug!(room = %code, player = %name, error = %e, "recv error");
                break;
            }
        };

        match state.codec.decode::<ClientAction>(text.as_str()) {
            Ok(action) => {
                if handle.action(name.clone(), action).await.is_err() {
                    // Room actor is gone; nothing left to talk to.
                    break;
                }
            }
            Err(e) => {
                debug!(room = %code, player = %name, error = %e, "undecodable action");
                let _ = tx.send(ServerMessage::Error {
                    message: "invalid action".to_string(),
                });
            }
        }
    }

    // Leave and, when the room emptied, forget it — under one lock so a
    // concurrent join either sees the member or a fresh room.
    {
        let mut registry = state.registry.lock().await;
        if let Ok(remaining) = handle.leave(name.clone()).await {
            if remaining == 0 {
                registry.remove(&code);
            }
        }
    }
    writer.abort();

    info!(room = %code, player = %name, "player disconnected");
    Ok(())
}
