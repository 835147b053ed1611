//! Top-level error type for the server binary.

use mimic_protocol::ProtocolError;
use mimic_room::RoomError;

/// Wraps the errors a connection can hit on its way from accept to
/// close. The `#[from]` impls let `?` convert sub-crate errors.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Socket-level failure (bind, accept).
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// WebSocket handshake or frame failure.
    #[error(transparent)]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// Encode/decode failure.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Room-level failure (name taken, room gone).
    #[error(transparent)]
    Room(#[from] RoomError),

    /// The request path did not name a room and a player.
    #[error("bad request path: {0}")]
    BadPath(String),
}
