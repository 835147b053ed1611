//! Error types for the room layer.

use mimic_protocol::{PlayerName, RoomCode};

/// Errors that can occur during room operations.
#[derive(Debug, thiserror::Error)]
pub enum RoomError {
    /// A player with this name is already in the room. The connection
    /// must be rejected without mutating room state.
    #[error("name {0} is already taken in room {1}")]
    NameTaken(PlayerName, RoomCode),

    /// The player is not in this room.
    #[error("player {0} is not in room {1}")]
    NotInRoom(PlayerName, RoomCode),

    /// The room's command channel is closed — its actor has stopped.
    #[error("room {0} is unavailable")]
    Unavailable(RoomCode),
}
