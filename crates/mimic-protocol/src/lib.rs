//! Wire protocol for the Mimic game server.
//!
//! This crate defines the "language" that clients and the server speak:
//!
//! - **Types** ([`ClientAction`], [`ServerMessage`], [`Phase`], etc.) —
//!   the message structures that travel on the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]) — how those messages are
//!   converted to/from WebSocket text frames.
//! - **Errors** ([`ProtocolError`]) — what can go wrong during
//!   encoding/decoding.
//!
//! The protocol layer knows nothing about connections, rooms, or timers —
//! it only describes message shapes.

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    ClientAction, Faction, Phase, PlayerName, PlayerStatus, Recipient, Role, RoomCode,
    ServerMessage,
};
