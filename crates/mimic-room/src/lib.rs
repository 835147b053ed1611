//! Room lifecycle management for Mimic.
//!
//! Each room runs as an isolated Tokio task (actor model) owning one
//! [`session`] state machine and its countdown. The registry hands out
//! handles; handles carry commands to the actor.
//!
//! # Key types
//!
//! - [`RoomRegistry`] — creates rooms on demand, forgets empty ones
//! - [`RoomHandle`] — send join/leave/action commands to a room actor
//! - [`GameConfig`] / [`Timers`] — per-room settings and countdowns

mod actor;
mod config;
mod error;
mod registry;
mod session;

pub use actor::{PlayerSender, RoomHandle};
pub use config::{builtin_words, GameConfig, Timers, HIDDEN_WORD, MIN_PLAYERS, NO_ANSWER};
pub use error::RoomError;
pub use registry::RoomRegistry;
