//! Room registry: creates rooms on demand and forgets empty ones.

use std::collections::HashMap;

use mimic_protocol::RoomCode;
use tracing::info;

use crate::actor::{spawn_room, RoomHandle};
use crate::config::GameConfig;

/// Tracks every live room, keyed by code.
///
/// The registry itself is synchronous; the server wraps it in a mutex
/// and holds the lock across lookup-and-join (and leave-and-remove) so
/// two connections racing on the same code always agree on one actor.
pub struct RoomRegistry {
    rooms: HashMap<RoomCode, RoomHandle>,
    config: GameConfig,
}

impl RoomRegistry {
    /// Creates an empty registry. Every room it spawns shares `config`.
    pub fn new(config: GameConfig) -> Self {
        Self {
            rooms: HashMap::new(),
            config,
        }
    }

    /// Returns the room for `code`, spawning its actor on first use.
    ///
    /// A handle whose actor has already stopped (the room emptied out)
    /// is replaced with a fresh one, so a code can be reused after its
    /// room dies.
    pub fn get_or_create(&mut self, code: &RoomCode) -> RoomHandle {
        if let Some(handle) = self.rooms.get(code) {
            if !handle.is_closed() {
                return handle.clone();
            }
        }

        info!(room = %code, "room created");
        let handle = spawn_room(code.clone(), self.config.clone());
        self.rooms.insert(code.clone(), handle.clone());
        handle
    }

    /// Drops the registry's handle for `code`. No-op when absent.
    pub fn remove(&mut self, code: &RoomCode) {
        if self.rooms.remove(code).is_some() {
            info!(room = %code, "room removed");
        }
    }

    /// Returns the number of registered rooms.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new(GameConfig::default())
    }
}
