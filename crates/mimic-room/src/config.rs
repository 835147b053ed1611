//! Per-room game configuration.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Minimum players required before the pre-game countdown may start.
pub const MIN_PLAYERS: usize = 3;

/// Recorded for players who stay silent through an association
/// sub-phase when its timer runs out.
pub const NO_ANSWER: &str = "...";

/// Shown to the impostor in place of the secret word.
pub const HIDDEN_WORD: &str = "???";

/// Countdown durations in seconds. Tunable defaults, not invariants.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Timers {
    /// Delay between quorum and round start.
    pub pre_game: u32,
    /// Each of the two association sub-phases.
    pub association: u32,
    pub voting: u32,
    pub reveal: u32,
}

impl Default for Timers {
    fn default() -> Self {
        Self {
            pre_game: 5,
            association: 30,
            voting: 25,
            reveal: 15,
        }
    }
}

/// Configuration shared by every room a registry creates.
#[derive(Debug, Clone)]
pub struct GameConfig {
    pub timers: Timers,
    /// Candidate secret words. Never empty: [`GameConfig::new`]
    /// substitutes the built-in list for an empty one.
    pub words: Arc<[String]>,
}

impl GameConfig {
    /// Builds a config, falling back to [`builtin_words`] when the
    /// provided list is empty so a round can always start.
    pub fn new(timers: Timers, words: Vec<String>) -> Self {
        let words: Arc<[String]> = if words.is_empty() {
            builtin_words()
        } else {
            words.into()
        };
        Self { timers, words }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            timers: Timers::default(),
            words: builtin_words(),
        }
    }
}

/// A small fallback word list so the server works without a words file.
pub fn builtin_words() -> Arc<[String]> {
    [
        "OCEAN", "GUITAR", "VOLCANO", "LIBRARY", "CIRCUS", "GLACIER", "PYRAMID", "SUBMARINE",
        "CARNIVAL", "LIGHTHOUSE", "TELESCOPE", "AVALANCHE",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}
