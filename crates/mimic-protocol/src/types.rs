//! Core protocol types for Mimic's wire format.
//!
//! Everything a browser client and the server exchange is defined here:
//! inbound actions carry an `action` tag, outbound broadcasts carry a
//! `type` tag. The JSON shapes are load-bearing — the client reads these
//! fields by name — so the serde attributes below are part of the
//! protocol, not an implementation detail.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A player's display name, unique within a room.
///
/// Newtype over `String` so a player name and a room code can never be
/// swapped by accident. `#[serde(transparent)]` keeps the wire format a
/// plain JSON string, which also lets the name serve directly as a map
/// key in broadcast payloads.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PlayerName(pub String);

impl PlayerName {
    /// Creates a name from raw client input, trimming surrounding
    /// whitespace the way the connect endpoint expects.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A room code identifying one game instance.
///
/// Codes are case-insensitive on the way in; [`RoomCode::new`] uppercases
/// so that `abcd` and `ABCD` address the same room.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RoomCode(pub String);

impl RoomCode {
    pub fn new(code: impl AsRef<str>) -> Self {
        Self(code.as_ref().trim().to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Game enums
// ---------------------------------------------------------------------------

/// The phase a room's session is currently in.
///
/// `waiting` is both the initial phase and the phase every round returns
/// to; there is no terminal phase. The two association sub-phases are
/// distinct on the wire so clients can label the second clue round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Waiting,
    #[serde(rename = "associating_1")]
    Associating1,
    #[serde(rename = "associating_2")]
    Associating2,
    Voting,
    Reveal,
}

impl Phase {
    /// Whether association submissions are accepted in this phase.
    pub fn is_associating(&self) -> bool {
        matches!(self, Self::Associating1 | Self::Associating2)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Waiting => write!(f, "waiting"),
            Self::Associating1 => write!(f, "associating_1"),
            Self::Associating2 => write!(f, "associating_2"),
            Self::Voting => write!(f, "voting"),
            Self::Reveal => write!(f, "reveal"),
        }
    }
}

/// The role revealed to each player at round start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Impostor,
    Other,
}

/// Which faction won a round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Faction {
    Impostor,
    Crew,
}

// ---------------------------------------------------------------------------
// Recipient — who should receive a broadcast?
// ---------------------------------------------------------------------------

/// Delivery target for an outbound message.
///
/// Most broadcasts go to the whole room; the round-start role reveal is
/// the exception, since each player sees a different payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipient {
    /// Every player currently in the room.
    All,
    /// One specific player.
    Player(PlayerName),
}

// ---------------------------------------------------------------------------
// Inbound: client actions
// ---------------------------------------------------------------------------

/// An action sent by a client, tagged by its `action` field:
///
/// ```json
/// { "action": "player_ready", "is_ready": true }
/// { "action": "submit_association", "word": "salt" }
/// { "action": "submit_vote", "voted_for": "Alice" }
/// ```
///
/// Actions that do not apply to the current phase are silently ignored
/// by the session — there is no error reply for them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ClientAction {
    /// Toggle readiness while the room is `waiting`.
    PlayerReady { is_ready: bool },
    /// Submit a one-word clue during an association sub-phase.
    SubmitAssociation { word: String },
    /// Vote for the suspected impostor during `voting`.
    SubmitVote { voted_for: PlayerName },
}

// ---------------------------------------------------------------------------
// Outbound: server broadcasts
// ---------------------------------------------------------------------------

/// A player's entry in the lobby listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerStatus {
    pub is_ready: bool,
}

/// A message from the server, tagged by its `type` field.
///
/// Maps are `BTreeMap` so a given snapshot always serializes in the same
/// order — the client renders them directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Current roster and per-player readiness.
    UpdatePlayers {
        players: BTreeMap<PlayerName, PlayerStatus>,
    },

    /// Seconds remaining on the active countdown; `0` clears the display.
    TimerUpdate { time: u32 },

    /// Per-recipient round start. The impostor receives
    /// `role: "impostor"` and a masked word; everyone else receives the
    /// secret word.
    GameStart { round: u32, role: Role, word: String },

    /// Phase transition, with the associations visible on entry.
    StateChange {
        state: Phase,
        round: u32,
        associations: BTreeMap<PlayerName, String>,
    },

    /// Live view of who has answered during an association sub-phase.
    AssociationUpdate {
        associations: BTreeMap<PlayerName, String>,
    },

    /// Acknowledges that `voter` has cast a vote (the target stays
    /// hidden until the reveal).
    VoteUpdate { voter: PlayerName },

    /// End-of-round disclosure. `voted_out` is `null` when the vote tied
    /// or nobody voted.
    Reveal {
        voted_out: Option<PlayerName>,
        impostor: PlayerName,
        secret_word: String,
        winner: Faction,
        votes: BTreeMap<PlayerName, PlayerName>,
    },

    /// The room returned to `waiting`; `message` explains why.
    Reset { message: String },

    /// A rejected operation, e.g. joining with a duplicate name.
    Error { message: String },
}

// =========================================================================
// Tests
// =========================================================================
