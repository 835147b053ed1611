//! The per-room game session: phases, quorum, associations, votes.
//!
//! `GameSession` is a plain synchronous state machine. Every inbound
//! event returns a [`Step`]: the broadcasts to deliver and the single
//! timer operation to apply. The room actor owns the I/O side — it
//! feeds events in (including countdown expiries) and fans the step's
//! messages out. Keeping the machine free of channels and clocks is
//! what makes the round logic unit-testable.

use std::collections::{BTreeMap, HashMap, HashSet};

use mimic_protocol::{
    Faction, Phase, PlayerName, PlayerStatus, Recipient, Role, RoomCode, ServerMessage,
};
use rand::Rng;
use tracing::debug;

use crate::config::{GameConfig, HIDDEN_WORD, MIN_PLAYERS, NO_ANSWER};

const RESET_DEFAULT: &str = "Get ready for the next round!";
const RESET_PLAYER_LEFT: &str = "A player left. The round was reset.";

/// What a countdown expiry should do. The actor starts countdowns with
/// one of these tags and hands it back to [`GameSession::on_expiry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RoundExpiry {
    /// Pre-game countdown finished: start the round.
    StartRound,
    /// An association sub-phase ran out: fill placeholders and advance.
    EndAssociation,
    /// Voting ran out: tally whatever votes arrived.
    EndVoting,
    /// Reveal finished: reset to waiting.
    EndReveal,
}

/// The timer effect of a step. At most one countdown exists per room,
/// so `Start` always means cancel-then-replace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TimerOp {
    /// Leave the countdown alone.
    Keep,
    /// Cancel the countdown if one is running.
    Cancel,
    /// Replace the countdown with a fresh one.
    Start { secs: u32, expiry: RoundExpiry },
}

/// The outcome of applying one event to the session.
pub(crate) struct Step {
    pub messages: Vec<(Recipient, ServerMessage)>,
    pub timer: TimerOp,
}

impl Step {
    fn new() -> Self {
        Self {
            messages: Vec::new(),
            timer: TimerOp::Keep,
        }
    }

    fn push(&mut self, to: Recipient, msg: ServerMessage) {
        self.messages.push((to, msg));
    }
}

/// State that only exists while a round is in flight. Discarded as a
/// unit on every reset, which is what keeps the "round-scoped maps only
/// ever contain current players" invariant trivial.
struct RoundState {
    secret_word: String,
    impostor: PlayerName,
    associations: HashMap<PlayerName, String>,
    votes: HashMap<PlayerName, PlayerName>,
}

/// One room's complete game state.
///
/// Invariants the event methods maintain:
/// - `ready` is a subset of `players`;
/// - `phase == Waiting` exactly when `round` state is absent;
/// - association/vote maps never outgrow the roster.
pub(crate) struct GameSession {
    code: RoomCode,
    config: GameConfig,
    /// Insertion-ordered, unique. Rooms are small; linear scans are fine.
    players: Vec<PlayerName>,
    ready: HashSet<PlayerName>,
    phase: Phase,
    round: u32,
    round_state: Option<RoundState>,
}

impl GameSession {
    pub(crate) fn new(code: RoomCode, config: GameConfig) -> Self {
        Self {
            code,
            config,
            players: Vec::new(),
            ready: HashSet::new(),
            phase: Phase::Waiting,
            round: 0,
            round_state: None,
        }
    }

    pub(crate) fn contains(&self, name: &PlayerName) -> bool {
        self.players.contains(name)
    }

    pub(crate) fn player_count(&self) -> usize {
        self.players.len()
    }

    #[cfg(test)]
    pub(crate) fn phase(&self) -> Phase {
        self.phase
    }

    #[cfg(test)]
    pub(crate) fn round(&self) -> u32 {
        self.round
    }

    // -----------------------------------------------------------------
    // Roster events
    // -----------------------------------------------------------------

    /// Adds a player. The caller must have rejected duplicates already.
    ///
    /// In `waiting` the quorum is re-checked: the newcomer is not ready,
    /// so a running pre-game countdown is called off.
    pub(crate) fn add_player(&mut self, name: PlayerName) -> Step {
        debug_assert!(!self.contains(&name));
        let mut step = Step::new();
        self.players.push(name);
        step.push(Recipient::All, self.player_list_message());
        if self.phase == Phase::Waiting {
            self.check_quorum(&mut step);
        }
        step
    }

    /// Removes a player. Mid-round this aborts the round; in `waiting`
    /// it re-runs the quorum check, since the leaver may have been the
    /// only one holding the countdown back.
    pub(crate) fn remove_player(&mut self, name: &PlayerName) -> Step {
        let mut step = Step::new();
        self.players.retain(|p| p != name);
        self.ready.remove(name);

        if self.phase != Phase::Waiting {
            self.reset_round(RESET_PLAYER_LEFT, &mut step);
        } else {
            step.push(Recipient::All, self.player_list_message());
            self.check_quorum(&mut step);
        }
        step
    }

    // -----------------------------------------------------------------
    // Waiting: readiness and quorum
    // -----------------------------------------------------------------

    /// A ready toggle. Only meaningful in `waiting`; ignored otherwise.
    pub(crate) fn handle_ready(&mut self, name: &PlayerName, is_ready: bool) -> Step {
        let mut step = Step::new();
        if self.phase != Phase::Waiting || !self.contains(name) {
            return step;
        }

        if is_ready {
            self.ready.insert(name.clone());
        } else {
            self.ready.remove(name);
        }

        step.push(Recipient::All, self.player_list_message());
        self.check_quorum(&mut step);
        step
    }

    /// Starts the pre-game countdown when everyone is ready (and there
    /// are enough players), otherwise cancels it and clears the timer
    /// display. Always cancel-then-replace: a toggle while the countdown
    /// runs restarts it from the full duration.
    fn check_quorum(&mut self, step: &mut Step) {
        if self.players.len() >= MIN_PLAYERS && self.ready.len() == self.players.len() {
            step.timer = TimerOp::Start {
                secs: self.config.timers.pre_game,
                expiry: RoundExpiry::StartRound,
            };
        } else {
            step.timer = TimerOp::Cancel;
            step.push(Recipient::All, ServerMessage::TimerUpdate { time: 0 });
        }
    }

    // -----------------------------------------------------------------
    // Round start
    // -----------------------------------------------------------------

    fn start_round(&mut self, step: &mut Step) {
        debug_assert!(!self.players.is_empty());
        self.round += 1;

        let mut rng = rand::rng();
        let secret_word = self.config.words[rng.random_range(0..self.config.words.len())].clone();
        let impostor = self.players[rng.random_range(0..self.players.len())].clone();
        debug!(room = %self.code, round = self.round, %impostor, "round started");

        for name in &self.players {
            let (role, word) = if *name == impostor {
                (Role::Impostor, HIDDEN_WORD.to_string())
            } else {
                (Role::Other, secret_word.clone())
            };
            step.push(
                Recipient::Player(name.clone()),
                ServerMessage::GameStart {
                    round: self.round,
                    role,
                    word,
                },
            );
        }

        self.round_state = Some(RoundState {
            secret_word,
            impostor,
            associations: HashMap::new(),
            votes: HashMap::new(),
        });
        self.begin_association_phase(Phase::Associating1, step);
    }

    // -----------------------------------------------------------------
    // Association sub-phases
    // -----------------------------------------------------------------

    fn begin_association_phase(&mut self, phase: Phase, step: &mut Step) {
        debug_assert!(phase.is_associating());
        self.phase = phase;
        if let Some(rs) = self.round_state.as_mut() {
            rs.associations.clear();
        }
        step.push(
            Recipient::All,
            ServerMessage::StateChange {
                state: self.phase,
                round: self.round,
                associations: self.association_snapshot(),
            },
        );
        step.timer = TimerOp::Start {
            secs: self.config.timers.association,
            expiry: RoundExpiry::EndAssociation,
        };
    }

    /// One association per player per sub-phase; repeats are ignored.
    /// The sub-phase ends early once everyone has answered.
    pub(crate) fn handle_association(&mut self, name: &PlayerName, word: String) -> Step {
        let mut step = Step::new();
        if !self.phase.is_associating() {
            return step;
        }
        let Some(rs) = self.round_state.as_mut() else {
            return step;
        };
        if rs.associations.contains_key(name) {
            return step;
        }

        rs.associations.insert(name.clone(), word);
        step.push(
            Recipient::All,
            ServerMessage::AssociationUpdate {
                associations: self.association_snapshot(),
            },
        );

        if self.all_answered() {
            step.timer = TimerOp::Cancel;
            self.finish_association_phase(&mut step);
        }
        step
    }

    fn all_answered(&self) -> bool {
        self.round_state
            .as_ref()
            .is_some_and(|rs| rs.associations.len() == self.players.len())
    }

    fn finish_association_phase(&mut self, step: &mut Step) {
        match self.phase {
            Phase::Associating1 => self.begin_association_phase(Phase::Associating2, step),
            Phase::Associating2 => self.begin_voting(step),
            _ => {}
        }
    }

    // -----------------------------------------------------------------
    // Voting
    // -----------------------------------------------------------------

    fn begin_voting(&mut self, step: &mut Step) {
        self.phase = Phase::Voting;
        if let Some(rs) = self.round_state.as_mut() {
            rs.votes.clear();
        }
        step.push(
            Recipient::All,
            ServerMessage::StateChange {
                state: self.phase,
                round: self.round,
                associations: self.association_snapshot(),
            },
        );
        step.timer = TimerOp::Start {
            secs: self.config.timers.voting,
            expiry: RoundExpiry::EndVoting,
        };
    }

    /// One vote per player, first vote counts. Tally runs as soon as
    /// every player has voted; otherwise the voting timer forces it.
    pub(crate) fn handle_vote(&mut self, voter: &PlayerName, voted_for: PlayerName) -> Step {
        let mut step = Step::new();
        if self.phase != Phase::Voting {
            return step;
        }
        let Some(rs) = self.round_state.as_mut() else {
            return step;
        };
        if rs.votes.contains_key(voter) {
            return step;
        }

        rs.votes.insert(voter.clone(), voted_for);
        let all_voted = rs.votes.len() == self.players.len();
        step.push(
            Recipient::All,
            ServerMessage::VoteUpdate {
                voter: voter.clone(),
            },
        );

        if all_voted {
            step.timer = TimerOp::Cancel;
            self.tally(&mut step);
        }
        step
    }

    fn tally(&mut self, step: &mut Step) {
        self.phase = Phase::Reveal;
        let Some(rs) = self.round_state.as_ref() else {
            return;
        };

        let (voted_out, winner) = tally_votes(&rs.votes, &rs.impostor);
        debug!(
            room = %self.code,
            round = self.round,
            voted_out = ?voted_out,
            ?winner,
            "round tallied"
        );

        step.push(
            Recipient::All,
            ServerMessage::Reveal {
                voted_out,
                impostor: rs.impostor.clone(),
                secret_word: rs.secret_word.clone(),
                winner,
                votes: rs.votes.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            },
        );
        step.timer = TimerOp::Start {
            secs: self.config.timers.reveal,
            expiry: RoundExpiry::EndReveal,
        };
    }

    // -----------------------------------------------------------------
    // Reset and timer expiries
    // -----------------------------------------------------------------

    /// Back to `waiting`: round state and readiness are discarded, and
    /// the countdown is cancelled so nothing stale can fire afterwards.
    fn reset_round(&mut self, message: &str, step: &mut Step) {
        self.phase = Phase::Waiting;
        self.ready.clear();
        self.round_state = None;
        step.timer = TimerOp::Cancel;
        step.push(
            Recipient::All,
            ServerMessage::Reset {
                message: message.to_string(),
            },
        );
        step.push(Recipient::All, self.player_list_message());
    }

    /// The continuation side of the countdown: exactly one of these runs
    /// when a countdown reaches zero.
    pub(crate) fn on_expiry(&mut self, expiry: RoundExpiry) -> Step {
        let mut step = Step::new();
        match expiry {
            RoundExpiry::StartRound => {
                if self.phase == Phase::Waiting {
                    self.start_round(&mut step);
                }
            }
            RoundExpiry::EndAssociation => {
                if self.phase.is_associating() {
                    self.fill_missing_associations();
                    self.finish_association_phase(&mut step);
                }
            }
            RoundExpiry::EndVoting => {
                if self.phase == Phase::Voting {
                    self.tally(&mut step);
                }
            }
            RoundExpiry::EndReveal => {
                if self.phase == Phase::Reveal {
                    self.reset_round(RESET_DEFAULT, &mut step);
                }
            }
        }
        step
    }

    /// A silent player never stalls the round: on timeout everyone who
    /// has not answered gets the placeholder.
    fn fill_missing_associations(&mut self) {
        let Some(rs) = self.round_state.as_mut() else {
            return;
        };
        for name in &self.players {
            rs.associations
                .entry(name.clone())
                .or_insert_with(|| NO_ANSWER.to_string());
        }
    }

    // -----------------------------------------------------------------
    // Snapshots
    // -----------------------------------------------------------------

    fn player_list_message(&self) -> ServerMessage {
        let players: BTreeMap<PlayerName, PlayerStatus> = self
            .players
            .iter()
            .map(|name| {
                (
                    name.clone(),
                    PlayerStatus {
                        is_ready: self.ready.contains(name),
                    },
                )
            })
            .collect();
        ServerMessage::UpdatePlayers { players }
    }

    fn association_snapshot(&self) -> BTreeMap<PlayerName, String> {
        self.round_state
            .as_ref()
            .map(|rs| {
                rs.associations
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Counts votes per target. A unique maximum votes that player out and
/// the crew wins only if it was the impostor; a tie or an empty ballot
/// is a no-decision and the impostor wins by default.
pub(crate) fn tally_votes(
    votes: &HashMap<PlayerName, PlayerName>,
    impostor: &PlayerName,
) -> (Option<PlayerName>, Faction) {
    let mut counts: HashMap<&PlayerName, usize> = HashMap::new();
    for target in votes.values() {
        *counts.entry(target).or_insert(0) += 1;
    }

    let voted_out = counts.values().copied().max().and_then(|max| {
        let mut at_max = counts
            .iter()
            .filter(|(_, count)| **count == max)
            .map(|(name, _)| (*name).clone());
        let first = at_max.next();
        match at_max.next() {
            Some(_) => None, // tie
            None => first,
        }
    });

    let winner = match &voted_out {
        Some(name) if name == impostor => Faction::Crew,
        _ => Faction::Impostor,
    };
    (voted_out, winner)
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Timers;

    fn name(s: &str) -> PlayerName {
        PlayerName::new(s)
    }

    /// One-word list makes the secret word deterministic; the impostor
    /// pick stays random, so tests read it back out of the broadcasts.
    fn session_with(names: &[&str]) -> GameSession {
        let config = GameConfig::new(Timers::default(), vec!["APPLE".into()]);
        let mut s = GameSession::new(RoomCode::new("TEST"), config);
        for n in names {
            s.add_player(name(n));
        }
        s
    }

    fn ready_all(s: &mut GameSession, names: &[&str]) -> Step {
        let mut last = Step::new();
        for n in names {
            last = s.handle_ready(&name(n), true);
        }
        last
    }

    /// Drives a fresh session into `associating_1` and returns the
    /// impostor's name as announced in the role reveals.
    fn start_round(s: &mut GameSession, names: &[&str]) -> PlayerName {
        ready_all(s, names);
        let step = s.on_expiry(RoundExpiry::StartRound);
        impostor_of(&step)
    }

    fn impostor_of(step: &Step) -> PlayerName {
        step.messages
            .iter()
            .find_map(|(to, msg)| match (to, msg) {
                (
                    Recipient::Player(name),
                    ServerMessage::GameStart {
                        role: Role::Impostor,
                        ..
                    },
                ) => Some(name.clone()),
                _ => None,
            })
            .expect("round start should announce an impostor")
    }

    fn has_timer_zero(step: &Step) -> bool {
        step.messages
            .iter()
            .any(|(_, m)| matches!(m, ServerMessage::TimerUpdate { time: 0 }))
    }

    // =====================================================================
    // Quorum
    // =====================================================================

    #[test]
    fn test_quorum_needs_three_players() {
        let mut s = session_with(&["A", "B"]);
        let step = ready_all(&mut s, &["A", "B"]);
        assert_eq!(step.timer, TimerOp::Cancel);
        assert!(has_timer_zero(&step));
    }

    #[test]
    fn test_quorum_needs_everyone_ready() {
        let mut s = session_with(&["A", "B", "C"]);
        let step = ready_all(&mut s, &["A", "B"]);
        assert_eq!(step.timer, TimerOp::Cancel);
    }

    #[test]
    fn test_quorum_starts_pre_game_countdown() {
        let mut s = session_with(&["A", "B", "C"]);
        let step = ready_all(&mut s, &["A", "B", "C"]);
        assert_eq!(
            step.timer,
            TimerOp::Start {
                secs: 5,
                expiry: RoundExpiry::StartRound
            }
        );
    }

    #[test]
    fn test_unready_cancels_countdown_and_clears_display() {
        let mut s = session_with(&["A", "B", "C"]);
        ready_all(&mut s, &["A", "B", "C"]);

        let step = s.handle_ready(&name("B"), false);
        assert_eq!(step.timer, TimerOp::Cancel);
        assert!(has_timer_zero(&step));
    }

    #[test]
    fn test_re_ready_restarts_countdown() {
        let mut s = session_with(&["A", "B", "C"]);
        ready_all(&mut s, &["A", "B", "C"]);

        // A redundant ready toggle while counting restarts from the top.
        let step = s.handle_ready(&name("A"), true);
        assert_eq!(
            step.timer,
            TimerOp::Start {
                secs: 5,
                expiry: RoundExpiry::StartRound
            }
        );
    }

    #[test]
    fn test_ready_ignored_outside_waiting() {
        let mut s = session_with(&["A", "B", "C"]);
        start_round(&mut s, &["A", "B", "C"]);

        let step = s.handle_ready(&name("A"), false);
        assert!(step.messages.is_empty());
        assert_eq!(step.timer, TimerOp::Keep);
    }

    #[test]
    fn test_ready_from_unknown_player_ignored() {
        let mut s = session_with(&["A", "B", "C"]);
        let step = s.handle_ready(&name("Mallory"), true);
        assert!(step.messages.is_empty());
    }

    #[test]
    fn test_leaver_can_complete_quorum() {
        let mut s = session_with(&["A", "B", "C", "D"]);
        // D never readies, so the countdown is held back.
        let step = ready_all(&mut s, &["A", "B", "C"]);
        assert_eq!(step.timer, TimerOp::Cancel);

        // D leaving satisfies the quorum: 3 players, all ready.
        let step = s.remove_player(&name("D"));
        assert_eq!(
            step.timer,
            TimerOp::Start {
                secs: 5,
                expiry: RoundExpiry::StartRound
            }
        );
    }

    #[test]
    fn test_joiner_cancels_pre_game_countdown() {
        let mut s = session_with(&["A", "B", "C"]);
        ready_all(&mut s, &["A", "B", "C"]);

        // The newcomer is not ready, so the countdown must stop.
        let step = s.add_player(name("D"));
        assert_eq!(step.timer, TimerOp::Cancel);
        assert!(has_timer_zero(&step));
    }

    // =====================================================================
    // Round start
    // =====================================================================

    #[test]
    fn test_round_start_reveals_roles_per_player() {
        let mut s = session_with(&["A", "B", "C"]);
        ready_all(&mut s, &["A", "B", "C"]);
        let step = s.on_expiry(RoundExpiry::StartRound);

        assert_eq!(s.phase(), Phase::Associating1);
        assert_eq!(s.round(), 1);

        let starts: Vec<_> = step
            .messages
            .iter()
            .filter_map(|(to, msg)| match msg {
                ServerMessage::GameStart { role, word, round } => Some((to, *role, word, *round)),
                _ => None,
            })
            .collect();
        assert_eq!(starts.len(), 3, "one role reveal per player");

        let impostors: Vec<_> = starts
            .iter()
            .filter(|(_, role, _, _)| *role == Role::Impostor)
            .collect();
        assert_eq!(impostors.len(), 1, "exactly one impostor per round");
        assert_eq!(impostors[0].2, HIDDEN_WORD);

        for (to, role, word, round) in &starts {
            assert!(matches!(to, Recipient::Player(_)), "role reveals are private");
            assert_eq!(*round, 1);
            if *role == Role::Other {
                assert_eq!(*word, "APPLE");
            }
        }

        // Entering associating_1 announces an empty association map and
        // arms the association timer.
        assert!(step.messages.iter().any(|(_, m)| matches!(
            m,
            ServerMessage::StateChange {
                state: Phase::Associating1,
                round: 1,
                associations,
            } if associations.is_empty()
        )));
        assert_eq!(
            step.timer,
            TimerOp::Start {
                secs: 30,
                expiry: RoundExpiry::EndAssociation
            }
        );
    }

    #[test]
    fn test_round_number_increments_once_per_start() {
        let mut s = session_with(&["A", "B", "C"]);
        start_round(&mut s, &["A", "B", "C"]);
        assert_eq!(s.round(), 1);

        // A mid-round abort must not touch the counter.
        s.remove_player(&name("C"));
        assert_eq!(s.round(), 1);

        s.add_player(name("C"));
        start_round(&mut s, &["A", "B", "C"]);
        assert_eq!(s.round(), 2);
    }

    #[test]
    fn test_stale_start_expiry_outside_waiting_is_ignored() {
        let mut s = session_with(&["A", "B", "C"]);
        start_round(&mut s, &["A", "B", "C"]);

        let step = s.on_expiry(RoundExpiry::StartRound);
        assert!(step.messages.is_empty());
        assert_eq!(s.round(), 1);
    }

    // =====================================================================
    // Associations
    // =====================================================================

    #[test]
    fn test_association_rejected_outside_association_phases() {
        let mut s = session_with(&["A", "B", "C"]);
        let step = s.handle_association(&name("A"), "salt".into());
        assert!(step.messages.is_empty());
    }

    #[test]
    fn test_second_association_from_same_player_ignored() {
        let mut s = session_with(&["A", "B", "C"]);
        start_round(&mut s, &["A", "B", "C"]);

        let first = s.handle_association(&name("A"), "salt".into());
        assert_eq!(first.messages.len(), 1);

        let second = s.handle_association(&name("A"), "pepper".into());
        assert!(second.messages.is_empty(), "first submission wins");

        // The stored word is still the first one.
        let step = s.handle_association(&name("B"), "sea".into());
        match &step.messages[0].1 {
            ServerMessage::AssociationUpdate { associations } => {
                assert_eq!(associations[&name("A")], "salt");
            }
            other => panic!("expected association_update, got {other:?}"),
        }
    }

    #[test]
    fn test_all_answered_advances_without_timeout() {
        let mut s = session_with(&["A", "B", "C"]);
        start_round(&mut s, &["A", "B", "C"]);

        s.handle_association(&name("A"), "salt".into());
        s.handle_association(&name("B"), "sea".into());
        let step = s.handle_association(&name("C"), "wave".into());

        assert_eq!(s.phase(), Phase::Associating2);
        // The second sub-phase starts with a cleared map and a fresh timer.
        assert!(step.messages.iter().any(|(_, m)| matches!(
            m,
            ServerMessage::StateChange {
                state: Phase::Associating2,
                associations,
                ..
            } if associations.is_empty()
        )));
        assert_eq!(
            step.timer,
            TimerOp::Start {
                secs: 30,
                expiry: RoundExpiry::EndAssociation
            }
        );
    }

    #[test]
    fn test_timeout_fills_placeholders_for_silent_players() {
        let mut s = session_with(&["A", "B", "C"]);
        start_round(&mut s, &["A", "B", "C"]);
        s.on_expiry(RoundExpiry::EndAssociation); // nobody answered round 1

        // Second sub-phase: only A answers before the timer runs out.
        s.handle_association(&name("A"), "salt".into());
        let step = s.on_expiry(RoundExpiry::EndAssociation);

        assert_eq!(s.phase(), Phase::Voting);
        let assoc = step
            .messages
            .iter()
            .find_map(|(_, m)| match m {
                ServerMessage::StateChange {
                    state: Phase::Voting,
                    associations,
                    ..
                } => Some(associations.clone()),
                _ => None,
            })
            .expect("voting state_change");
        assert_eq!(assoc[&name("A")], "salt");
        assert_eq!(assoc[&name("B")], NO_ANSWER);
        assert_eq!(assoc[&name("C")], NO_ANSWER);
        assert_eq!(
            step.timer,
            TimerOp::Start {
                secs: 25,
                expiry: RoundExpiry::EndVoting
            }
        );
    }

    // =====================================================================
    // Voting and tally
    // =====================================================================

    fn drive_to_voting(s: &mut GameSession, names: &[&str]) -> PlayerName {
        let impostor = start_round(s, names);
        s.on_expiry(RoundExpiry::EndAssociation);
        s.on_expiry(RoundExpiry::EndAssociation);
        assert_eq!(s.phase(), Phase::Voting);
        impostor
    }

    #[test]
    fn test_vote_rejected_outside_voting() {
        let mut s = session_with(&["A", "B", "C"]);
        start_round(&mut s, &["A", "B", "C"]);
        let step = s.handle_vote(&name("A"), name("B"));
        assert!(step.messages.is_empty());
    }

    #[test]
    fn test_second_vote_ignored() {
        let mut s = session_with(&["A", "B", "C"]);
        drive_to_voting(&mut s, &["A", "B", "C"]);

        assert_eq!(s.handle_vote(&name("A"), name("B")).messages.len(), 1);
        assert!(s.handle_vote(&name("A"), name("C")).messages.is_empty());
    }

    #[test]
    fn test_vote_update_names_voter_not_target() {
        let mut s = session_with(&["A", "B", "C"]);
        drive_to_voting(&mut s, &["A", "B", "C"]);

        let step = s.handle_vote(&name("A"), name("B"));
        assert!(matches!(
            &step.messages[0].1,
            ServerMessage::VoteUpdate { voter } if *voter == name("A")
        ));
    }

    #[test]
    fn test_all_voted_reveals_without_timeout() {
        let mut s = session_with(&["A", "B", "C"]);
        let impostor = drive_to_voting(&mut s, &["A", "B", "C"]);

        s.handle_vote(&name("A"), name("B"));
        s.handle_vote(&name("B"), name("B"));
        let step = s.handle_vote(&name("C"), name("B"));

        assert_eq!(s.phase(), Phase::Reveal);
        let reveal = step
            .messages
            .iter()
            .find_map(|(_, m)| match m {
                ServerMessage::Reveal {
                    voted_out, winner, ..
                } => Some((voted_out.clone(), *winner)),
                _ => None,
            })
            .expect("reveal broadcast");
        // B can't vote for themselves in a real client, but the tally
        // doesn't care: unique max wins.
        assert_eq!(reveal.0, Some(name("B")));
        let expected = if impostor == name("B") {
            Faction::Crew
        } else {
            Faction::Impostor
        };
        assert_eq!(reveal.1, expected);
        assert_eq!(
            step.timer,
            TimerOp::Start {
                secs: 15,
                expiry: RoundExpiry::EndReveal
            }
        );
    }

    #[test]
    fn test_voting_timeout_tallies_partial_ballot() {
        let mut s = session_with(&["A", "B", "C"]);
        drive_to_voting(&mut s, &["A", "B", "C"]);

        // Nobody votes; the timer forces a no-decision reveal.
        let step = s.on_expiry(RoundExpiry::EndVoting);
        assert_eq!(s.phase(), Phase::Reveal);
        assert!(step.messages.iter().any(|(_, m)| matches!(
            m,
            ServerMessage::Reveal {
                voted_out: None,
                winner: Faction::Impostor,
                ..
            }
        )));
    }

    // =====================================================================
    // tally_votes
    // =====================================================================

    fn ballot(entries: &[(&str, &str)]) -> HashMap<PlayerName, PlayerName> {
        entries
            .iter()
            .map(|(v, t)| (name(v), name(t)))
            .collect()
    }

    #[test]
    fn test_tally_unique_max_votes_out_impostor() {
        let votes = ballot(&[("A", "B"), ("C", "B"), ("D", "E")]);
        let (voted_out, winner) = tally_votes(&votes, &name("B"));
        assert_eq!(voted_out, Some(name("B")));
        assert_eq!(winner, Faction::Crew);
    }

    #[test]
    fn test_tally_unique_max_misses_impostor() {
        let votes = ballot(&[("A", "B"), ("C", "B"), ("D", "E")]);
        let (voted_out, winner) = tally_votes(&votes, &name("E"));
        assert_eq!(voted_out, Some(name("B")));
        assert_eq!(winner, Faction::Impostor);
    }

    #[test]
    fn test_tally_tie_is_no_decision() {
        let votes = ballot(&[("A", "B"), ("C", "E")]);
        let (voted_out, winner) = tally_votes(&votes, &name("B"));
        assert_eq!(voted_out, None);
        assert_eq!(winner, Faction::Impostor);
    }

    #[test]
    fn test_tally_empty_ballot_is_no_decision() {
        let votes = HashMap::new();
        let (voted_out, winner) = tally_votes(&votes, &name("B"));
        assert_eq!(voted_out, None);
        assert_eq!(winner, Faction::Impostor);
    }

    // =====================================================================
    // Resets
    // =====================================================================

    #[test]
    fn test_disconnect_mid_round_resets_to_waiting() {
        let mut s = session_with(&["A", "B", "C"]);
        drive_to_voting(&mut s, &["A", "B", "C"]);

        let step = s.remove_player(&name("C"));
        assert_eq!(s.phase(), Phase::Waiting);
        assert_eq!(step.timer, TimerOp::Cancel);
        assert!(step.messages.iter().any(|(_, m)| matches!(
            m,
            ServerMessage::Reset { message } if message.contains("left")
        )));

        // Round-scoped state is gone; late actions are ignored.
        assert!(s.handle_vote(&name("A"), name("B")).messages.is_empty());
        assert!(
            s.handle_association(&name("A"), "salt".into())
                .messages
                .is_empty()
        );
    }

    #[test]
    fn test_disconnect_clears_readiness() {
        let mut s = session_with(&["A", "B", "C"]);
        start_round(&mut s, &["A", "B", "C"]);
        s.remove_player(&name("C"));

        // A fresh quorum is required: two readies alone do nothing.
        s.add_player(name("C"));
        let step = ready_all(&mut s, &["A", "B"]);
        assert_eq!(step.timer, TimerOp::Cancel);
        let step = s.handle_ready(&name("C"), true);
        assert!(matches!(step.timer, TimerOp::Start { .. }));
    }

    #[test]
    fn test_reveal_expiry_resets_with_default_message() {
        let mut s = session_with(&["A", "B", "C"]);
        drive_to_voting(&mut s, &["A", "B", "C"]);
        s.on_expiry(RoundExpiry::EndVoting);
        assert_eq!(s.phase(), Phase::Reveal);

        let step = s.on_expiry(RoundExpiry::EndReveal);
        assert_eq!(s.phase(), Phase::Waiting);
        assert!(step.messages.iter().any(|(_, m)| matches!(
            m,
            ServerMessage::Reset { message } if message == RESET_DEFAULT
        )));
    }
}
