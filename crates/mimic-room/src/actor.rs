//! Room actor: an isolated Tokio task that owns one game session.
//!
//! Each room runs in its own task, communicating with the outside world
//! through an mpsc channel. No shared mutable state, just message
//! passing — the session and its countdown live entirely inside the
//! task, so the actor can `select!` between inbound commands and timer
//! ticks without any locking.

use std::collections::HashMap;

use mimic_countdown::{Countdown, CountdownEvent};
use mimic_protocol::{ClientAction, PlayerName, Recipient, RoomCode, ServerMessage};
use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};

use crate::config::GameConfig;
use crate::error::RoomError;
use crate::session::{GameSession, RoundExpiry, Step, TimerOp};

/// Channel sender for delivering outbound messages to a player.
pub type PlayerSender = mpsc::UnboundedSender<ServerMessage>;

/// Default command channel size for room actors.
const DEFAULT_CHANNEL_SIZE: usize = 64;

/// Commands sent to a room actor through its channel.
///
/// The `oneshot::Sender` in some variants is a reply channel — the
/// caller sends a command and waits for the response on it.
enum RoomCommand {
    /// Add a player. Fails with [`RoomError::NameTaken`] if the name is
    /// already present, in which case room state is untouched.
    Join {
        name: PlayerName,
        sender: PlayerSender,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },

    /// Remove a player. Replies with the number of players remaining so
    /// the caller can decide whether the room should be destroyed.
    Leave {
        name: PlayerName,
        reply: oneshot::Sender<usize>,
    },

    /// Deliver a game action from a player.
    Action { name: PlayerName, action: ClientAction },
}

/// Handle to a running room actor. Used to send commands to it.
///
/// Cheap to clone — it's just an `mpsc::Sender` wrapper. The registry
/// holds one of these per room.
#[derive(Clone)]
pub struct RoomHandle {
    code: RoomCode,
    sender: mpsc::Sender<RoomCommand>,
}

impl RoomHandle {
    /// Returns the room's code.
    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    /// Whether the actor has stopped. A closed handle is dead weight in
    /// the registry and should be replaced on the next lookup.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Sends a join request to the room.
    pub async fn join(
        &self,
        name: PlayerName,
        sender: PlayerSender,
    ) -> Result<(), RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::Join {
                name,
                sender,
                reply: reply_tx,
            })
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))?
    }

    /// Sends a leave request and returns how many players remain.
    pub async fn leave(&self, name: PlayerName) -> Result<usize, RoomError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(RoomCommand::Leave {
                name,
                reply: reply_tx,
            })
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))?;
        reply_rx
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))
    }

    /// Sends a game action to the room (fire-and-forget).
    pub async fn action(
        &self,
        name: PlayerName,
        action: ClientAction,
    ) -> Result<(), RoomError> {
        self.sender
            .send(RoomCommand::Action { name, action })
            .await
            .map_err(|_| RoomError::Unavailable(self.code.clone()))
    }
}

/// The internal room actor state. Runs inside a Tokio task.
struct RoomActor {
    session: GameSession,
    code: RoomCode,
    /// Per-player outbound channels.
    senders: HashMap<PlayerName, PlayerSender>,
    countdown: Countdown<RoundExpiry>,
    receiver: mpsc::Receiver<RoomCommand>,
}

impl RoomActor {
    /// Runs the actor loop until the last player leaves or every handle
    /// is dropped.
    async fn run(mut self) {
        info!(room = %self.code, "room actor started");

        loop {
            tokio::select! {
                cmd = self.receiver.recv() => {
                    let Some(cmd) = cmd else { break };
                    if self.handle_command(cmd) {
                        break;
                    }
                }
                event = self.countdown.tick() => {
                    self.handle_countdown(event);
                }
            }
        }

        info!(room = %self.code, "room actor stopped");
    }

    /// Returns `true` when the room has emptied and the actor should
    /// stop.
    fn handle_command(&mut self, cmd: RoomCommand) -> bool {
        match cmd {
            RoomCommand::Join {
                name,
                sender,
                reply,
            } => {
                let _ = reply.send(self.handle_join(name, sender));
                false
            }
            RoomCommand::Leave { name, reply } => {
                self.handle_leave(&name);
                let remaining = self.session.player_count();
                let _ = reply.send(remaining);
                remaining == 0
            }
            RoomCommand::Action { name, action } => {
                self.handle_action(&name, action);
                false
            }
        }
    }

    fn handle_join(
        &mut self,
        name: PlayerName,
        sender: PlayerSender,
    ) -> Result<(), RoomError> {
        if self.session.contains(&name) {
            return Err(RoomError::NameTaken(name, self.code.clone()));
        }

        self.senders.insert(name.clone(), sender);
        let step = self.session.add_player(name.clone());
        info!(
            room = %self.code,
            player = %name,
            players = self.session.player_count(),
            "player joined"
        );
        self.apply(step);
        Ok(())
    }

    fn handle_leave(&mut self, name: &PlayerName) {
        if self.senders.remove(name).is_none() {
            return;
        }
        let step = self.session.remove_player(name);
        info!(
            room = %self.code,
            player = %name,
            players = self.session.player_count(),
            "player left"
        );
        self.apply(step);
    }

    fn handle_action(&mut self, name: &PlayerName, action: ClientAction) {
        if !self.session.contains(name) {
            warn!(room = %self.code, player = %name, "action from non-member, ignoring");
            return;
        }

        let step = match action {
            ClientAction::PlayerReady { is_ready } => {
                self.session.handle_ready(name, is_ready)
            }
            ClientAction::SubmitAssociation { word } => {
                self.session.handle_association(name, word)
            }
            ClientAction::SubmitVote { voted_for } => {
                self.session.handle_vote(name, voted_for)
            }
        };
        self.apply(step);
    }

    fn handle_countdown(&mut self, event: CountdownEvent<RoundExpiry>) {
        match event {
            CountdownEvent::Tick { remaining } => {
                self.broadcast(ServerMessage::TimerUpdate { time: remaining });
            }
            CountdownEvent::Expired(expiry) => {
                // The display reaches zero before the phase advances.
                self.broadcast(ServerMessage::TimerUpdate { time: 0 });
                let step = self.session.on_expiry(expiry);
                self.apply(step);
            }
        }
    }

    /// Applies one session step: fan out its messages, then its timer
    /// operation.
    fn apply(&mut self, step: Step) {
        for (recipient, msg) in step.messages {
            match recipient {
                Recipient::All => self.broadcast(msg),
                Recipient::Player(name) => self.send_to(&name, msg),
            }
        }
        match step.timer {
            TimerOp::Keep => {}
            TimerOp::Cancel => {
                self.countdown.cancel();
            }
            TimerOp::Start { secs, expiry } => {
                self.countdown.start(secs, expiry);
            }
        }
    }

    fn broadcast(&self, msg: ServerMessage) {
        for sender in self.senders.values() {
            let _ = sender.send(msg.clone());
        }
    }

    /// Sends to a single player. Silently drops if the receiver is gone
    /// (connection already closed).
    fn send_to(&self, name: &PlayerName, msg: ServerMessage) {
        if let Some(sender) = self.senders.get(name) {
            let _ = sender.send(msg);
        }
    }
}

/// Spawns a new room actor task and returns a handle to it.
pub(crate) fn spawn_room(code: RoomCode, config: GameConfig) -> RoomHandle {
    let (tx, rx) = mpsc::channel(DEFAULT_CHANNEL_SIZE);

    let actor = RoomActor {
        session: GameSession::new(code.clone(), config),
        code: code.clone(),
        senders: HashMap::new(),
        countdown: Countdown::new(),
        receiver: rx,
    };

    tokio::spawn(actor.run());

    RoomHandle { code, sender: tx }
}
