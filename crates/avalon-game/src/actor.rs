//! Session actor: an isolated Tokio task that owns one [`GameSession`].
//!
//! Commands arrive over a bounded mpsc channel and are applied one at a
//! time, so each session is its own critical section. Sessions never
//! share a lock with each other.
//!
//! A command that leaves the session without players stops the actor in
//! that same critical section. Anything queued behind it, such as a join
//! that raced the last leave, gets [`GameError::Unavailable`].

use avalon_protocol::{ConnectionHandle, GameId};
use tokio::sync::{mpsc, oneshot};

use crate::{Action, GameError, GameEvent, GameSession, GameSnapshot, PlayerView};

/// The result of a successfully applied command, captured inside the
/// same critical section as the command itself.
#[derive(Debug, Clone)]
pub struct Applied {
    /// What changed, in order. Empty when nothing did.
    pub events: Vec<GameEvent>,
    /// Public state after the command.
    pub snapshot: GameSnapshot,
    /// Seated connections after the command, for fan-out.
    pub members: Vec<ConnectionHandle>,
    /// The session emptied and its actor has stopped. Later commands on
    /// any handle to it fail with [`GameError::Unavailable`].
    pub closed: bool,
}

/// Commands sent to a session actor. Most carry a `oneshot` reply channel.
pub(crate) enum SessionCommand {
    Apply {
        caller: ConnectionHandle,
        action: Action,
        reply: oneshot::Sender<Result<Applied, GameError>>,
    },

    Snapshot {
        reply: oneshot::Sender<GameSnapshot>,
    },

    View {
        viewer: ConnectionHandle,
        reply: oneshot::Sender<Result<PlayerView, GameError>>,
    },

    Shutdown,
}

/// Handle to a running session actor.
///
/// Cheap to clone; the registry hands out clones so callers never hold
/// the registry lock while talking to a session.
#[derive(Clone)]
pub struct SessionHandle {
    game_id: GameId,
    sender: mpsc::Sender<SessionCommand>,
}

impl SessionHandle {
    pub fn game_id(&self) -> GameId {
        self.game_id
    }

    /// Applies `action` as `caller` and returns the resulting events and
    /// state.
    pub async fn apply(
        &self,
        caller: ConnectionHandle,
        action: Action,
    ) -> Result<Applied, GameError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(SessionCommand::Apply {
                caller,
                action,
                reply: reply_tx,
            })
            .await
            .map_err(|_| GameError::Unavailable(self.game_id))?;
        reply_rx
            .await
            .map_err(|_| GameError::Unavailable(self.game_id))?
    }

    /// Requests the public state.
    pub async fn snapshot(&self) -> Result<GameSnapshot, GameError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(SessionCommand::Snapshot { reply: reply_tx })
            .await
            .map_err(|_| GameError::Unavailable(self.game_id))?;
        reply_rx
            .await
            .map_err(|_| GameError::Unavailable(self.game_id))
    }

    /// Requests one player's private view.
    pub async fn view_for(&self, viewer: ConnectionHandle) -> Result<PlayerView, GameError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(SessionCommand::View {
                viewer,
                reply: reply_tx,
            })
            .await
            .map_err(|_| GameError::Unavailable(self.game_id))?;
        reply_rx
            .await
            .map_err(|_| GameError::Unavailable(self.game_id))?
    }

    /// Tells the actor to stop. Later calls on any clone of this handle
    /// return [`GameError::Unavailable`].
    pub async fn shutdown(&self) -> Result<(), GameError> {
        self.sender
            .send(SessionCommand::Shutdown)
            .await
            .map_err(|_| GameError::Unavailable(self.game_id))
    }
}

struct SessionActor {
    session: GameSession,
    receiver: mpsc::Receiver<SessionCommand>,
}

impl SessionActor {
    async fn run(mut self) {
        let game_id = self.session.id();
        tracing::info!(%game_id, "session actor started");

        while let Some(cmd) = self.receiver.recv().await {
            match cmd {
                SessionCommand::Apply {
                    caller,
                    action,
                    reply,
                } => {
                    let result = self.handle_apply(&caller, action);
                    let closed = matches!(&result, Ok(applied) if applied.closed);
                    let _ = reply.send(result);
                    if closed {
                        tracing::info!(%game_id, "last player left, closing session");
                        break;
                    }
                }
                SessionCommand::Snapshot { reply } => {
                    let _ = reply.send(self.session.snapshot());
                }
                SessionCommand::View { viewer, reply } => {
                    let _ = reply.send(self.session.view_for(&viewer));
                }
                SessionCommand::Shutdown => {
                    tracing::info!(%game_id, "session shutting down");
                    break;
                }
            }
        }

        tracing::info!(%game_id, "session actor stopped");
    }

    fn handle_apply(
        &mut self,
        caller: &ConnectionHandle,
        action: Action,
    ) -> Result<Applied, GameError> {
        let events = self.session.apply(caller, action)?;
        Ok(Applied {
            events,
            snapshot: self.session.snapshot(),
            members: self.session.members().to_vec(),
            closed: self.session.is_empty(),
        })
    }
}

/// Spawns an actor task for `session` and returns a handle to it.
///
/// `channel_size` bounds the command queue; senders wait when it is full.
pub(crate) fn spawn_session(session: GameSession, channel_size: usize) -> SessionHandle {
    let (tx, rx) = mpsc::channel(channel_size);
    let game_id = session.id();

    let actor = SessionActor {
        session,
        receiver: rx,
    };
    tokio::spawn(actor.run());

    SessionHandle { game_id, sender: tx }
}
