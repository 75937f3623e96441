//! Command dispatch: turns client commands into session calls and
//! session results into outbound frames.
//!
//! The flow for one inbound frame is:
//!   1. Decode a [`ClientCommand`]; a bad frame earns the caller an error.
//!   2. Resolve the game through the registry (lock held only for lookup).
//!   3. Apply the command on the session actor.
//!   4. Encode the resulting state for the game's group, plus any private
//!      role reveals and the caller's own replies.

use avalon_game::{Action, GameError, GameEvent, GameSnapshot, PlayerView};
use avalon_protocol::{
    ClientCommand, Codec, ConnectionHandle, GameId, ProtocolError, Recipient, ServerMessage,
};
use serde::{Deserialize, Serialize};

use crate::{AvalonError, GameServer};

/// A change to which connections belong to a game's broadcast group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Membership {
    Joined(ConnectionHandle),
    Left(ConnectionHandle),
}

/// The outcome of one dispatched command.
#[derive(Debug, Clone)]
pub struct Dispatch {
    pub game_id: GameId,
    /// What changed, in order. Empty when nothing did.
    pub events: Vec<GameEvent>,
    /// Public state right after the command.
    pub snapshot: GameSnapshot,
    /// Seated connections right after the command.
    pub members: Vec<ConnectionHandle>,
    /// Set when the caller entered or left the game's group.
    pub membership: Option<Membership>,
    /// The session was emptied and removed from the registry.
    pub closed: bool,
}

/// Payload of [`ServerMessage::State`], encoded with the server's codec.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum StateUpdate {
    /// Sent to the whole game after each accepted command.
    Public {
        events: Vec<GameEvent>,
        snapshot: GameSnapshot,
    },
    /// Sent to one player when roles are dealt.
    Private { view: PlayerView },
}

/// Frames produced for one inbound frame.
#[derive(Debug, Default)]
pub struct Reply {
    pub outbound: Vec<(Recipient, Vec<u8>)>,
    /// Group change for the transport to apply before fanning out.
    pub membership: Option<(GameId, Membership)>,
}

impl<C: Codec> GameServer<C> {
    /// Runs one command for `caller`.
    ///
    /// # Errors
    /// Any [`GameError`] the session or registry raises. A failed command
    /// has changed nothing. A game that closes while the command waits in
    /// its queue is reported as [`GameError::GameNotFound`].
    pub async fn dispatch(
        &self,
        caller: &ConnectionHandle,
        command: ClientCommand,
    ) -> Result<Dispatch, AvalonError> {
        let (game_id, action) = match command {
            ClientCommand::CreateGame { username } => {
                return self.create_game(caller, username).await;
            }
            ClientCommand::JoinGame { game_id, username } => {
                (game_id, Action::Join { name: username })
            }
            ClientCommand::LeaveGame { game_id } => (game_id, Action::Leave),
            ClientCommand::StartGame { game_id } => (game_id, Action::Start),
            ClientCommand::ToggleTeam { game_id, username } => {
                (game_id, Action::ToggleTeam { name: username })
            }
            ClientCommand::ConfirmTeam { game_id } => (game_id, Action::ConfirmTeam),
            ClientCommand::ApproveTeam { game_id, approve } => {
                (game_id, Action::ApproveTeam { approve })
            }
            ClientCommand::SubmitQuestOutcome { game_id, success } => {
                (game_id, Action::SubmitQuestOutcome { success })
            }
            ClientCommand::RevealNextQuestResult { game_id } => {
                (game_id, Action::RevealNextQuestResult)
            }
        };

        let membership = match &action {
            Action::Join { .. } => Some(Membership::Joined(caller.clone())),
            Action::Leave => Some(Membership::Left(caller.clone())),
            _ => None,
        };

        let session = self.registry.lock().await.get(game_id)?;
        let applied = session
            .apply(caller.clone(), action)
            .await
            .map_err(|e| match e {
                // The session closed while this command was queued.
                GameError::Unavailable(id) => GameError::GameNotFound(id),
                e => e,
            })?;

        let closed = applied.closed;
        if closed {
            // The actor already stopped itself; only the registry entry is left.
            let _ = self.registry.lock().await.remove(game_id);
        }

        Ok(Dispatch {
            game_id,
            events: applied.events,
            snapshot: applied.snapshot,
            members: applied.members,
            membership,
            closed,
        })
    }

    async fn create_game(
        &self,
        caller: &ConnectionHandle,
        username: String,
    ) -> Result<Dispatch, AvalonError> {
        let session = {
            let mut registry = self.registry.lock().await;
            let game_id = registry.create(caller.clone(), username.clone());
            registry.get(game_id)?
        };
        let snapshot = session.snapshot().await?;

        Ok(Dispatch {
            game_id: session.game_id(),
            events: vec![GameEvent::PlayerJoined { name: username }],
            snapshot,
            members: vec![caller.clone()],
            membership: Some(Membership::Joined(caller.clone())),
            closed: false,
        })
    }

    /// Decodes one frame from `caller`, dispatches it, and encodes every
    /// resulting frame with its recipient.
    ///
    /// Rejected commands and empty or undecodable frames produce a single
    /// [`ServerMessage::Error`] to the caller.
    ///
    /// # Errors
    /// Only encoding failures, which leave nothing sensible to send.
    pub async fn handle_frame(
        &self,
        caller: &ConnectionHandle,
        frame: &[u8],
    ) -> Result<Reply, AvalonError> {
        if frame.is_empty() {
            let err = ProtocolError::InvalidMessage("empty frame".into());
            return self.error_reply(caller, &AvalonError::from(err));
        }
        let command: ClientCommand = match self.codec.decode(frame) {
            Ok(command) => command,
            Err(e) => {
                tracing::debug!(%caller, error = %e, "failed to decode command");
                return self.error_reply(caller, &AvalonError::from(e));
            }
        };
        let creating = matches!(command, ClientCommand::CreateGame { .. });
        let target = command.game_id();

        let dispatch = match self.dispatch(caller, command).await {
            Ok(dispatch) => dispatch,
            Err(e) => {
                tracing::debug!(%caller, game_id = ?target, error = %e, "command rejected");
                return self.error_reply(caller, &e);
            }
        };

        let game_id = dispatch.game_id;
        let mut outbound = Vec::new();

        if creating {
            let created = ServerMessage::GameCreated { game_id };
            outbound.push((
                Recipient::Connection(caller.clone()),
                self.codec.encode(&created)?,
            ));
        }

        let dealt = dispatch
            .events
            .iter()
            .any(|e| matches!(e, GameEvent::GameStarted { .. }));

        let state = self.encode_state(
            game_id,
            &StateUpdate::Public {
                events: dispatch.events,
                snapshot: dispatch.snapshot,
            },
        )?;
        if matches!(dispatch.membership, Some(Membership::Left(_))) {
            // The leaver is no longer in the group but still gets the result.
            outbound.push((Recipient::Connection(caller.clone()), state.clone()));
        }
        if !dispatch.closed {
            outbound.push((Recipient::Game(game_id), state));
        }

        if dealt {
            for member in &dispatch.members {
                let view = match self.view(game_id, member).await {
                    Ok(view) => view,
                    Err(e) => {
                        tracing::warn!(%game_id, %member, error = %e, "no private view");
                        continue;
                    }
                };
                let private = self.encode_state(game_id, &StateUpdate::Private { view })?;
                outbound.push((Recipient::Connection(member.clone()), private));
            }
        }

        Ok(Reply {
            outbound,
            membership: dispatch.membership.map(|m| (game_id, m)),
        })
    }

    fn encode_state(&self, game_id: GameId, update: &StateUpdate) -> Result<Vec<u8>, AvalonError> {
        let data = self.codec.encode(update)?;
        Ok(self.codec.encode(&ServerMessage::State { game_id, data })?)
    }

    fn error_reply(&self, caller: &ConnectionHandle, err: &AvalonError) -> Result<Reply, AvalonError> {
        let msg = ServerMessage::Error {
            code: err.code(),
            message: err.to_string(),
        };
        Ok(Reply {
            outbound: vec![(Recipient::Connection(caller.clone()), self.codec.encode(&msg)?)],
            membership: None,
        })
    }
}
