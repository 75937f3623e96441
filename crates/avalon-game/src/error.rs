//! Error types for the game layer.

use avalon_protocol::{ConnectionHandle, GameId};

use crate::Phase;

/// Why a command was rejected.
///
/// Every variant is an expected, recoverable condition. A command that
/// returns one of these has not changed the session.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    /// No live session has this id.
    #[error("game {0} not found")]
    GameNotFound(GameId),

    /// The caller is not seated in this game.
    #[error("{0} is not in this game")]
    NotInGame(ConnectionHandle),

    /// Only the host may do this.
    #[error("{0} is not the host")]
    NotHost(ConnectionHandle),

    /// Only the current leader may do this.
    #[error("{0} is not the leader")]
    NotLeader(ConnectionHandle),

    /// The command is not legal in the current phase.
    #[error("command requires phase {expected}, game is in {actual}")]
    WrongPhase { expected: Phase, actual: Phase },

    /// Every seat is taken.
    #[error("game is full ({max} players)")]
    GameFull { max: usize },

    /// This connection already holds a seat.
    #[error("connection {0} already joined")]
    DuplicateConnection(ConnectionHandle),

    /// Another seated player already uses this name.
    #[error("name {0:?} is taken")]
    DuplicateName(String),

    /// Too few players to deal.
    #[error("need {need} players to start, have {have}")]
    NotEnoughPlayers { have: usize, need: usize },

    /// The proposed team is not the size this round requires.
    #[error("team has {have} members, round needs {need}")]
    TeamIncompleteSize { have: usize, need: usize },

    /// Only quest team members may play a quest card.
    #[error("{0} is not on the quest team")]
    PlayerNotOnTeam(ConnectionHandle),

    /// No seated player has this display name.
    #[error("no player named {0:?}")]
    UnknownPlayer(String),

    /// The session actor has stopped or its channel is closed.
    #[error("game {0} is unavailable")]
    Unavailable(GameId),
}
