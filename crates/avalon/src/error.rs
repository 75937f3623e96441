//! Unified error type for the Avalon server.

use avalon_game::GameError;
use avalon_protocol::ProtocolError;

/// Top-level error wrapping each layer's errors.
///
/// `#[from]` lets `?` convert layer errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum AvalonError {
    /// Encoding or decoding a frame failed.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The game rejected the command.
    #[error(transparent)]
    Game(#[from] GameError),
}

impl AvalonError {
    /// HTTP-style status code sent to the client in
    /// [`ServerMessage::Error`](avalon_protocol::ServerMessage::Error).
    pub fn code(&self) -> u16 {
        match self {
            Self::Protocol(_) => 400,
            Self::Game(e) => match e {
                GameError::GameNotFound(_) => 404,
                GameError::NotInGame(_)
                | GameError::NotHost(_)
                | GameError::NotLeader(_)
                | GameError::PlayerNotOnTeam(_) => 403,
                GameError::WrongPhase { .. }
                | GameError::GameFull { .. }
                | GameError::DuplicateConnection(_)
                | GameError::DuplicateName(_) => 409,
                GameError::NotEnoughPlayers { .. }
                | GameError::TeamIncompleteSize { .. }
                | GameError::UnknownPlayer(_) => 400,
                GameError::Unavailable(_) => 503,
            },
        }
    }
}
