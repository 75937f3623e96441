//! Core protocol types for the Avalon wire format.
//!
//! Everything in this module travels "on the wire": the transport layer
//! decodes a [`ClientCommand`] from each inbound frame and encodes a
//! [`ServerMessage`] for each reply or broadcast.

use serde::{Deserialize, Serialize};

use std::fmt;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A unique identifier for a game session.
///
/// Newtype over `u64` so a game id can never be confused with any other
/// number in a function signature. `#[serde(transparent)]` keeps the JSON
/// form a plain number: `GameId(7)` encodes as `7`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameId(pub u64);

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "G-{}", self.0)
    }
}

/// An opaque handle for one live client connection.
///
/// The transport assigns these; the game core only compares them. Two
/// players are the same player exactly when their handles are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionHandle(pub String);

impl ConnectionHandle {
    /// Creates a handle from anything string-like.
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    /// Returns the handle as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnectionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConnectionHandle {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

// ---------------------------------------------------------------------------
// Recipient: who should receive a message?
// ---------------------------------------------------------------------------

/// Where the transport should deliver an outbound message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recipient {
    /// Every connection that is a member of the game.
    Game(GameId),

    /// One specific connection (usually the caller, for errors).
    Connection(ConnectionHandle),
}

// ---------------------------------------------------------------------------
// ClientCommand: inbound
// ---------------------------------------------------------------------------

/// A command sent by a client.
///
/// The caller's [`ConnectionHandle`] is never part of the payload: the
/// transport knows which connection a frame arrived on and passes the
/// handle alongside the decoded command.
///
/// Internally tagged, so `ApproveTeam` looks like
/// `{ "type": "ApproveTeam", "game_id": 3, "approve": true }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientCommand {
    /// Create a new game with the caller as host.
    CreateGame { username: String },

    /// Join an existing game's lobby.
    JoinGame { game_id: GameId, username: String },

    /// Leave a game's lobby.
    LeaveGame { game_id: GameId },

    /// Deal roles and begin the first round. Host only.
    StartGame { game_id: GameId },

    /// Add or remove a player (by display name) from the proposed team.
    /// Leader only.
    ToggleTeam { game_id: GameId, username: String },

    /// Lock in the proposed team and open the team vote. Leader only.
    ConfirmTeam { game_id: GameId },

    /// Vote for or against the proposed team.
    ApproveTeam { game_id: GameId, approve: bool },

    /// Play a success or fail card on the current quest. Team members only.
    SubmitQuestOutcome { game_id: GameId, success: bool },

    /// Reveal one anonymous quest card. Leader only.
    RevealNextQuestResult { game_id: GameId },
}

impl ClientCommand {
    /// The game this command targets, or `None` for `CreateGame`.
    pub fn game_id(&self) -> Option<GameId> {
        match self {
            Self::CreateGame { .. } => None,
            Self::JoinGame { game_id, .. }
            | Self::LeaveGame { game_id }
            | Self::StartGame { game_id }
            | Self::ToggleTeam { game_id, .. }
            | Self::ConfirmTeam { game_id }
            | Self::ApproveTeam { game_id, .. }
            | Self::SubmitQuestOutcome { game_id, .. }
            | Self::RevealNextQuestResult { game_id } => Some(*game_id),
        }
    }
}

// ---------------------------------------------------------------------------
// ServerMessage: outbound
// ---------------------------------------------------------------------------

/// A message sent by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// The caller's `CreateGame` succeeded.
    GameCreated { game_id: GameId },

    /// Post-command game state. `data` is opaque to the protocol layer;
    /// it is the game crate's update encoded with the same codec.
    State { game_id: GameId, data: Vec<u8> },

    /// The command was rejected.
    /// `code` follows HTTP conventions (400, 403, 404, 409).
    Error { code: u16, message: String },
}

// =========================================================================
// Tests
// =========================================================================
