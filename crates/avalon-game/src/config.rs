//! Game configuration and the phase state machine.

use std::fmt;

use avalon_rules::{MAX_PLAYERS, MIN_PLAYERS};
use serde::{Deserialize, Serialize};
use tracing::warn;

// ---------------------------------------------------------------------------
// GameConfig
// ---------------------------------------------------------------------------

/// Settings shared by every session a registry creates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// Players needed before the host can start.
    pub min_players: usize,

    /// Seats available in the lobby.
    pub max_players: usize,

    /// Consecutive rejected teams in one round that hand Evil the win.
    pub max_rejections: u8,

    /// Quest results one side needs to win.
    pub quests_to_win: usize,

    /// Capacity of each session actor's command channel.
    pub command_buffer: usize,

    /// Base seed for session RNGs. `None` seeds from the OS; `Some` makes
    /// every deal and reveal order reproducible (per game id).
    pub rng_seed: Option<u64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            min_players: MIN_PLAYERS,
            max_players: MAX_PLAYERS,
            max_rejections: 5,
            quests_to_win: 3,
            command_buffer: 64,
            rng_seed: None,
        }
    }
}

impl GameConfig {
    /// Clamps out-of-range values so the config agrees with the ruleset.
    ///
    /// - Player bounds forced into 5..=10 with `min_players <= max_players`.
    /// - `max_rejections` at least 1.
    /// - `quests_to_win` in 1..=3 (five quests can only produce one side
    ///   with three).
    /// - `command_buffer` at least 1.
    pub fn validated(mut self) -> Self {
        let min = self.min_players.clamp(MIN_PLAYERS, MAX_PLAYERS);
        if min != self.min_players {
            warn!(requested = self.min_players, clamped = min, "min_players out of range, clamping");
            self.min_players = min;
        }
        let max = self.max_players.clamp(self.min_players, MAX_PLAYERS);
        if max != self.max_players {
            warn!(requested = self.max_players, clamped = max, "max_players out of range, clamping");
            self.max_players = max;
        }
        if self.max_rejections == 0 {
            warn!("max_rejections is 0, using 1");
            self.max_rejections = 1;
        }
        let quests = self.quests_to_win.clamp(1, 3);
        if quests != self.quests_to_win {
            warn!(requested = self.quests_to_win, clamped = quests, "quests_to_win out of range, clamping");
            self.quests_to_win = quests;
        }
        self.command_buffer = self.command_buffer.max(1);
        self
    }
}

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// Which part of a round the session is in.
///
/// ```text
/// Lobby → TeamBuilding → TeamVote ─(approved)→ Quest → QuestResults
///              ↑            │                              │
///              └─(rejected)─┘←──────────(next round)───────┘
///
/// TeamVote and QuestResults may also fall back to Lobby when the game ends.
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    Lobby,
    TeamBuilding,
    TeamVote,
    Quest,
    QuestResults,
}

impl Phase {
    /// Returns `true` once roles are dealt and until the game ends.
    pub fn is_in_progress(self) -> bool {
        !matches!(self, Self::Lobby)
    }

    /// Returns `true` if moving to `target` follows a legal edge.
    pub fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Lobby, Self::TeamBuilding)
                | (Self::TeamBuilding, Self::TeamVote)
                | (Self::TeamVote, Self::TeamBuilding)
                | (Self::TeamVote, Self::Quest)
                | (Self::TeamVote, Self::Lobby)
                | (Self::Quest, Self::QuestResults)
                | (Self::QuestResults, Self::TeamBuilding)
                | (Self::QuestResults, Self::Lobby)
        )
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lobby => write!(f, "Lobby"),
            Self::TeamBuilding => write!(f, "TeamBuilding"),
            Self::TeamVote => write!(f, "TeamVote"),
            Self::Quest => write!(f, "Quest"),
            Self::QuestResults => write!(f, "QuestResults"),
        }
    }
}
