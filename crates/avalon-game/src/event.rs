//! What a session reports back: events describing each change, and
//! snapshots of the public state.

use avalon_protocol::GameId;
use avalon_rules::{Loyalty, Role};
use serde::{Deserialize, Serialize};

use crate::Phase;

/// A player-facing command, minus the caller (which travels separately).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    Join { name: String },
    Leave,
    Start,
    ToggleTeam { name: String },
    ConfirmTeam,
    ApproveTeam { approve: bool },
    SubmitQuestOutcome { success: bool },
    RevealNextQuestResult,
}

/// Why a game ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameOverReason {
    /// Good completed enough quests.
    QuestsSucceeded,
    /// Evil sabotaged enough quests.
    QuestsFailed,
    /// Too many teams in a row were voted down.
    TooManyRejections,
}

/// One observable change to a session.
///
/// Operations return these in the order they happened. An empty list
/// means the command was accepted but changed nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum GameEvent {
    PlayerJoined { name: String },
    PlayerLeft { name: String },
    HostChanged { name: String },
    GameStarted { leader: String },
    TeamChanged { team: Vec<String> },
    TeamConfirmed { team: Vec<String> },
    TeamVoteCast { name: String },
    TeamApproved { approvals: usize, rejections: usize },
    TeamRejected {
        approvals: usize,
        rejections: usize,
        rejection_count: u8,
        leader: String,
    },
    QuestVoteCast { name: String },
    QuestVotingComplete,
    QuestVoteRevealed { success: bool, remaining: usize },
    QuestResolved { round: u8, result: Loyalty, failures: usize },
    NextRound { round: u8, leader: String },
    /// The game ended and the session went back to the lobby. The quest
    /// history is carried here because the session no longer holds it.
    GameOver {
        winner: Loyalty,
        reason: GameOverReason,
        quest_results: Vec<Loyalty>,
    },
}

/// A seated player as everyone sees them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSummary {
    pub name: String,
    pub is_host: bool,
    pub is_leader: bool,
    pub on_team: bool,
    /// Whether this player has voted in the current team vote or quest.
    pub has_voted: bool,
}

/// Public state of a session. Contains no roles and no vote values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameSnapshot {
    pub game_id: GameId,
    pub phase: Phase,
    pub round: u8,
    /// In seating order.
    pub players: Vec<PlayerSummary>,
    pub host: Option<String>,
    pub leader: Option<String>,
    pub team: Vec<String>,
    pub required_team_size: Option<usize>,
    pub quest_results: Vec<Loyalty>,
    pub revealed_votes: Vec<bool>,
    pub pending_reveals: usize,
    pub rejection_count: u8,
}

/// A snapshot plus what one player privately knows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerView {
    pub snapshot: GameSnapshot,
    pub role: Option<Role>,
    /// Other Evil players' names; only filled in for Evil viewers.
    pub known_evil: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_game_event_json_is_tagged() {
        let event = GameEvent::QuestResolved {
            round: 2,
            result: Loyalty::Evil,
            failures: 1,
        };
        let json: serde_json::Value = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "QuestResolved");
        assert_eq!(json["round"], 2);
        assert_eq!(json["result"], "Evil");
    }

    #[test]
    fn test_game_over_carries_history() {
        let event = GameEvent::GameOver {
            winner: Loyalty::Good,
            reason: GameOverReason::QuestsSucceeded,
            quest_results: vec![Loyalty::Good, Loyalty::Evil, Loyalty::Good, Loyalty::Good],
        };
        let json: serde_json::Value = serde_json::to_value(&event).unwrap();
        assert_eq!(json["reason"], "QuestsSucceeded");
        assert_eq!(json["quest_results"].as_array().map(Vec::len), Some(4));
    }
}
