//! The per-game state machine.
//!
//! [`GameSession`] is plain synchronous data: every operation validates
//! its preconditions first and only then mutates, so a rejected command
//! leaves the session exactly as it was. Serializing access is the job of
//! the session actor that owns it.

use std::collections::HashMap;

use avalon_protocol::{ConnectionHandle, GameId};
use avalon_rules::{Loyalty, Role, deal_roles, pick_leader, quest_fails, required_team_size};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info};

use crate::{
    Action, GameConfig, GameError, GameEvent, GameOverReason, GameSnapshot, Phase, PlayerSummary,
    PlayerView,
};

/// A seated player. Two players are equal when their connection handles
/// are equal, whatever their names.
#[derive(Debug, Clone)]
pub struct Player {
    pub handle: ConnectionHandle,
    pub name: String,
    /// Dealt on start, cleared when the game ends.
    pub role: Option<Role>,
}

impl PartialEq for Player {
    fn eq(&self, other: &Self) -> bool {
        self.handle == other.handle
    }
}

impl Eq for Player {}

/// One game's complete state.
pub struct GameSession {
    id: GameId,
    config: GameConfig,
    host: Option<ConnectionHandle>,
    /// Seating order; the leader moves one seat along this list.
    seats: Vec<ConnectionHandle>,
    players: HashMap<ConnectionHandle, Player>,
    phase: Phase,
    round: u8,
    quest_results: Vec<Loyalty>,
    leader: Option<ConnectionHandle>,
    team: Vec<ConnectionHandle>,
    /// Team approvals during TeamVote, quest cards during Quest.
    votes: HashMap<ConnectionHandle, bool>,
    /// Quest cards not yet revealed. Anonymous by construction.
    pending_reveals: Vec<bool>,
    revealed_votes: Vec<bool>,
    rejection_count: u8,
    rng: StdRng,
}

impl GameSession {
    /// Creates a lobby with `host` as its only player.
    ///
    /// The RNG is seeded from `config.rng_seed` combined with the game id
    /// when set, otherwise from the OS.
    pub fn new(
        id: GameId,
        host: ConnectionHandle,
        host_name: impl Into<String>,
        config: GameConfig,
    ) -> Self {
        let rng = match config.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(id.0)),
            None => StdRng::from_os_rng(),
        };
        Self::with_rng(id, host, host_name, config, rng)
    }

    /// Creates a lobby that draws all randomness from `rng`.
    pub fn with_rng(
        id: GameId,
        host: ConnectionHandle,
        host_name: impl Into<String>,
        config: GameConfig,
        rng: StdRng,
    ) -> Self {
        let host_player = Player {
            handle: host.clone(),
            name: host_name.into(),
            role: None,
        };
        let mut players = HashMap::new();
        players.insert(host.clone(), host_player);

        Self {
            id,
            config: config.validated(),
            host: Some(host.clone()),
            seats: vec![host],
            players,
            phase: Phase::Lobby,
            round: 1,
            quest_results: Vec::new(),
            leader: None,
            team: Vec::new(),
            votes: HashMap::new(),
            pending_reveals: Vec::new(),
            revealed_votes: Vec::new(),
            rejection_count: 0,
            rng,
        }
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn id(&self) -> GameId {
        self.id
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn round(&self) -> u8 {
        self.round
    }

    pub fn host(&self) -> Option<&ConnectionHandle> {
        self.host.as_ref()
    }

    pub fn leader(&self) -> Option<&ConnectionHandle> {
        self.leader.as_ref()
    }

    pub fn team(&self) -> &[ConnectionHandle] {
        &self.team
    }

    pub fn quest_results(&self) -> &[Loyalty] {
        &self.quest_results
    }

    pub fn revealed_votes(&self) -> &[bool] {
        &self.revealed_votes
    }

    pub fn rejection_count(&self) -> u8 {
        self.rejection_count
    }

    /// Connection handles in seating order.
    pub fn members(&self) -> &[ConnectionHandle] {
        &self.seats
    }

    pub fn player_count(&self) -> usize {
        self.seats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seats.is_empty()
    }

    pub fn contains(&self, handle: &ConnectionHandle) -> bool {
        self.players.contains_key(handle)
    }

    pub fn player(&self, handle: &ConnectionHandle) -> Option<&Player> {
        self.players.get(handle)
    }

    pub fn role_of(&self, handle: &ConnectionHandle) -> Option<Role> {
        self.players.get(handle).and_then(|p| p.role)
    }

    /// Team size the current round requires, once a game is running.
    pub fn required_team_size(&self) -> Option<usize> {
        if self.phase.is_in_progress() {
            required_team_size(self.round, self.seats.len())
        } else {
            None
        }
    }

    /// Public state: no roles, no vote values.
    pub fn snapshot(&self) -> GameSnapshot {
        let players = self
            .seats
            .iter()
            .filter_map(|h| self.players.get(h))
            .map(|p| PlayerSummary {
                name: p.name.clone(),
                is_host: self.host.as_ref() == Some(&p.handle),
                is_leader: self.leader.as_ref() == Some(&p.handle),
                on_team: self.team.contains(&p.handle),
                has_voted: self.votes.contains_key(&p.handle),
            })
            .collect();

        GameSnapshot {
            game_id: self.id,
            phase: self.phase,
            round: self.round,
            players,
            host: self.host.as_ref().map(|h| self.name_of(h)),
            leader: self.leader.as_ref().map(|h| self.name_of(h)),
            team: self.names(&self.team),
            required_team_size: self.required_team_size(),
            quest_results: self.quest_results.clone(),
            revealed_votes: self.revealed_votes.clone(),
            pending_reveals: self.pending_reveals.len(),
            rejection_count: self.rejection_count,
        }
    }

    /// The snapshot plus what `viewer` privately knows: their own role,
    /// and if Evil, who the other Evil players are.
    pub fn view_for(&self, viewer: &ConnectionHandle) -> Result<PlayerView, GameError> {
        let player = self
            .player(viewer)
            .ok_or_else(|| GameError::NotInGame(viewer.clone()))?;

        let known_evil = if player.role.map(Role::loyalty) == Some(Loyalty::Evil) {
            self.seats
                .iter()
                .filter(|h| *h != viewer)
                .filter_map(|h| self.players.get(h))
                .filter(|p| p.role.map(Role::loyalty) == Some(Loyalty::Evil))
                .map(|p| p.name.clone())
                .collect()
        } else {
            Vec::new()
        };

        Ok(PlayerView {
            snapshot: self.snapshot(),
            role: player.role,
            known_evil,
        })
    }

    // -----------------------------------------------------------------------
    // Command surface
    // -----------------------------------------------------------------------

    /// Applies one command on behalf of `caller`.
    ///
    /// Checks run in this order: seat (`NotInGame`, skipped for `Join`),
    /// authority (`NotHost` for `Start`; `NotLeader` for `ToggleTeam`,
    /// `ConfirmTeam` and `RevealNextQuestResult`), then the operation's own
    /// phase and rule checks.
    pub fn apply(
        &mut self,
        caller: &ConnectionHandle,
        action: Action,
    ) -> Result<Vec<GameEvent>, GameError> {
        let result = self
            .authorize(caller, &action)
            .and_then(|()| self.perform(caller, action));

        if let Err(e) = &result {
            debug!(game_id = %self.id, %caller, phase = %self.phase, error = %e, "command rejected");
        }
        result
    }

    fn authorize(&self, caller: &ConnectionHandle, action: &Action) -> Result<(), GameError> {
        if matches!(action, Action::Join { .. }) {
            return Ok(());
        }
        if !self.contains(caller) {
            return Err(GameError::NotInGame(caller.clone()));
        }
        match action {
            Action::Start if self.host.as_ref() != Some(caller) => {
                Err(GameError::NotHost(caller.clone()))
            }
            Action::ToggleTeam { .. } | Action::ConfirmTeam | Action::RevealNextQuestResult
                if self.leader.as_ref() != Some(caller) =>
            {
                Err(GameError::NotLeader(caller.clone()))
            }
            _ => Ok(()),
        }
    }

    fn perform(
        &mut self,
        caller: &ConnectionHandle,
        action: Action,
    ) -> Result<Vec<GameEvent>, GameError> {
        match action {
            Action::Join { name } => self.add_player(caller.clone(), name),
            Action::Leave => self.remove_player(caller),
            Action::Start => self.start(),
            Action::ToggleTeam { name } => self.toggle_team_member(&name),
            Action::ConfirmTeam => self.confirm_team(),
            Action::ApproveTeam { approve } => self.approve_team(caller, approve),
            Action::SubmitQuestOutcome { success } => self.submit_quest_outcome(caller, success),
            Action::RevealNextQuestResult => self.reveal_next_quest_result(),
        }
    }

    // -----------------------------------------------------------------------
    // Lobby
    // -----------------------------------------------------------------------

    /// Seats a new player at the end of the table. A lobby left without a
    /// host gives the role to whoever joins next.
    pub fn add_player(
        &mut self,
        handle: ConnectionHandle,
        name: impl Into<String>,
    ) -> Result<Vec<GameEvent>, GameError> {
        let name = name.into();
        self.expect_phase(Phase::Lobby)?;
        if self.contains(&handle) {
            return Err(GameError::DuplicateConnection(handle));
        }
        if self.players.values().any(|p| p.name == name) {
            return Err(GameError::DuplicateName(name));
        }
        if self.seats.len() >= self.config.max_players {
            return Err(GameError::GameFull {
                max: self.config.max_players,
            });
        }

        self.seats.push(handle.clone());
        self.players.insert(
            handle.clone(),
            Player {
                handle: handle.clone(),
                name: name.clone(),
                role: None,
            },
        );
        info!(game_id = %self.id, player = %handle, %name, players = self.seats.len(), "player joined");

        let mut events = vec![GameEvent::PlayerJoined { name: name.clone() }];
        if self.host.is_none() {
            info!(game_id = %self.id, host = %handle, "host promoted");
            self.host = Some(handle);
            events.push(GameEvent::HostChanged { name });
        }
        Ok(events)
    }

    /// Removes a player from the lobby. If the host leaves, the
    /// earliest-seated remaining player becomes host.
    pub fn remove_player(&mut self, handle: &ConnectionHandle) -> Result<Vec<GameEvent>, GameError> {
        self.expect_phase(Phase::Lobby)?;
        let player = self
            .players
            .remove(handle)
            .ok_or_else(|| GameError::NotInGame(handle.clone()))?;
        self.seats.retain(|h| h != handle);
        info!(game_id = %self.id, player = %handle, players = self.seats.len(), "player left");

        let mut events = vec![GameEvent::PlayerLeft { name: player.name }];
        if self.host.as_ref() == Some(handle) {
            self.host = self.seats.first().cloned();
            if let Some(new_host) = &self.host {
                let name = self.name_of(new_host);
                info!(game_id = %self.id, host = %new_host, "host promoted");
                events.push(GameEvent::HostChanged { name });
            }
        }
        Ok(events)
    }

    /// Deals roles, picks the first leader, and opens round one.
    pub fn start(&mut self) -> Result<Vec<GameEvent>, GameError> {
        self.expect_phase(Phase::Lobby)?;
        let n = self.seats.len();
        if n < self.config.min_players {
            return Err(GameError::NotEnoughPlayers {
                have: n,
                need: self.config.min_players,
            });
        }

        let roles = deal_roles(n, &mut self.rng);
        for (handle, role) in self.seats.iter().zip(roles) {
            if let Some(player) = self.players.get_mut(handle) {
                player.role = Some(role);
            }
        }
        let leader = self.seats[pick_leader(n, &mut self.rng)].clone();
        self.leader = Some(leader.clone());
        self.round = 1;
        self.rejection_count = 0;
        self.quest_results.clear();
        self.team.clear();
        self.votes.clear();
        self.set_phase(Phase::TeamBuilding);

        Ok(vec![GameEvent::GameStarted {
            leader: self.name_of(&leader),
        }])
    }

    // -----------------------------------------------------------------------
    // Team building and voting
    // -----------------------------------------------------------------------

    /// Adds or removes the named player from the proposed team.
    ///
    /// Removing always works. Adding past the round's team size is
    /// accepted but ignored, signalled by an empty event list.
    pub fn toggle_team_member(&mut self, name: &str) -> Result<Vec<GameEvent>, GameError> {
        self.expect_phase(Phase::TeamBuilding)?;
        let handle = self
            .handle_by_name(name)
            .ok_or_else(|| GameError::UnknownPlayer(name.to_string()))?;

        if let Some(pos) = self.team.iter().position(|h| *h == handle) {
            self.team.remove(pos);
        } else if self.team.len() < self.team_size() {
            self.team.push(handle);
        } else {
            debug!(game_id = %self.id, %name, "team already full, ignoring add");
            return Ok(Vec::new());
        }

        Ok(vec![GameEvent::TeamChanged {
            team: self.names(&self.team),
        }])
    }

    /// Locks in the proposed team and opens the vote on it.
    pub fn confirm_team(&mut self) -> Result<Vec<GameEvent>, GameError> {
        self.expect_phase(Phase::TeamBuilding)?;
        let need = self.team_size();
        if self.team.len() != need {
            return Err(GameError::TeamIncompleteSize {
                have: self.team.len(),
                need,
            });
        }
        self.set_phase(Phase::TeamVote);
        Ok(vec![GameEvent::TeamConfirmed {
            team: self.names(&self.team),
        }])
    }

    /// Records one player's vote on the proposed team. A repeat vote
    /// replaces the earlier one. Once everyone has voted the team goes on
    /// the quest on a strict majority, and otherwise leadership passes on.
    pub fn approve_team(
        &mut self,
        handle: &ConnectionHandle,
        approve: bool,
    ) -> Result<Vec<GameEvent>, GameError> {
        self.expect_phase(Phase::TeamVote)?;
        let name = self.seated_name(handle)?;
        self.votes.insert(handle.clone(), approve);

        let mut events = vec![GameEvent::TeamVoteCast { name }];
        let n = self.seats.len();
        if self.votes.len() < n {
            return Ok(events);
        }

        let approvals = self.votes.values().filter(|v| **v).count();
        let rejections = n - approvals;
        self.votes.clear();

        if approvals * 2 > n {
            self.rejection_count = 0;
            info!(game_id = %self.id, round = self.round, approvals, rejections, "team approved");
            self.set_phase(Phase::Quest);
            events.push(GameEvent::TeamApproved {
                approvals,
                rejections,
            });
            return Ok(events);
        }

        self.rejection_count += 1;
        info!(
            game_id = %self.id,
            round = self.round,
            approvals,
            rejections,
            rejection_count = self.rejection_count,
            "team rejected"
        );

        if self.rejection_count >= self.config.max_rejections {
            let leader = self.leader.as_ref().map(|h| self.name_of(h)).unwrap_or_default();
            events.push(GameEvent::TeamRejected {
                approvals,
                rejections,
                rejection_count: self.rejection_count,
                leader,
            });
            events.push(self.finish(Loyalty::Evil, GameOverReason::TooManyRejections));
            return Ok(events);
        }

        let leader = self.advance_leader();
        self.team.clear();
        self.set_phase(Phase::TeamBuilding);
        events.push(GameEvent::TeamRejected {
            approvals,
            rejections,
            rejection_count: self.rejection_count,
            leader,
        });
        Ok(events)
    }

    // -----------------------------------------------------------------------
    // Quest
    // -----------------------------------------------------------------------

    /// Records a team member's quest card. Resubmitting replaces the
    /// earlier card. When every member has played, the cards are pooled
    /// anonymously for reveal.
    pub fn submit_quest_outcome(
        &mut self,
        handle: &ConnectionHandle,
        success: bool,
    ) -> Result<Vec<GameEvent>, GameError> {
        self.expect_phase(Phase::Quest)?;
        let name = self.seated_name(handle)?;
        if !self.team.contains(handle) {
            return Err(GameError::PlayerNotOnTeam(handle.clone()));
        }
        self.votes.insert(handle.clone(), success);

        let mut events = vec![GameEvent::QuestVoteCast { name }];
        if self.votes.len() == self.team.len() {
            self.pending_reveals = self.votes.drain().map(|(_, card)| card).collect();
            self.set_phase(Phase::QuestResults);
            events.push(GameEvent::QuestVotingComplete);
        }
        Ok(events)
    }

    /// Reveals one quest card picked uniformly at random from those left.
    ///
    /// After the last card the quest is scored. The game ends once either
    /// side has enough quests; otherwise the next round begins with the
    /// next leader.
    pub fn reveal_next_quest_result(&mut self) -> Result<Vec<GameEvent>, GameError> {
        self.expect_phase(Phase::QuestResults)?;

        // Non-empty: QuestResults is entered with a full team's cards and
        // left as soon as the last one is revealed.
        let pick = self.rng.random_range(0..self.pending_reveals.len());
        let success = self.pending_reveals.swap_remove(pick);
        self.revealed_votes.push(success);

        let mut events = vec![GameEvent::QuestVoteRevealed {
            success,
            remaining: self.pending_reveals.len(),
        }];
        if !self.pending_reveals.is_empty() {
            return Ok(events);
        }

        let failures = self.revealed_votes.iter().filter(|card| !**card).count();
        let result = if quest_fails(self.round, self.seats.len(), failures) {
            Loyalty::Evil
        } else {
            Loyalty::Good
        };
        self.quest_results.push(result);
        info!(game_id = %self.id, round = self.round, failures, %result, "quest resolved");
        events.push(GameEvent::QuestResolved {
            round: self.round,
            result,
            failures,
        });

        let good = self.count_results(Loyalty::Good);
        let evil = self.count_results(Loyalty::Evil);
        if good >= self.config.quests_to_win {
            events.push(self.finish(Loyalty::Good, GameOverReason::QuestsSucceeded));
            return Ok(events);
        }
        if evil >= self.config.quests_to_win {
            events.push(self.finish(Loyalty::Evil, GameOverReason::QuestsFailed));
            return Ok(events);
        }

        self.round += 1;
        let leader = self.advance_leader();
        self.team.clear();
        self.votes.clear();
        self.revealed_votes.clear();
        self.rejection_count = 0;
        self.set_phase(Phase::TeamBuilding);
        events.push(GameEvent::NextRound {
            round: self.round,
            leader,
        });
        Ok(events)
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn expect_phase(&self, expected: Phase) -> Result<(), GameError> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(GameError::WrongPhase {
                expected,
                actual: self.phase,
            })
        }
    }

    fn set_phase(&mut self, next: Phase) {
        debug_assert!(
            self.phase.can_transition_to(next),
            "illegal phase transition {} -> {}",
            self.phase,
            next
        );
        info!(game_id = %self.id, from = %self.phase, to = %next, round = self.round, "phase changed");
        self.phase = next;
    }

    fn team_size(&self) -> usize {
        // Player count stays in 5..=10 (config is clamped) and the game
        // ends before a sixth round.
        required_team_size(self.round, self.seats.len())
            .expect("round and player count are within the quest table")
    }

    fn seated_name(&self, handle: &ConnectionHandle) -> Result<String, GameError> {
        self.players
            .get(handle)
            .map(|p| p.name.clone())
            .ok_or_else(|| GameError::NotInGame(handle.clone()))
    }

    fn name_of(&self, handle: &ConnectionHandle) -> String {
        self.players
            .get(handle)
            .map(|p| p.name.clone())
            .unwrap_or_default()
    }

    fn names(&self, handles: &[ConnectionHandle]) -> Vec<String> {
        handles.iter().map(|h| self.name_of(h)).collect()
    }

    fn handle_by_name(&self, name: &str) -> Option<ConnectionHandle> {
        self.players
            .values()
            .find(|p| p.name == name)
            .map(|p| p.handle.clone())
    }

    fn count_results(&self, side: Loyalty) -> usize {
        self.quest_results.iter().filter(|r| **r == side).count()
    }

    /// Moves leadership one seat clockwise and returns the new leader's name.
    fn advance_leader(&mut self) -> String {
        let current = self
            .leader
            .as_ref()
            .and_then(|l| self.seats.iter().position(|h| h == l));
        let next = match current {
            Some(i) => clockwise(i, self.seats.len()),
            None => 0,
        };
        self.leader = self.seats.get(next).cloned();
        self.leader
            .as_ref()
            .map(|h| self.name_of(h))
            .unwrap_or_default()
    }

    /// Ends the game and resets to the lobby. Players keep their seats.
    fn finish(&mut self, winner: Loyalty, reason: GameOverReason) -> GameEvent {
        let quest_results = std::mem::take(&mut self.quest_results);
        info!(game_id = %self.id, %winner, ?reason, rounds = quest_results.len(), "game over");
        self.reset();
        GameEvent::GameOver {
            winner,
            reason,
            quest_results,
        }
    }

    fn reset(&mut self) {
        self.set_phase(Phase::Lobby);
        self.round = 1;
        self.quest_results.clear();
        self.leader = None;
        self.team.clear();
        self.votes.clear();
        self.pending_reveals.clear();
        self.revealed_votes.clear();
        self.rejection_count = 0;
        for player in self.players.values_mut() {
            player.role = None;
        }
    }
}

/// Seat index after `index` going clockwise around `len` seats.
fn clockwise(index: usize, len: usize) -> usize {
    (index + 1) % len
}
